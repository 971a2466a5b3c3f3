use crate::application::event::{EventPayload, InboundEvent};
use crate::domain::geo::Coordinates;
use crate::error::{OrderFlowError, Result};
use serde::Deserialize;
use std::io::Read;

/// Raw `identity,kind,payload` row.
#[derive(Debug, Deserialize)]
struct EventRecord {
    identity: String,
    kind: String,
    #[serde(default)]
    payload: String,
}

impl TryFrom<EventRecord> for InboundEvent {
    type Error = OrderFlowError;

    fn try_from(record: EventRecord) -> Result<Self> {
        if record.identity.is_empty() {
            return Err(OrderFlowError::ValidationError(
                "Event row has an empty identity".to_string(),
            ));
        }
        let payload = match record.kind.to_ascii_lowercase().as_str() {
            "text" => EventPayload::Text(record.payload),
            "list" => EventPayload::ListSelection(record.payload),
            "button" => EventPayload::ButtonSelection(record.payload),
            "location" => parse_location(&record.payload)?,
            other => {
                return Err(OrderFlowError::ValidationError(format!(
                    "Unknown event kind: {other}"
                )));
            }
        };
        Ok(InboundEvent {
            identity: record.identity,
            payload,
        })
    }
}

/// Parses `lat;lon[;label]`.
fn parse_location(raw: &str) -> Result<EventPayload> {
    let mut parts = raw.splitn(3, ';').map(str::trim);
    let mut coordinate = |name: &str| -> Result<f64> {
        parts
            .next()
            .and_then(|p| p.parse::<f64>().ok())
            .ok_or_else(|| {
                OrderFlowError::ValidationError(format!("Location {name} is not a number: {raw}"))
            })
    };
    let latitude = coordinate("latitude")?;
    let longitude = coordinate("longitude")?;
    let coordinates = Coordinates::new(latitude, longitude);
    if !coordinates.is_valid() {
        return Err(OrderFlowError::ValidationError(format!(
            "Location is out of range: {raw}"
        )));
    }
    let label = parts
        .next()
        .filter(|l| !l.is_empty())
        .map(str::to_string);
    Ok(EventPayload::Location { coordinates, label })
}

/// Reads inbound events from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths,
/// so a `text` row may omit trailing columns.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and decodes events; each malformed row yields an error
    /// without ending the stream.
    pub fn events(self) -> impl Iterator<Item = Result<InboundEvent>> {
        self.reader
            .into_deserialize::<EventRecord>()
            .map(|result| {
                let record: EventRecord = result?;
                InboundEvent::try_from(record)
            })
    }
}
