use crate::domain::geo::Coordinates;

/// One normalized inbound message from the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub identity: String,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Text(String),
    /// Id of the selected list row.
    ListSelection(String),
    /// Id of the pressed reply button.
    ButtonSelection(String),
    Location {
        coordinates: Coordinates,
        label: Option<String>,
    },
}

impl EventPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::Text(_) => "text",
            EventPayload::ListSelection(_) => "list",
            EventPayload::ButtonSelection(_) => "button",
            EventPayload::Location { .. } => "location",
        }
    }
}

impl InboundEvent {
    pub fn text(identity: &str, body: &str) -> Self {
        Self {
            identity: identity.to_string(),
            payload: EventPayload::Text(body.to_string()),
        }
    }

    pub fn list(identity: &str, id: &str) -> Self {
        Self {
            identity: identity.to_string(),
            payload: EventPayload::ListSelection(id.to_string()),
        }
    }

    pub fn button(identity: &str, id: &str) -> Self {
        Self {
            identity: identity.to_string(),
            payload: EventPayload::ButtonSelection(id.to_string()),
        }
    }

    pub fn location(identity: &str, coordinates: Coordinates, label: Option<&str>) -> Self {
        Self {
            identity: identity.to_string(),
            payload: EventPayload::Location {
                coordinates,
                label: label.map(str::to_string),
            },
        }
    }
}
