use crate::config::EngineConfig;
use crate::domain::geo::{Coordinates, distance_km, estimated_minutes};
use crate::domain::money::Money;
use crate::domain::ports::GeocoderBox;
use std::sync::Arc;
use tracing::{debug, warn};

/// Delivery terms computed for one destination.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryQuote {
    pub distance_km: f64,
    pub fee: Money,
    pub estimated_minutes: u32,
}

/// Address → coordinates → fee/ETA pipeline.
pub struct Pricing {
    geocoder: GeocoderBox,
    config: Arc<EngineConfig>,
}

impl Pricing {
    pub fn new(geocoder: GeocoderBox, config: Arc<EngineConfig>) -> Self {
        Self { geocoder, config }
    }

    /// Resolves an address, never failing: a geocoder error or an invalid
    /// result falls back to the zone centroid, then to the city centroid.
    pub async fn resolve_coordinates(&self, address: &str, zone: Option<&str>) -> Coordinates {
        match self.geocoder.geocode(address, zone).await {
            Ok(coordinates) if coordinates.is_valid() => {
                debug!(?coordinates, "Geocoded delivery address");
                coordinates
            }
            Ok(coordinates) => {
                warn!(?coordinates, "Geocoder returned invalid coordinates, using zone centroid");
                self.config.zone_centroid(zone)
            }
            Err(e) => {
                warn!(error = %e, zone = ?zone, "Geocoding failed, using zone centroid");
                self.config.zone_centroid(zone)
            }
        }
    }

    /// Where a vendor cooks: its own coordinates or its zone centroid.
    pub fn vendor_origin(&self, coordinates: Option<Coordinates>, zone: &str) -> Coordinates {
        coordinates
            .filter(Coordinates::is_valid)
            .unwrap_or_else(|| self.config.zone_centroid(Some(zone)))
    }

    pub fn quote(&self, from: Coordinates, to: Coordinates, prep_minutes: Option<u32>) -> DeliveryQuote {
        let distance = distance_km(from, to);
        let prep = prep_minutes.unwrap_or(self.config.default_prep_minutes);
        DeliveryQuote {
            distance_km: distance,
            fee: self.config.delivery.fee_for(distance),
            estimated_minutes: estimated_minutes(distance, prep, self.config.average_speed_kmh),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::Geocoder;
    use crate::error::{OrderFlowError, Result};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    struct FailingGeocoder;

    #[async_trait]
    impl Geocoder for FailingGeocoder {
        async fn geocode(&self, _address: &str, _zone: Option<&str>) -> Result<Coordinates> {
            Err(OrderFlowError::CollaboratorError("provider status ZERO_RESULTS".to_string()))
        }
    }

    struct FixedGeocoder(Coordinates);

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn geocode(&self, _address: &str, _zone: Option<&str>) -> Result<Coordinates> {
            Ok(self.0)
        }
    }

    fn pricing(geocoder: GeocoderBox) -> Pricing {
        Pricing::new(geocoder, Arc::new(EngineConfig::default()))
    }

    #[tokio::test]
    async fn test_geocode_failure_falls_back_to_zone_centroid() {
        let pricing = pricing(Box::new(FailingGeocoder));
        let coordinates = pricing.resolve_coordinates("Marché", Some("Kipé")).await;
        assert_eq!(coordinates, Coordinates::new(9.5980, -13.6530));
    }

    #[tokio::test]
    async fn test_unknown_zone_falls_back_to_city_centroid() {
        let pricing = pricing(Box::new(FailingGeocoder));
        let coordinates = pricing.resolve_coordinates("Marché", Some("Atlantis")).await;
        assert_eq!(coordinates, EngineConfig::default().city_centroid);
    }

    #[tokio::test]
    async fn test_invalid_geocode_result_is_ignored() {
        let pricing = pricing(Box::new(FixedGeocoder(Coordinates::new(f64::NAN, 0.0))));
        let coordinates = pricing.resolve_coordinates("Marché", Some("Kaloum")).await;
        assert_eq!(coordinates, Coordinates::new(9.5092, -13.7122));
    }

    #[tokio::test]
    async fn test_geocode_success_is_used() {
        let target = Coordinates::new(9.60, -13.64);
        let pricing = pricing(Box::new(FixedGeocoder(target)));
        assert_eq!(pricing.resolve_coordinates("Marché", None).await, target);
    }

    #[test]
    fn test_quote_same_point_is_base_fee() {
        let pricing = pricing(Box::new(FailingGeocoder));
        let point = Coordinates::new(9.5980, -13.6530);
        let quote = pricing.quote(point, point, Some(25));
        assert_eq!(quote.distance_km, 0.0);
        assert_eq!(quote.fee, Money::new(dec!(5000)));
        assert_eq!(quote.estimated_minutes, 25);
    }
}
