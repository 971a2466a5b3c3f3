//! Engine configuration.
//!
//! Every field has a default matching the Conakry deployment, so an empty
//! JSON object (or no file at all) yields a working engine.

use crate::domain::geo::{Coordinates, FeeSchedule};
use crate::domain::settlement::PhoneRules;
use crate::domain::text::normalize;
use crate::error::{OrderFlowError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl ZoneConfig {
    fn new(name: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.to_string(),
            latitude,
            longitude,
        }
    }

    pub fn centroid(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub currency: String,
    pub zones: Vec<ZoneConfig>,
    pub city_centroid: Coordinates,
    pub delivery: FeeSchedule,
    pub average_speed_kmh: f64,
    pub default_prep_minutes: u32,
    pub commission_rate: Decimal,
    pub default_vendor_phone: String,
    pub phone: PhoneRules,
    /// Alias → item-name fragment, both compared after normalization.
    pub synonyms: BTreeMap<String, String>,
    pub quantity_buttons: Vec<u32>,
    pub max_quantity_per_add: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            currency: "GNF".to_string(),
            zones: default_zones(),
            city_centroid: Coordinates::new(9.5370, -13.6773),
            delivery: FeeSchedule::default(),
            average_speed_kmh: 20.0,
            default_prep_minutes: 30,
            commission_rate: dec!(0.15),
            default_vendor_phone: "224611223344".to_string(),
            phone: PhoneRules::default(),
            synonyms: default_synonyms(),
            quantity_buttons: vec![1, 2, 3],
            max_quantity_per_add: 50,
        }
    }
}

fn default_zones() -> Vec<ZoneConfig> {
    vec![
        ZoneConfig::new("Kaloum", 9.5092, -13.7122),
        ZoneConfig::new("Dixinn", 9.5450, -13.6730),
        ZoneConfig::new("Ratoma", 9.5950, -13.6440),
        ZoneConfig::new("Matam", 9.5370, -13.6600),
        ZoneConfig::new("Matoto", 9.5700, -13.6200),
        ZoneConfig::new("Kipé", 9.5980, -13.6530),
        ZoneConfig::new("Camayenne", 9.5320, -13.6850),
        ZoneConfig::new("Almamya", 9.5140, -13.7080),
        ZoneConfig::new("Lambandji", 9.6220, -13.6250),
        ZoneConfig::new("Sonfonia", 9.6700, -13.5900),
        ZoneConfig::new("Hamdallaye", 9.5630, -13.6580),
        ZoneConfig::new("Koloma", 9.6080, -13.6190),
        ZoneConfig::new("Kagbelen", 9.7000, -13.5300),
        ZoneConfig::new("Nongo", 9.6360, -13.6400),
        ZoneConfig::new("Simbaya", 9.6000, -13.5800),
    ]
}

fn default_synonyms() -> BTreeMap<String, String> {
    [
        ("mafe", "riz sauce arachide"),
        ("arachide", "riz sauce arachide"),
        ("coca", "coca cola"),
        ("soda", "coca cola"),
        ("eau", "eau minerale"),
        ("poisson", "poisson braise"),
        ("yassa", "poulet yassa"),
        ("attieke", "atieke poisson"),
        ("fonio", "fouti fonio"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl EngineConfig {
    /// Loads a JSON configuration file and validates it.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.delivery.validate()?;
        if !(self.average_speed_kmh.is_finite() && self.average_speed_kmh > 0.0) {
            return Err(OrderFlowError::ValidationError(
                "average_speed_kmh must be positive".to_string(),
            ));
        }
        if self.commission_rate < Decimal::ZERO || self.commission_rate > Decimal::ONE {
            return Err(OrderFlowError::ValidationError(
                "commission_rate must be between 0 and 1".to_string(),
            ));
        }
        if self.zones.iter().any(|z| !z.centroid().is_valid()) || !self.city_centroid.is_valid() {
            return Err(OrderFlowError::ValidationError(
                "Zone centroids must be valid coordinates".to_string(),
            ));
        }
        if self.quantity_buttons.is_empty() || self.quantity_buttons.contains(&0) {
            return Err(OrderFlowError::ValidationError(
                "quantity_buttons must hold positive quantities".to_string(),
            ));
        }
        if self.max_quantity_per_add == 0 {
            return Err(OrderFlowError::ValidationError(
                "max_quantity_per_add must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Case and accent-insensitive zone lookup.
    pub fn zone(&self, name: &str) -> Option<&ZoneConfig> {
        let wanted = normalize(name);
        self.zones.iter().find(|z| normalize(&z.name) == wanted)
    }

    /// Centroid of `zone`, or the city centroid for unknown zones.
    pub fn zone_centroid(&self, zone: Option<&str>) -> Coordinates {
        zone.and_then(|z| self.zone(z))
            .map(ZoneConfig::centroid)
            .unwrap_or(self.city_centroid)
    }
}
