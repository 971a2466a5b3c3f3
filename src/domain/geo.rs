//! Pricing & geo rules: great-circle distance, tiered delivery fee and ETA.
//!
//! Everything here is pure; the only fallible piece of the pipeline
//! (geocoding) lives behind the `Geocoder` port and is wrapped by
//! `application::pricing`.

use super::money::Money;
use crate::error::{OrderFlowError, Result};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Great-circle distance in kilometres.
pub fn distance_km(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// One stepped add-on: applies once the distance exceeds `above_km`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeStep {
    pub above_km: f64,
    pub add: Money,
}

/// Linear surcharge per started kilometre beyond `above_km`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerKmSurcharge {
    pub above_km: f64,
    pub rate: Money,
}

/// Delivery fee table.
///
/// `base_fee` covers short trips; each step adds its amount once the
/// distance is strictly above its threshold, and the optional per-km
/// surcharge covers the flat-plus-per-km variant. Non-negative increments
/// keep the fee non-decreasing in distance whatever the thresholds are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub base_fee: Money,
    #[serde(default)]
    pub steps: Vec<FeeStep>,
    #[serde(default)]
    pub per_km: Option<PerKmSurcharge>,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            base_fee: Money::new(Decimal::from(5000)),
            steps: vec![
                FeeStep {
                    above_km: 2.0,
                    add: Money::new(Decimal::from(3000)),
                },
                FeeStep {
                    above_km: 5.0,
                    add: Money::new(Decimal::from(4000)),
                },
                FeeStep {
                    above_km: 10.0,
                    add: Money::new(Decimal::from(5000)),
                },
            ],
            per_km: None,
        }
    }
}

impl FeeSchedule {
    pub fn validate(&self) -> Result<()> {
        if self.base_fee.is_negative() {
            return Err(OrderFlowError::ValidationError(
                "Delivery base fee must not be negative".to_string(),
            ));
        }
        for step in &self.steps {
            if !step.above_km.is_finite() || step.above_km < 0.0 {
                return Err(OrderFlowError::ValidationError(format!(
                    "Invalid fee step threshold: {}",
                    step.above_km
                )));
            }
            if step.add.is_negative() {
                return Err(OrderFlowError::ValidationError(
                    "Fee step increments must not be negative".to_string(),
                ));
            }
        }
        if let Some(per_km) = &self.per_km
            && (per_km.rate.is_negative() || !per_km.above_km.is_finite() || per_km.above_km < 0.0)
        {
            return Err(OrderFlowError::ValidationError(
                "Per-km surcharge must have a non-negative rate and threshold".to_string(),
            ));
        }
        Ok(())
    }

    /// Fee for a trip of `distance_km`.
    pub fn fee_for(&self, distance_km: f64) -> Money {
        let distance = if distance_km.is_finite() {
            distance_km.max(0.0)
        } else {
            0.0
        };

        let mut fee = self.base_fee;
        for step in &self.steps {
            if distance > step.above_km {
                fee += step.add;
            }
        }
        if let Some(per_km) = &self.per_km
            && distance > per_km.above_km
        {
            let started_km = (distance - per_km.above_km).ceil();
            let km = Decimal::from_f64(started_km).unwrap_or(Decimal::ZERO);
            fee += Money::new(per_km.rate.value() * km);
        }
        fee
    }
}

/// Preparation time plus travel time at `average_speed_kmh`, in minutes.
pub fn estimated_minutes(distance_km: f64, prep_minutes: u32, average_speed_kmh: f64) -> u32 {
    if average_speed_kmh <= 0.0 || !distance_km.is_finite() || distance_km <= 0.0 {
        return prep_minutes;
    }
    let travel = (distance_km / average_speed_kmh * 60.0).round();
    prep_minutes.saturating_add(travel as u32)
}
