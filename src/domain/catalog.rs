use super::geo::Coordinates;
use super::money::Money;
use serde::{Deserialize, Serialize};

pub type VendorId = u32;
pub type ItemId = u32;
pub type CourierId = u32;

/// A fulfilling party (restaurant) serving one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: VendorId,
    pub name: String,
    /// Channel identity that receives new orders. Empty means unknown.
    #[serde(default)]
    pub phone: String,
    /// Zone label as entered by the vendor (e.g. `Kipé`).
    pub zone: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    pub active: bool,
    pub average_prep_minutes: Option<u32>,
    #[serde(default)]
    pub rating: f32,
}

impl Vendor {
    /// Rating label shown in vendor lists.
    pub fn rating_label(&self) -> String {
        if self.rating > 0.0 {
            format!("{:.1}⭐", self.rating)
        } else {
            "Nouveau".to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub vendor_id: VendorId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub category: String,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Courier {
    pub id: CourierId,
    pub name: String,
    pub phone: String,
    pub coordinates: Coordinates,
    pub available: bool,
}
