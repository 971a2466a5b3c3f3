//! Demo records for Conakry, used by the binary when no store is configured.

use super::in_memory::{InMemoryCatalog, InMemoryCourierPool, TableGeocoder};
use crate::domain::catalog::{Courier, Item, Vendor};
use crate::domain::geo::Coordinates;
use crate::domain::money::Money;
use rust_decimal::Decimal;

fn vendor(id: u32, name: &str, phone: &str, zone: &str, prep: u32, rating: f32) -> Vendor {
    Vendor {
        id,
        name: name.to_string(),
        phone: phone.to_string(),
        zone: zone.to_string(),
        address: None,
        coordinates: None,
        active: true,
        average_prep_minutes: Some(prep),
        rating,
    }
}

fn item(id: u32, vendor_id: u32, name: &str, description: &str, price: i64, category: &str) -> Item {
    Item {
        id,
        vendor_id,
        name: name.to_string(),
        description: description.to_string(),
        price: Money::new(Decimal::from(price)),
        category: category.to_string(),
        available: true,
    }
}

pub fn vendors() -> Vec<Vendor> {
    vec![
        vendor(1, "Chez Mizo", "224622000111", "Kipé", 25, 4.6),
        vendor(2, "Restaurant Barita", "224633111222", "Kaloum", 30, 4.4),
        vendor(3, "Le Délice de Ratoma", "224655222333", "Ratoma", 20, 4.2),
    ]
}

pub fn items() -> Vec<Item> {
    vec![
        item(1, 1, "Riz sauce arachide", "Mafé", 15000, "Plat"),
        item(2, 1, "Riz au gras", "Au bon goût local", 12000, "Plat"),
        item(3, 1, "Poisson braisé", "Grillé aux épices", 25000, "Plat"),
        item(4, 1, "Coca-Cola 33cl", "", 3000, "Boisson"),
        item(5, 2, "Poulet yassa", "", 22000, "Plat"),
        item(6, 2, "Atiéké poisson", "", 20000, "Plat"),
        item(7, 2, "Eau minérale 50cl", "", 2000, "Boisson"),
        item(8, 3, "Fouti fonio", "", 18000, "Plat"),
        item(9, 3, "Salade de fruits", "", 8000, "Dessert"),
    ]
}

pub fn catalog() -> InMemoryCatalog {
    InMemoryCatalog::with_records(vendors(), items())
}

pub fn couriers() -> InMemoryCourierPool {
    let courier = |id, name: &str, phone: &str, latitude, longitude| Courier {
        id,
        name: name.to_string(),
        phone: phone.to_string(),
        coordinates: Coordinates::new(latitude, longitude),
        available: true,
    };
    InMemoryCourierPool::new(vec![
        courier(1, "Mamadou", "224628000001", 9.6010, -13.6500),
        courier(2, "Fatoumata", "224628000002", 9.5120, -13.7100),
        courier(3, "Ibrahima", "224628000003", 9.5900, -13.6420),
    ])
}

/// Geocoder knowing a handful of landmarks; anything else falls back to
/// zone centroids.
pub fn geocoder() -> TableGeocoder {
    TableGeocoder::new()
        .with_entry("Marché de Kipé", Coordinates::new(9.6002, -13.6518))
        .with_entry("Rond-point de Kipé", Coordinates::new(9.5968, -13.6549))
        .with_entry("Port autonome", Coordinates::new(9.5110, -13.7180))
        .with_entry("Université Gamal", Coordinates::new(9.6400, -13.6180))
}
