use super::catalog::{Courier, CourierId, Item, Vendor, VendorId};
use super::context::ConversationSnapshot;
use super::geo::Coordinates;
use super::money::Money;
use super::order::{CustomerStats, NewOrder, Order, OrderId, SettlementStatus, VendorStats};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Read-only catalog lookups. Implementations return raw records; the engine
/// filters on `active`/`available` on every read.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn vendors_in_zone(&self, zone: &str) -> Result<Vec<Vendor>>;
    async fn vendor(&self, vendor_id: VendorId) -> Result<Option<Vendor>>;
    async fn items_for_vendor(&self, vendor_id: VendorId) -> Result<Vec<Item>>;
}

/// Durable order records plus the running aggregates attached to them.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create_order(&self, order: NewOrder) -> Result<Order>;
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;
    async fn all_orders(&self) -> Result<Vec<Order>>;
    async fn update_customer_aggregates(&self, identity: &str, spend: Money)
    -> Result<CustomerStats>;
    async fn update_vendor_aggregates(&self, vendor_id: VendorId, revenue: Money)
    -> Result<VendorStats>;
    async fn assign_courier(&self, order_id: OrderId, courier_id: CourierId) -> Result<()>;
    async fn update_settlement(
        &self,
        order_id: OrderId,
        status: SettlementStatus,
        reference: Option<String>,
    ) -> Result<()>;
}

/// Per-identity conversation snapshots.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn load(&self, identity: &str) -> Result<Option<ConversationSnapshot>>;
    async fn save(&self, snapshot: ConversationSnapshot) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListRow {
    pub id: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyButton {
    pub id: String,
    pub title: String,
}

/// Outbound channel client. Every call reports success as a boolean; a
/// failed send is never an error for the caller.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, to: &str, body: &str) -> bool;
    async fn send_list(
        &self,
        to: &str,
        header: &str,
        body: &str,
        button_label: &str,
        rows: &[ListRow],
    ) -> bool;
    async fn send_buttons(&self, to: &str, body: &str, buttons: &[ReplyButton]) -> bool;
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str, zone: Option<&str>) -> Result<Coordinates>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementReceipt {
    pub accepted: bool,
    pub reference: Option<String>,
}

/// Mobile-money charge initiation for one network.
#[async_trait]
pub trait SettlementGateway: Send + Sync {
    async fn initiate(&self, phone: &str, amount: Money, order_id: OrderId)
    -> Result<SettlementReceipt>;
}

#[async_trait]
pub trait CourierPool: Send + Sync {
    async fn available_couriers(&self) -> Result<Vec<Courier>>;
    async fn mark_unavailable(&self, courier_id: CourierId) -> Result<()>;
}

pub type CatalogStoreBox = Box<dyn CatalogStore>;
pub type OrderStoreBox = Box<dyn OrderStore>;
pub type ConversationStoreBox = Box<dyn ConversationStore>;
pub type MessengerBox = Box<dyn Messenger>;
pub type GeocoderBox = Box<dyn Geocoder>;
pub type SettlementGatewayBox = Box<dyn SettlementGateway>;
pub type CourierPoolBox = Box<dyn CourierPool>;
