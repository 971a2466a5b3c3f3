use crate::domain::catalog::{Courier, CourierId, Item, Vendor, VendorId};
use crate::domain::context::ConversationSnapshot;
use crate::domain::geo::Coordinates;
use crate::domain::money::Money;
use crate::domain::order::{
    CustomerStats, NewOrder, Order, OrderId, SettlementStatus, VendorStats,
};
use crate::domain::ports::{
    CatalogStore, ConversationStore, CourierPool, Geocoder, ListRow, Messenger, OrderStore,
    ReplyButton, SettlementGateway, SettlementReceipt,
};
use crate::domain::text::{contains_phrase, normalize};
use crate::error::{OrderFlowError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::info;

/// A thread-safe in-memory catalog.
///
/// Clones share the same records, so a test can keep a handle and flip
/// availability flags while the engine owns another clone.
#[derive(Default, Clone)]
pub struct InMemoryCatalog {
    vendors: Arc<RwLock<BTreeMap<VendorId, Vendor>>>,
    items: Arc<RwLock<BTreeMap<u32, Item>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(vendors: Vec<Vendor>, items: Vec<Item>) -> Self {
        Self {
            vendors: Arc::new(RwLock::new(vendors.into_iter().map(|v| (v.id, v)).collect())),
            items: Arc::new(RwLock::new(items.into_iter().map(|i| (i.id, i)).collect())),
        }
    }

    pub async fn upsert_vendor(&self, vendor: Vendor) {
        self.vendors.write().await.insert(vendor.id, vendor);
    }

    pub async fn upsert_item(&self, item: Item) {
        self.items.write().await.insert(item.id, item);
    }

    pub async fn set_item_price(&self, item_id: u32, price: Money) -> Result<()> {
        let mut items = self.items.write().await;
        let item = items
            .get_mut(&item_id)
            .ok_or_else(|| OrderFlowError::NotFound(format!("item {item_id}")))?;
        item.price = price;
        Ok(())
    }

    pub async fn set_item_available(&self, item_id: u32, available: bool) -> Result<()> {
        let mut items = self.items.write().await;
        let item = items
            .get_mut(&item_id)
            .ok_or_else(|| OrderFlowError::NotFound(format!("item {item_id}")))?;
        item.available = available;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    /// Vendors whose zone label mentions `zone`, ignoring case and accents.
    async fn vendors_in_zone(&self, zone: &str) -> Result<Vec<Vendor>> {
        let wanted = normalize(zone);
        if wanted.is_empty() {
            return Ok(vec![]);
        }
        let vendors = self.vendors.read().await;
        Ok(vendors
            .values()
            .filter(|v| contains_phrase(&normalize(&v.zone), &wanted))
            .cloned()
            .collect())
    }

    async fn vendor(&self, vendor_id: VendorId) -> Result<Option<Vendor>> {
        Ok(self.vendors.read().await.get(&vendor_id).cloned())
    }

    async fn items_for_vendor(&self, vendor_id: VendorId) -> Result<Vec<Item>> {
        let items = self.items.read().await;
        Ok(items
            .values()
            .filter(|i| i.vendor_id == vendor_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct OrderTables {
    next_id: OrderId,
    orders: BTreeMap<OrderId, Order>,
    customers: HashMap<String, CustomerStats>,
    vendors: HashMap<VendorId, VendorStats>,
}

/// A thread-safe in-memory order store with sequential ids starting at 1.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    tables: Arc<RwLock<OrderTables>>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail, as a lost database connection would.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn customer_stats(&self, identity: &str) -> Option<CustomerStats> {
        self.tables.read().await.customers.get(identity).cloned()
    }

    pub async fn vendor_stats(&self, vendor_id: VendorId) -> Option<VendorStats> {
        self.tables.read().await.vendors.get(&vendor_id).cloned()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(OrderFlowError::CollaboratorError(
                "order store is not accepting writes".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        self.check_writable()?;
        if order.items.is_empty() {
            return Err(OrderFlowError::ValidationError(
                "Order must contain at least one item".to_string(),
            ));
        }
        let mut tables = self.tables.write().await;
        tables.next_id += 1;
        let order = Order::from_new(tables.next_id, order);
        tables.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&order_id).cloned())
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        Ok(self.tables.read().await.orders.values().cloned().collect())
    }

    async fn update_customer_aggregates(
        &self,
        identity: &str,
        spend: Money,
    ) -> Result<CustomerStats> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let stats = tables
            .customers
            .entry(identity.to_string())
            .or_insert_with(|| CustomerStats {
                identity: identity.to_string(),
                ..Default::default()
            });
        stats.order_count += 1;
        stats.lifetime_spend += spend;
        Ok(stats.clone())
    }

    async fn update_vendor_aggregates(
        &self,
        vendor_id: VendorId,
        revenue: Money,
    ) -> Result<VendorStats> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let stats = tables.vendors.entry(vendor_id).or_insert_with(|| VendorStats {
            vendor_id,
            ..Default::default()
        });
        stats.order_count += 1;
        stats.lifetime_revenue += revenue;
        Ok(stats.clone())
    }

    async fn assign_courier(&self, order_id: OrderId, courier_id: CourierId) -> Result<()> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| OrderFlowError::NotFound(format!("order {order_id}")))?;
        order.assign_courier(courier_id);
        Ok(())
    }

    async fn update_settlement(
        &self,
        order_id: OrderId,
        status: SettlementStatus,
        reference: Option<String>,
    ) -> Result<()> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| OrderFlowError::NotFound(format!("order {order_id}")))?;
        order.transition_settlement(status)?;
        if reference.is_some() {
            order.settlement_reference = reference;
        }
        Ok(())
    }
}

/// A thread-safe in-memory conversation snapshot store.
#[derive(Default, Clone)]
pub struct InMemoryConversationStore {
    snapshots: Arc<RwLock<HashMap<String, ConversationSnapshot>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn load(&self, identity: &str) -> Result<Option<ConversationSnapshot>> {
        Ok(self.snapshots.read().await.get(identity).cloned())
    }

    async fn save(&self, snapshot: ConversationSnapshot) -> Result<()> {
        self.snapshots
            .write()
            .await
            .insert(snapshot.identity.clone(), snapshot);
        Ok(())
    }
}

/// Geocoder backed by a fixed address table; unknown addresses fail.
#[derive(Default, Clone)]
pub struct TableGeocoder {
    entries: HashMap<String, Coordinates>,
}

impl TableGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, address: &str, coordinates: Coordinates) -> Self {
        self.entries.insert(normalize(address), coordinates);
        self
    }
}

#[async_trait]
impl Geocoder for TableGeocoder {
    async fn geocode(&self, address: &str, _zone: Option<&str>) -> Result<Coordinates> {
        let wanted = normalize(address);
        self.entries
            .iter()
            .find(|(key, _)| contains_phrase(&wanted, key))
            .map(|(_, coordinates)| *coordinates)
            .ok_or_else(|| {
                OrderFlowError::CollaboratorError(format!("no geocoding result for: {address}"))
            })
    }
}

/// One message captured by [`RecordingMessenger`].
#[derive(Debug, Clone, PartialEq)]
pub enum SentMessage {
    Text {
        to: String,
        body: String,
    },
    List {
        to: String,
        header: String,
        body: String,
        rows: Vec<ListRow>,
    },
    Buttons {
        to: String,
        body: String,
        buttons: Vec<ReplyButton>,
    },
}

impl SentMessage {
    pub fn to(&self) -> &str {
        match self {
            SentMessage::Text { to, .. }
            | SentMessage::List { to, .. }
            | SentMessage::Buttons { to, .. } => to,
        }
    }

    pub fn body(&self) -> &str {
        match self {
            SentMessage::Text { body, .. }
            | SentMessage::List { body, .. }
            | SentMessage::Buttons { body, .. } => body,
        }
    }

    /// Ids of the rows or buttons offered by the message.
    pub fn choice_ids(&self) -> Vec<&str> {
        match self {
            SentMessage::Text { .. } => vec![],
            SentMessage::List { rows, .. } => rows.iter().map(|r| r.id.as_str()).collect(),
            SentMessage::Buttons { buttons, .. } => {
                buttons.iter().map(|b| b.id.as_str()).collect()
            }
        }
    }
}

/// Messenger that records every message instead of sending it.
///
/// Failures can be scripted per recipient: the next `n` sends to that
/// recipient report `false` and are not recorded.
#[derive(Default, Clone)]
pub struct RecordingMessenger {
    sent: Arc<RwLock<Vec<SentMessage>>>,
    failures: Arc<RwLock<HashMap<String, u32>>>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_next_sends(&self, to: &str, count: u32) {
        self.failures.write().await.insert(to.to_string(), count);
    }

    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.read().await.clone()
    }

    pub async fn sent_to(&self, to: &str) -> Vec<SentMessage> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|m| m.to() == to)
            .cloned()
            .collect()
    }

    pub async fn clear(&self) {
        self.sent.write().await.clear();
    }

    async fn deliver(&self, message: SentMessage) -> bool {
        {
            let mut failures = self.failures.write().await;
            if let Some(remaining) = failures.get_mut(message.to())
                && *remaining > 0
            {
                *remaining -= 1;
                return false;
            }
        }
        self.sent.write().await.push(message);
        true
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, to: &str, body: &str) -> bool {
        self.deliver(SentMessage::Text {
            to: to.to_string(),
            body: body.to_string(),
        })
        .await
    }

    async fn send_list(
        &self,
        to: &str,
        header: &str,
        body: &str,
        _button_label: &str,
        rows: &[ListRow],
    ) -> bool {
        self.deliver(SentMessage::List {
            to: to.to_string(),
            header: header.to_string(),
            body: body.to_string(),
            rows: rows.to_vec(),
        })
        .await
    }

    async fn send_buttons(&self, to: &str, body: &str, buttons: &[ReplyButton]) -> bool {
        self.deliver(SentMessage::Buttons {
            to: to.to_string(),
            body: body.to_string(),
            buttons: buttons.to_vec(),
        })
        .await
    }
}

/// Messenger that writes the outbound transcript to the log.
#[derive(Default, Clone)]
pub struct LogMessenger;

#[async_trait]
impl Messenger for LogMessenger {
    async fn send_text(&self, to: &str, body: &str) -> bool {
        info!(target: "menuflow::transcript", to, kind = "text", "{body}");
        true
    }

    async fn send_list(
        &self,
        to: &str,
        header: &str,
        body: &str,
        button_label: &str,
        rows: &[ListRow],
    ) -> bool {
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        info!(
            target: "menuflow::transcript",
            to,
            kind = "list",
            header,
            button_label,
            rows = ?ids,
            "{body}"
        );
        true
    }

    async fn send_buttons(&self, to: &str, body: &str, buttons: &[ReplyButton]) -> bool {
        let ids: Vec<&str> = buttons.iter().map(|b| b.id.as_str()).collect();
        info!(target: "menuflow::transcript", to, kind = "buttons", buttons = ?ids, "{body}");
        true
    }
}

/// Settlement gateway that records initiations and accepts or declines all.
#[derive(Clone)]
pub struct RecordingSettlementGateway {
    prefix: String,
    accept: bool,
    calls: Arc<RwLock<Vec<(String, Money, OrderId)>>>,
}

impl RecordingSettlementGateway {
    /// Accepting gateway issuing references `<prefix>-<order id>`.
    pub fn accepting(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            accept: true,
            calls: Arc::default(),
        }
    }

    pub fn declining(prefix: &str) -> Self {
        Self {
            accept: false,
            ..Self::accepting(prefix)
        }
    }

    pub async fn calls(&self) -> Vec<(String, Money, OrderId)> {
        self.calls.read().await.clone()
    }
}

#[async_trait]
impl SettlementGateway for RecordingSettlementGateway {
    async fn initiate(
        &self,
        phone: &str,
        amount: Money,
        order_id: OrderId,
    ) -> Result<SettlementReceipt> {
        self.calls
            .write()
            .await
            .push((phone.to_string(), amount, order_id));
        Ok(SettlementReceipt {
            accepted: self.accept,
            reference: self.accept.then(|| format!("{}-{order_id}", self.prefix)),
        })
    }
}

/// A thread-safe in-memory courier pool.
#[derive(Default, Clone)]
pub struct InMemoryCourierPool {
    couriers: Arc<RwLock<BTreeMap<CourierId, Courier>>>,
}

impl InMemoryCourierPool {
    pub fn new(couriers: Vec<Courier>) -> Self {
        Self {
            couriers: Arc::new(RwLock::new(couriers.into_iter().map(|c| (c.id, c)).collect())),
        }
    }

    pub async fn courier(&self, courier_id: CourierId) -> Option<Courier> {
        self.couriers.read().await.get(&courier_id).cloned()
    }
}

#[async_trait]
impl CourierPool for InMemoryCourierPool {
    async fn available_couriers(&self) -> Result<Vec<Courier>> {
        Ok(self
            .couriers
            .read()
            .await
            .values()
            .filter(|c| c.available)
            .cloned()
            .collect())
    }

    async fn mark_unavailable(&self, courier_id: CourierId) -> Result<()> {
        let mut couriers = self.couriers.write().await;
        let courier = couriers
            .get_mut(&courier_id)
            .ok_or_else(|| OrderFlowError::NotFound(format!("courier {courier_id}")))?;
        courier.available = false;
        Ok(())
    }
}
