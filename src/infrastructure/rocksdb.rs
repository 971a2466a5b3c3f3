use crate::domain::catalog::{CourierId, VendorId};
use crate::domain::context::ConversationSnapshot;
use crate::domain::money::Money;
use crate::domain::order::{
    CustomerStats, NewOrder, Order, OrderId, SettlementStatus, VendorStats,
};
use crate::domain::ports::{ConversationStore, OrderStore};
use crate::error::{OrderFlowError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for conversation snapshots, keyed by identity.
pub const CF_CONVERSATIONS: &str = "conversations";
/// Column Family for orders, keyed by big-endian order id.
pub const CF_ORDERS: &str = "orders";
/// Column Family for customer aggregates, keyed by identity.
pub const CF_CUSTOMERS: &str = "customers";
/// Column Family for vendor aggregates, keyed by big-endian vendor id.
pub const CF_VENDORS: &str = "vendors";
/// Column Family for counters.
pub const CF_META: &str = "meta";

const NEXT_ORDER_ID_KEY: &[u8] = b"next_order_id";

/// A persistent store for orders and conversation snapshots using RocksDB.
///
/// Records are stored as JSON in separate Column Families. Read-modify-write
/// sequences (order ids, aggregates, order updates) run under one async
/// mutex; plain reads and snapshot writes go straight to the database.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating
    /// missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_CONVERSATIONS, CF_ORDERS, CF_CUSTOMERS, CF_VENDORS, CF_META]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            OrderFlowError::InternalError(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn get_json<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.handle(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.handle(cf_name)?;
        self.db.put_cf(cf, key, serde_json::to_vec(value)?)?;
        Ok(())
    }

    fn next_order_id(&self) -> Result<OrderId> {
        let cf = self.handle(CF_META)?;
        let last = match self.db.get_cf(cf, NEXT_ORDER_ID_KEY)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    OrderFlowError::InternalError(Box::new(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "Corrupted order id counter",
                    )))
                })?;
                u64::from_be_bytes(raw)
            }
            None => 0,
        };
        let next = last + 1;
        self.db.put_cf(cf, NEXT_ORDER_ID_KEY, next.to_be_bytes())?;
        Ok(next)
    }

    fn order_or_not_found(&self, order_id: OrderId) -> Result<Order> {
        self.get_json(CF_ORDERS, &order_id.to_be_bytes())?
            .ok_or_else(|| OrderFlowError::NotFound(format!("order {order_id}")))
    }
}

#[async_trait]
impl ConversationStore for RocksDBStore {
    async fn load(&self, identity: &str) -> Result<Option<ConversationSnapshot>> {
        self.get_json(CF_CONVERSATIONS, identity.as_bytes())
    }

    async fn save(&self, snapshot: ConversationSnapshot) -> Result<()> {
        self.put_json(CF_CONVERSATIONS, snapshot.identity.as_bytes(), &snapshot)
    }
}

#[async_trait]
impl OrderStore for RocksDBStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        if order.items.is_empty() {
            return Err(OrderFlowError::ValidationError(
                "Order must contain at least one item".to_string(),
            ));
        }
        let _guard = self.write_lock.lock().await;
        let order = Order::from_new(self.next_order_id()?, order);
        self.put_json(CF_ORDERS, &order.id.to_be_bytes(), &order)?;
        Ok(order)
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        self.get_json(CF_ORDERS, &order_id.to_be_bytes())
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        let cf = self.handle(CF_ORDERS)?;
        let mut orders = Vec::new();
        for entry in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = entry?;
            orders.push(serde_json::from_slice(&value)?);
        }
        Ok(orders)
    }

    async fn update_customer_aggregates(
        &self,
        identity: &str,
        spend: Money,
    ) -> Result<CustomerStats> {
        let _guard = self.write_lock.lock().await;
        let mut stats: CustomerStats = self
            .get_json(CF_CUSTOMERS, identity.as_bytes())?
            .unwrap_or_else(|| CustomerStats {
                identity: identity.to_string(),
                ..Default::default()
            });
        stats.order_count += 1;
        stats.lifetime_spend += spend;
        self.put_json(CF_CUSTOMERS, identity.as_bytes(), &stats)?;
        Ok(stats)
    }

    async fn update_vendor_aggregates(
        &self,
        vendor_id: VendorId,
        revenue: Money,
    ) -> Result<VendorStats> {
        let _guard = self.write_lock.lock().await;
        let key = vendor_id.to_be_bytes();
        let mut stats: VendorStats = self
            .get_json(CF_VENDORS, &key)?
            .unwrap_or_else(|| VendorStats {
                vendor_id,
                ..Default::default()
            });
        stats.order_count += 1;
        stats.lifetime_revenue += revenue;
        self.put_json(CF_VENDORS, &key, &stats)?;
        Ok(stats)
    }

    async fn assign_courier(&self, order_id: OrderId, courier_id: CourierId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut order = self.order_or_not_found(order_id)?;
        order.assign_courier(courier_id);
        self.put_json(CF_ORDERS, &order_id.to_be_bytes(), &order)
    }

    async fn update_settlement(
        &self,
        order_id: OrderId,
        status: SettlementStatus,
        reference: Option<String>,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut order = self.order_or_not_found(order_id)?;
        order.transition_settlement(status)?;
        if reference.is_some() {
            order.settlement_reference = reference;
        }
        self.put_json(CF_ORDERS, &order_id.to_be_bytes(), &order)
    }
}
