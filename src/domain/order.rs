use super::cart::CartLine;
use super::catalog::{CourierId, ItemId, VendorId};
use super::geo::Coordinates;
use super::money::Money;
use super::settlement::SettlementMethod;
use crate::error::{OrderFlowError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type OrderId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Assigned,
    Delivering,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// pending → confirmed → preparing → ready → [assigned] → delivering →
    /// delivered, or cancelled from anything short of delivered.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (Delivered | Cancelled, _) => false,
            (_, Cancelled) => true,
            (Pending, Confirmed)
            | (Confirmed, Preparing)
            | (Preparing, Ready)
            | (Ready, Assigned)
            | (Ready, Delivering)
            | (Assigned, Delivering)
            | (Delivering, Delivered) => true,
            _ => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Assigned => "assigned",
            OrderStatus::Delivering => "delivering",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl SettlementStatus {
    pub fn can_transition_to(&self, next: SettlementStatus) -> bool {
        use SettlementStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Failed)
                | (Processing, Completed)
                | (Processing, Failed)
        )
    }
}

impl fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SettlementStatus::Pending => "pending",
            SettlementStatus::Processing => "processing",
            SettlementStatus::Completed => "completed",
            SettlementStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Immutable snapshot of one cart line inside an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub item_id: ItemId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
}

impl From<&CartLine> for OrderLine {
    fn from(line: &CartLine) -> Self {
        Self {
            item_id: line.item_id,
            name: line.name.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            line_total: line.line_total(),
        }
    }
}

/// Order data before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer: String,
    pub vendor_id: VendorId,
    pub items: Vec<OrderLine>,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub total_amount: Money,
    pub vendor_commission: Money,
    pub settlement_method: SettlementMethod,
    pub settlement_phone: Option<String>,
    pub delivery_address: Option<String>,
    pub delivery_coordinates: Option<Coordinates>,
    pub estimated_minutes: u32,
    pub estimated_delivery_time: DateTime<Utc>,
}

/// Permanent record of a completed conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer: String,
    pub vendor_id: VendorId,
    pub items: Vec<OrderLine>,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub total_amount: Money,
    pub vendor_commission: Money,
    pub status: OrderStatus,
    pub settlement_method: SettlementMethod,
    pub settlement_phone: Option<String>,
    pub settlement_status: SettlementStatus,
    pub settlement_reference: Option<String>,
    pub delivery_address: Option<String>,
    pub delivery_coordinates: Option<Coordinates>,
    pub estimated_minutes: u32,
    pub estimated_delivery_time: DateTime<Utc>,
    pub courier_id: Option<CourierId>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn from_new(id: OrderId, new: NewOrder) -> Self {
        Self {
            id,
            customer: new.customer,
            vendor_id: new.vendor_id,
            items: new.items,
            subtotal: new.subtotal,
            delivery_fee: new.delivery_fee,
            total_amount: new.total_amount,
            vendor_commission: new.vendor_commission,
            status: OrderStatus::Pending,
            settlement_method: new.settlement_method,
            settlement_phone: new.settlement_phone,
            settlement_status: SettlementStatus::Pending,
            settlement_reference: None,
            delivery_address: new.delivery_address,
            delivery_coordinates: new.delivery_coordinates,
            estimated_minutes: new.estimated_minutes,
            estimated_delivery_time: new.estimated_delivery_time,
            courier_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn transition_status(&mut self, next: OrderStatus) -> Result<()> {
        if self.status.can_transition_to(next) {
            self.status = next;
            Ok(())
        } else {
            Err(OrderFlowError::ValidationError(format!(
                "Order {} cannot move from {} to {}",
                self.id, self.status, next
            )))
        }
    }

    pub fn transition_settlement(&mut self, next: SettlementStatus) -> Result<()> {
        if self.settlement_status.can_transition_to(next) {
            self.settlement_status = next;
            Ok(())
        } else {
            Err(OrderFlowError::ValidationError(format!(
                "Order {} settlement cannot move from {} to {}",
                self.id, self.settlement_status, next
            )))
        }
    }

    pub fn assign_courier(&mut self, courier_id: CourierId) {
        self.courier_id = Some(courier_id);
        if self.status == OrderStatus::Ready {
            self.status = OrderStatus::Assigned;
        }
    }
}

/// Running totals kept on a customer record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomerStats {
    pub identity: String,
    pub order_count: u32,
    pub lifetime_spend: Money,
}

/// Running totals kept on a vendor record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VendorStats {
    pub vendor_id: VendorId,
    pub order_count: u32,
    pub lifetime_revenue: Money,
}
