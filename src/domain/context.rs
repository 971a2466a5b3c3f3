use super::cart::Cart;
use super::catalog::{ItemId, VendorId};
use super::geo::Coordinates;
use super::money::Money;
use super::settlement::SettlementMethod;
use crate::error::{OrderFlowError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version written into every snapshot; anything else is discarded on load.
pub const CONTEXT_SCHEMA_VERSION: u32 = 1;

/// Steps of the ordering dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    #[default]
    New,
    PickZone,
    PickVendor,
    PickItem,
    PickQuantity,
    CartReview,
    NeedAddress,
    PaymentMethod,
    PaymentPhone,
    OrderCompleted,
    Cancelled,
}

impl ConversationState {
    /// States from which the next turn starts a fresh flow.
    pub fn is_idle(&self) -> bool {
        matches!(
            self,
            ConversationState::New | ConversationState::OrderCompleted | ConversationState::Cancelled
        )
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConversationState::New => "new",
            ConversationState::PickZone => "pick_zone",
            ConversationState::PickVendor => "pick_vendor",
            ConversationState::PickItem => "pick_item",
            ConversationState::PickQuantity => "pick_quantity",
            ConversationState::CartReview => "cart_review",
            ConversationState::NeedAddress => "need_address",
            ConversationState::PaymentMethod => "payment_method",
            ConversationState::PaymentPhone => "payment_phone",
            ConversationState::OrderCompleted => "order_completed",
            ConversationState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Per-identity dialogue state carried between turns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConversationContext {
    pub state: ConversationState,
    pub selected_zone: Option<String>,
    pub selected_vendor_id: Option<VendorId>,
    pub cart: Cart,
    /// Vendor the cart lines were taken from.
    pub cart_vendor_id: Option<VendorId>,
    pub pending_item_id: Option<ItemId>,
    pub delivery_address: Option<String>,
    pub delivery_coordinates: Option<Coordinates>,
    pub distance_km: Option<f64>,
    pub delivery_fee: Option<Money>,
    pub estimated_minutes: Option<u32>,
    pub settlement_method: Option<SettlementMethod>,
    pub settlement_phone: Option<String>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards every selection and the cart.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Clears the checkout data computed after the cart review.
    pub fn clear_checkout(&mut self) {
        self.delivery_address = None;
        self.delivery_coordinates = None;
        self.distance_km = None;
        self.delivery_fee = None;
        self.estimated_minutes = None;
        self.settlement_method = None;
        self.settlement_phone = None;
    }

    pub fn has_delivery_destination(&self) -> bool {
        self.delivery_address
            .as_deref()
            .is_some_and(|a| !a.trim().is_empty())
            || self.delivery_coordinates.is_some()
    }
}

/// Durable per-identity record; the payload is opaque to stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    pub identity: String,
    pub schema_version: u32,
    pub payload: String,
    pub last_interaction: DateTime<Utc>,
}

impl ConversationSnapshot {
    pub fn capture(identity: &str, context: &ConversationContext) -> Result<Self> {
        Ok(Self {
            identity: identity.to_string(),
            schema_version: CONTEXT_SCHEMA_VERSION,
            payload: serde_json::to_string(context)?,
            last_interaction: Utc::now(),
        })
    }

    /// Decodes the context, rejecting snapshots written with another schema.
    pub fn restore(&self) -> Result<ConversationContext> {
        if self.schema_version != CONTEXT_SCHEMA_VERSION {
            return Err(OrderFlowError::ValidationError(format!(
                "Unsupported context schema version {}",
                self.schema_version
            )));
        }
        Ok(serde_json::from_str(&self.payload)?)
    }
}
