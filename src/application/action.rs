use crate::domain::catalog::{ItemId, VendorId};
use crate::domain::geo::Coordinates;
use crate::domain::settlement::SettlementMethod;

/// Delivery destination as supplied by the customer.
#[derive(Debug, Clone, PartialEq)]
pub enum AddressInput {
    Text(String),
    Location {
        coordinates: Coordinates,
        label: Option<String>,
    },
}

/// A discrete dialogue action decoded from one inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Greeting: starts a flow from an idle state.
    Start,
    /// Page of the zone picker.
    ListZones(usize),
    SelectZone(String),
    ShowVendors,
    SelectVendor(VendorId),
    /// `quantity` is set when the selection folds item and quantity together.
    SelectItem {
        item_id: ItemId,
        quantity: Option<u32>,
    },
    SelectQuantity(u32),
    RequestMoreItems,
    RequestCheckout,
    SubmitAddress(AddressInput),
    SelectPayment(SettlementMethod),
    SubmitPaymentPhone(String),
    /// Pay with the wallet behind the sender's own identity.
    UseOwnPhone,
    Cancel,
    /// Input that decoded to nothing usable; re-prompts the current step.
    Rejected(String),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::ListZones(_) => "list_zones",
            Action::SelectZone(_) => "select_zone",
            Action::ShowVendors => "show_vendors",
            Action::SelectVendor(_) => "select_vendor",
            Action::SelectItem { .. } => "select_item",
            Action::SelectQuantity(_) => "select_quantity",
            Action::RequestMoreItems => "request_more_items",
            Action::RequestCheckout => "request_checkout",
            Action::SubmitAddress(_) => "submit_address",
            Action::SelectPayment(_) => "select_payment",
            Action::SubmitPaymentPhone(_) => "submit_payment_phone",
            Action::UseOwnPhone => "use_own_phone",
            Action::Cancel => "cancel",
            Action::Rejected(_) => "rejected",
        }
    }
}
