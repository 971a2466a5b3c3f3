//! Checkout: turns a fully populated context into a persisted order.
//!
//! Only the order insert is fatal. Aggregates, notifications, courier
//! assignment and settlement initiation are best effort and never undo the
//! order once it exists.

use super::pricing::Pricing;
use super::reply::Reply;
use crate::config::EngineConfig;
use crate::domain::catalog::{Courier, Vendor};
use crate::domain::context::ConversationContext;
use crate::domain::geo::distance_km;
use crate::domain::money::Money;
use crate::domain::order::{NewOrder, Order, OrderLine, SettlementStatus};
use crate::domain::ports::{
    CatalogStore, CourierPoolBox, Messenger, OrderStore, SettlementGatewayBox,
};
use crate::domain::settlement::SettlementMethod;
use crate::error::OrderFlowError;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::{error, info, warn};

/// A checkout precondition that is not met.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Cart,
    Vendor,
    DeliveryAddress,
    SettlementMethod,
    SettlementPhone,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MissingField::Cart => "panier",
            MissingField::Vendor => "restaurant",
            MissingField::DeliveryAddress => "adresse de livraison",
            MissingField::SettlementMethod => "mode de paiement",
            MissingField::SettlementPhone => "numéro de paiement",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug)]
pub enum FinalizationError {
    #[error("Missing checkout information: {0:?}")]
    MissingInformation(Vec<MissingField>),
    #[error("Order could not be persisted: {0}")]
    Persistence(#[source] OrderFlowError),
}

impl FinalizationError {
    /// Message for the customer.
    pub fn customer_message(&self) -> String {
        match self {
            FinalizationError::MissingInformation(fields) => {
                let labels: Vec<String> = fields.iter().map(ToString::to_string).collect();
                format!("⚠️ Informations manquantes : {}.", labels.join(", "))
            }
            FinalizationError::Persistence(_) => super::prompts::ORDER_RETRY.to_string(),
        }
    }
}

/// Lists every unmet precondition of `ctx`, in checkout order.
pub fn missing_fields(ctx: &ConversationContext) -> Vec<MissingField> {
    let mut missing = vec![];
    if ctx.cart.is_empty() {
        missing.push(MissingField::Cart);
    }
    if ctx.cart_vendor_id.is_none() {
        missing.push(MissingField::Vendor);
    }
    if !ctx.has_delivery_destination() {
        missing.push(MissingField::DeliveryAddress);
    }
    match ctx.settlement_method {
        None => missing.push(MissingField::SettlementMethod),
        Some(method) if method.requires_phone() => {
            if ctx.settlement_phone.as_deref().is_none_or(|p| p.is_empty()) {
                missing.push(MissingField::SettlementPhone);
            }
        }
        Some(_) => {}
    }
    missing
}

pub struct Finalizer<'a> {
    pub catalog: &'a dyn CatalogStore,
    pub orders: &'a dyn OrderStore,
    pub messenger: &'a dyn Messenger,
    pub pricing: &'a Pricing,
    pub couriers: Option<&'a CourierPoolBox>,
    pub gateways: &'a HashMap<SettlementMethod, SettlementGatewayBox>,
    pub config: &'a EngineConfig,
}

impl Finalizer<'_> {
    /// Persists the order built from `ctx` and runs the follow-up effects.
    ///
    /// On success the context is reset and the customer confirmation is
    /// returned. On error the context is left exactly as it was.
    pub async fn finalize(
        &self,
        identity: &str,
        ctx: &mut ConversationContext,
    ) -> Result<(Order, Vec<Reply>), FinalizationError> {
        let missing = missing_fields(ctx);
        let (Some(vendor_id), Some(method), true) =
            (ctx.cart_vendor_id, ctx.settlement_method, missing.is_empty())
        else {
            return Err(FinalizationError::MissingInformation(missing));
        };

        let vendor = match self.catalog.vendor(vendor_id).await {
            Ok(Some(vendor)) => Some(vendor),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, vendor_id, "Vendor lookup failed during checkout");
                None
            }
        };

        let new_order = self.build_order(identity, ctx, vendor_id, method, vendor.as_ref());
        let order = self
            .orders
            .create_order(new_order)
            .await
            .map_err(FinalizationError::Persistence)?;
        info!(
            order_id = order.id,
            identity,
            vendor_id,
            total = %order.total_amount,
            "Order created"
        );

        self.update_aggregates(&order).await;
        self.notify_vendor(&order, vendor.as_ref()).await;
        let courier = self.assign_courier(&order, vendor.as_ref()).await;
        let settlement_reference = self.initiate_settlement(&order).await;

        let confirmation =
            self.confirmation(&order, courier.as_ref(), settlement_reference.as_deref());
        ctx.reset();
        Ok((order, vec![Reply::text(confirmation)]))
    }

    fn build_order(
        &self,
        identity: &str,
        ctx: &ConversationContext,
        vendor_id: u32,
        method: SettlementMethod,
        vendor: Option<&Vendor>,
    ) -> NewOrder {
        let items: Vec<OrderLine> = ctx.cart.lines().iter().map(OrderLine::from).collect();
        let subtotal: Money = items.iter().map(|l| l.line_total).sum();

        let (delivery_fee, estimated_minutes) =
            match (ctx.delivery_fee, ctx.estimated_minutes) {
                (Some(fee), Some(minutes)) => (fee, minutes),
                _ => {
                    let origin = match vendor {
                        Some(v) => self.pricing.vendor_origin(v.coordinates, &v.zone),
                        None => self.config.zone_centroid(ctx.selected_zone.as_deref()),
                    };
                    let destination = ctx
                        .delivery_coordinates
                        .unwrap_or_else(|| self.config.zone_centroid(ctx.selected_zone.as_deref()));
                    let quote = self.pricing.quote(
                        origin,
                        destination,
                        vendor.and_then(|v| v.average_prep_minutes),
                    );
                    (quote.fee, quote.estimated_minutes)
                }
            };

        NewOrder {
            customer: identity.to_string(),
            vendor_id,
            items,
            subtotal,
            delivery_fee,
            total_amount: subtotal + delivery_fee,
            vendor_commission: subtotal.apply_rate(self.config.commission_rate),
            settlement_method: method,
            settlement_phone: ctx.settlement_phone.clone(),
            delivery_address: ctx.delivery_address.clone(),
            delivery_coordinates: ctx.delivery_coordinates,
            estimated_minutes,
            estimated_delivery_time: Utc::now() + Duration::minutes(i64::from(estimated_minutes)),
        }
    }

    async fn update_aggregates(&self, order: &Order) {
        if let Err(e) = self
            .orders
            .update_customer_aggregates(&order.customer, order.total_amount)
            .await
        {
            warn!(error = %e, order_id = order.id, "Customer aggregates not updated");
        }
        if let Err(e) = self
            .orders
            .update_vendor_aggregates(order.vendor_id, order.subtotal)
            .await
        {
            warn!(error = %e, order_id = order.id, "Vendor aggregates not updated");
        }
    }

    async fn notify_vendor(&self, order: &Order, vendor: Option<&Vendor>) {
        let phone = vendor
            .map(|v| v.phone.trim())
            .filter(|p| !p.is_empty())
            .unwrap_or(self.config.default_vendor_phone.as_str());
        let currency = self.config.currency.as_str();

        let mut message = format!("🆕 *NOUVELLE COMMANDE #{}*\n\n", order.id);
        for line in &order.items {
            message.push_str(&format!(
                "• {}× {} ({})\n",
                line.quantity,
                line.name,
                line.line_total.format(currency)
            ));
        }
        message.push_str(&format!(
            "\nSous-total: {}\nLivraison: {}\n*Total: {}*\n\n📍 {}\n💳 {}\n📱 Client: {}",
            order.subtotal.format(currency),
            order.delivery_fee.format(currency),
            order.total_amount.format(currency),
            order.delivery_address.as_deref().unwrap_or("Position partagée"),
            order.settlement_method.label(),
            order.customer
        ));

        if self.messenger.send_text(phone, &message).await {
            return;
        }
        warn!(order_id = order.id, vendor_phone = phone, "Vendor notification failed, retrying short form");

        let fallback = format!(
            "Nouvelle commande #{} - {} - client {}",
            order.id,
            order.total_amount.format(currency),
            order.customer
        );
        if !self.messenger.send_text(phone, &fallback).await {
            error!(order_id = order.id, vendor_phone = phone, "Vendor was not notified of order");
        }
    }

    /// Picks the nearest available courier to the vendor and reserves it.
    async fn assign_courier(&self, order: &Order, vendor: Option<&Vendor>) -> Option<Courier> {
        let pool = self.couriers?;
        let couriers = match pool.available_couriers().await {
            Ok(couriers) => couriers,
            Err(e) => {
                warn!(error = %e, order_id = order.id, "Courier pool unavailable");
                return None;
            }
        };

        let origin = match vendor {
            Some(v) => self.pricing.vendor_origin(v.coordinates, &v.zone),
            None => self.config.city_centroid,
        };
        let courier = couriers
            .into_iter()
            .filter(|c| c.available && c.coordinates.is_valid())
            .min_by(|a, b| {
                distance_km(origin, a.coordinates).total_cmp(&distance_km(origin, b.coordinates))
            });
        let Some(courier) = courier else {
            info!(order_id = order.id, "No courier available");
            return None;
        };

        if let Err(e) = self.orders.assign_courier(order.id, courier.id).await {
            warn!(error = %e, order_id = order.id, courier_id = courier.id, "Courier not assigned");
            return None;
        }
        if let Err(e) = pool.mark_unavailable(courier.id).await {
            warn!(error = %e, courier_id = courier.id, "Courier availability not updated");
        }

        let message = format!(
            "🛵 Nouvelle course #{}\n📍 {}\n📱 Client: {}",
            order.id,
            order.delivery_address.as_deref().unwrap_or("Position partagée"),
            order.customer
        );
        if !self.messenger.send_text(&courier.phone, &message).await {
            warn!(order_id = order.id, courier_id = courier.id, "Courier was not notified");
        }
        info!(order_id = order.id, courier_id = courier.id, "Courier assigned");
        Some(courier)
    }

    /// Initiates the mobile-money charge; returns the provider reference
    /// when the provider accepted it.
    async fn initiate_settlement(&self, order: &Order) -> Option<String> {
        let method = order.settlement_method;
        if !method.requires_phone() {
            return None;
        }
        let phone = order.settlement_phone.as_deref()?;
        let Some(gateway) = self.gateways.get(&method) else {
            warn!(order_id = order.id, method = method.code(), "No gateway for settlement method");
            return None;
        };

        match gateway.initiate(phone, order.total_amount, order.id).await {
            Ok(receipt) if receipt.accepted => {
                if let Err(e) = self
                    .orders
                    .update_settlement(order.id, SettlementStatus::Processing, receipt.reference.clone())
                    .await
                {
                    warn!(error = %e, order_id = order.id, "Settlement status not recorded");
                }
                info!(order_id = order.id, method = method.code(), "Settlement initiated");
                receipt.reference
            }
            Ok(_) => {
                warn!(order_id = order.id, method = method.code(), "Settlement declined by provider");
                None
            }
            Err(e) => {
                warn!(error = %e, order_id = order.id, method = method.code(), "Settlement initiation failed");
                None
            }
        }
    }

    fn confirmation(
        &self,
        order: &Order,
        courier: Option<&Courier>,
        settlement_reference: Option<&str>,
    ) -> String {
        let currency = self.config.currency.as_str();
        let mut message = format!(
            "🎉 Commande #{} confirmée !\n\nTotal: {}\n⏱ Livraison estimée: ~{} min\n💳 {}",
            order.id,
            order.total_amount.format(currency),
            order.estimated_minutes,
            order.settlement_method.label()
        );
        if order.settlement_method.requires_phone() {
            match settlement_reference {
                Some(reference) => message.push_str(&format!(
                    "\nValidez le paiement sur votre téléphone (réf. {reference})."
                )),
                None => message.push_str("\nLe paiement sera confirmé à la livraison."),
            }
        }
        if let Some(courier) = courier {
            message.push_str(&format!("\n🛵 Livreur : {}", courier.name));
        }
        message.push_str("\n\nMerci ! Écrivez *bonjour* pour une nouvelle commande.");
        message
    }
}
