//! Dialogue State Machine.
//!
//! `Dialogue::apply` takes the context of one identity and one decoded
//! action, mutates the context and returns the replies to send. Actions that
//! are not valid for the current state are answered by re-sending the
//! current step's prompt and leave the context untouched. Finalization is
//! not run here; the transition only flags it for the engine.

use super::action::{Action, AddressInput};
use super::intent::{Intent, IntentResolver};
use super::pricing::Pricing;
use super::prompts;
use super::reply::Reply;
use crate::config::EngineConfig;
use crate::domain::catalog::{Item, ItemId, Vendor, VendorId};
use crate::domain::context::{ConversationContext, ConversationState};
use crate::domain::ports::CatalogStore;
use crate::domain::settlement::SettlementMethod;
use crate::error::Result;
use tracing::debug;

/// Replies produced by one action, plus whether checkout should run.
#[derive(Debug, Default, PartialEq)]
pub struct Transition {
    pub replies: Vec<Reply>,
    pub finalize: bool,
}

impl Transition {
    pub fn replies(replies: Vec<Reply>) -> Self {
        Self {
            replies,
            finalize: false,
        }
    }

    pub fn finalize() -> Self {
        Self {
            replies: vec![],
            finalize: true,
        }
    }
}

pub struct Dialogue<'a> {
    catalog: &'a dyn CatalogStore,
    pricing: &'a Pricing,
    resolver: &'a IntentResolver,
    config: &'a EngineConfig,
}

impl<'a> Dialogue<'a> {
    pub fn new(
        catalog: &'a dyn CatalogStore,
        pricing: &'a Pricing,
        resolver: &'a IntentResolver,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            catalog,
            pricing,
            resolver,
            config,
        }
    }

    /// Whether `action` may be applied in `state`.
    pub fn accepts(state: ConversationState, action: &Action) -> bool {
        use ConversationState as S;
        match action {
            Action::Start | Action::Cancel => true,
            Action::Rejected(_) => false,
            Action::ListZones(_) | Action::SelectZone(_) => state.is_idle() || state == S::PickZone,
            Action::ShowVendors => matches!(state, S::PickVendor | S::PickItem | S::CartReview),
            Action::SelectVendor(_) => state == S::PickVendor,
            Action::SelectItem { .. } => matches!(state, S::PickItem | S::CartReview),
            Action::SelectQuantity(_) => state == S::PickQuantity,
            Action::RequestMoreItems | Action::RequestCheckout => state == S::CartReview,
            Action::SubmitAddress(_) => state == S::NeedAddress,
            Action::SelectPayment(_) => state == S::PaymentMethod,
            Action::SubmitPaymentPhone(_) | Action::UseOwnPhone => state == S::PaymentPhone,
        }
    }

    /// Maps free text to an action for the current step.
    pub async fn interpret(&self, ctx: &ConversationContext, text: &str) -> Result<Action> {
        use ConversationState as S;

        let raw = text.trim();
        let intent = self.resolver.resolve(raw);

        // Addresses and phone numbers are free-form: keywords only count as
        // commands when they make up the whole message.
        let command = if matches!(ctx.state, S::NeedAddress | S::PaymentPhone) {
            self.resolver.resolve_command(raw)
        } else {
            Some(intent.clone())
        };
        match command {
            Some(Intent::Cancel) => return Ok(Action::Cancel),
            Some(Intent::Greeting) => return Ok(Action::Start),
            _ => {}
        }

        let action = match ctx.state {
            S::NeedAddress => Action::SubmitAddress(AddressInput::Text(raw.to_string())),
            S::PaymentPhone => match intent {
                Intent::Payment(_) => Action::Rejected("settlement method already chosen".into()),
                _ => Action::SubmitPaymentPhone(raw.to_string()),
            },
            S::PaymentMethod => match intent {
                Intent::Payment(method) => Action::SelectPayment(method),
                _ => Action::Rejected(format!("no settlement method in: {raw}")),
            },
            S::New | S::OrderCompleted | S::Cancelled | S::PickZone => match intent {
                Intent::SelectZone(zone) => Action::SelectZone(zone),
                _ => Action::Rejected(format!("no zone in: {raw}")),
            },
            S::PickVendor => {
                // A vendor name may itself contain "restaurant".
                let vendors = match &ctx.selected_zone {
                    Some(zone) => self.active_vendors(zone).await?,
                    None => vec![],
                };
                match (self.resolver.match_vendor(raw, &vendors), intent) {
                    (Some(vendor), _) => Action::SelectVendor(vendor.id),
                    (None, Intent::ShowVendors) => Action::ShowVendors,
                    (None, _) => Action::Rejected(format!("no vendor match for: {raw}")),
                }
            }
            S::PickItem | S::CartReview => {
                let review = ctx.state == S::CartReview;
                match intent {
                    Intent::Confirm if review => Action::RequestCheckout,
                    Intent::ShowVendors => Action::ShowVendors,
                    Intent::Order { query, .. } if query.is_empty() && review => {
                        Action::RequestMoreItems
                    }
                    Intent::Order { quantity, query } => self.item_action(ctx, &query, quantity).await?,
                    Intent::Other(text) => self.item_action(ctx, &text, None).await?,
                    _ => Action::Rejected(format!("no item in: {raw}")),
                }
            }
            S::PickQuantity => match intent {
                Intent::Order {
                    quantity: Some(n), ..
                } => Action::SelectQuantity(n),
                _ => Action::Rejected(format!("no quantity in: {raw}")),
            },
        };
        Ok(action)
    }

    async fn item_action(
        &self,
        ctx: &ConversationContext,
        query: &str,
        quantity: Option<u32>,
    ) -> Result<Action> {
        let Some(vendor_id) = ctx.selected_vendor_id else {
            return Ok(Action::Rejected("no vendor selected".into()));
        };
        let items = self.available_items(vendor_id).await?;
        Ok(match self.resolver.match_item(query, &items) {
            Some(item) => Action::SelectItem {
                item_id: item.id,
                quantity,
            },
            None => Action::Rejected(format!("no item match for: {query}")),
        })
    }

    pub async fn apply(
        &self,
        identity: &str,
        ctx: &mut ConversationContext,
        action: Action,
    ) -> Result<Transition> {
        if let Action::Rejected(reason) = &action {
            debug!(identity, state = %ctx.state, reason = %reason, "Unresolved input");
            return self.reprompt(ctx, prompts::state_hint(ctx.state)).await;
        }
        if !Self::accepts(ctx.state, &action) {
            debug!(identity, state = %ctx.state, action = action.name(), "Action not valid for state");
            return self.reprompt(ctx, prompts::INVALID_STEP).await;
        }

        match action {
            Action::Start => self.start(ctx).await,
            Action::ListZones(page) => Ok(Transition::replies(vec![prompts::zone_list(
                self.config,
                page,
            )])),
            Action::SelectZone(zone) => self.select_zone(ctx, &zone).await,
            Action::ShowVendors => self.show_vendors(ctx).await,
            Action::SelectVendor(vendor_id) => self.select_vendor(ctx, vendor_id).await,
            Action::SelectItem { item_id, quantity } => {
                self.select_item(ctx, item_id, quantity).await
            }
            Action::SelectQuantity(quantity) => self.select_quantity(ctx, quantity).await,
            Action::RequestMoreItems => {
                ctx.pending_item_id = None;
                ctx.state = ConversationState::PickItem;
                Ok(Transition::replies(self.prompt_for_state(ctx).await?))
            }
            Action::RequestCheckout => self.request_checkout(ctx).await,
            Action::SubmitAddress(input) => self.submit_address(ctx, input).await,
            Action::SelectPayment(method) => Ok(self.select_payment(ctx, method)),
            Action::SubmitPaymentPhone(raw) => self.submit_payment_phone(ctx, &raw).await,
            Action::UseOwnPhone => self.submit_payment_phone(ctx, identity).await,
            Action::Cancel => {
                ctx.reset();
                Ok(Transition::replies(vec![Reply::text(prompts::CANCELLED)]))
            }
            Action::Rejected(_) => self.reprompt(ctx, prompts::state_hint(ctx.state)).await,
        }
    }

    /// Prompt of the current step, without touching the context.
    pub async fn prompt_for_state(&self, ctx: &ConversationContext) -> Result<Vec<Reply>> {
        use ConversationState as S;

        let zones = || vec![prompts::zone_list(self.config, 0)];
        let replies = match ctx.state {
            S::New | S::OrderCompleted | S::Cancelled | S::PickZone => zones(),
            S::PickVendor => match &ctx.selected_zone {
                Some(zone) => {
                    let vendors = self.active_vendors(zone).await?;
                    if vendors.is_empty() {
                        zones()
                    } else {
                        vec![prompts::vendor_list(zone, &vendors, self.config)]
                    }
                }
                None => zones(),
            },
            S::PickItem => match ctx.selected_vendor_id {
                Some(vendor_id) => self.menu(vendor_id).await?,
                None => zones(),
            },
            S::PickQuantity => match (ctx.selected_vendor_id, ctx.pending_item_id) {
                (Some(vendor_id), Some(item_id)) => {
                    let items = self.available_items(vendor_id).await?;
                    match items.iter().find(|i| i.id == item_id) {
                        Some(item) => vec![prompts::quantity_buttons(&item.name, self.config)],
                        None => vec![prompts::menu_list(&items, self.config)],
                    }
                }
                (Some(vendor_id), None) => self.menu(vendor_id).await?,
                _ => zones(),
            },
            S::CartReview => prompts::cart_review(&ctx.cart, self.config),
            S::NeedAddress => vec![prompts::address_request()],
            S::PaymentMethod => vec![prompts::payment_options(ctx, self.config)],
            S::PaymentPhone => vec![prompts::payment_phone_request(
                ctx.settlement_method
                    .unwrap_or(SettlementMethod::OrangeMoney),
            )],
        };
        Ok(replies)
    }

    async fn reprompt(&self, ctx: &ConversationContext, notice: &str) -> Result<Transition> {
        let mut replies = vec![Reply::text(notice)];
        replies.extend(self.prompt_for_state(ctx).await?);
        Ok(Transition::replies(replies))
    }

    async fn start(&self, ctx: &mut ConversationContext) -> Result<Transition> {
        if !ctx.state.is_idle() {
            return self.reprompt(ctx, "Reprenons où vous en étiez 👇").await;
        }
        ctx.reset();
        ctx.state = ConversationState::PickZone;
        Ok(Transition::replies(vec![
            Reply::text(prompts::WELCOME),
            prompts::zone_list(self.config, 0),
        ]))
    }

    async fn select_zone(&self, ctx: &mut ConversationContext, zone: &str) -> Result<Transition> {
        let zone = self
            .config
            .zone(zone)
            .map(|z| z.name.clone())
            .unwrap_or_else(|| zone.trim().to_string());

        let vendors = self.active_vendors(&zone).await?;
        if vendors.is_empty() {
            ctx.state = ConversationState::PickZone;
            return Ok(Transition::replies(vec![
                Reply::text(format!(
                    "😕 Aucun restaurant à {zone} pour le moment. Choisissez une autre zone."
                )),
                prompts::zone_list(self.config, 0),
            ]));
        }

        ctx.selected_zone = Some(zone.clone());
        ctx.selected_vendor_id = None;
        ctx.pending_item_id = None;
        ctx.state = ConversationState::PickVendor;
        Ok(Transition::replies(vec![prompts::vendor_list(
            &zone,
            &vendors,
            self.config,
        )]))
    }

    async fn show_vendors(&self, ctx: &mut ConversationContext) -> Result<Transition> {
        let Some(zone) = ctx.selected_zone.clone() else {
            return self.reprompt(ctx, prompts::INVALID_STEP).await;
        };
        let vendors = self.active_vendors(&zone).await?;
        if vendors.is_empty() {
            return self
                .reprompt(ctx, &format!("😕 Aucun restaurant à {zone} pour le moment."))
                .await;
        }
        ctx.pending_item_id = None;
        ctx.state = ConversationState::PickVendor;
        Ok(Transition::replies(vec![prompts::vendor_list(
            &zone,
            &vendors,
            self.config,
        )]))
    }

    async fn select_vendor(
        &self,
        ctx: &mut ConversationContext,
        vendor_id: VendorId,
    ) -> Result<Transition> {
        // Only vendors listed for the selected zone; a stale id from another
        // zone would leave the zone out of sync with the cart.
        let vendors = match &ctx.selected_zone {
            Some(zone) => self.active_vendors(zone).await?,
            None => vec![],
        };
        let Some(vendor) = vendors.into_iter().find(|v| v.id == vendor_id) else {
            return self
                .reprompt(ctx, "❌ Restaurant introuvable ou fermé.")
                .await;
        };

        let items = self.available_items(vendor.id).await?;
        if items.is_empty() {
            return self
                .reprompt(
                    ctx,
                    &format!("😕 {} n'a pas encore de menu.", vendor.name),
                )
                .await;
        }

        let mut replies = vec![];
        if ctx.cart_vendor_id.is_some_and(|id| id != vendor.id) && !ctx.cart.is_empty() {
            ctx.cart.clear();
            ctx.cart_vendor_id = None;
            ctx.clear_checkout();
            replies.push(Reply::text(
                "🛒 Votre panier d'un autre restaurant a été vidé.",
            ));
        }

        ctx.selected_vendor_id = Some(vendor.id);
        ctx.pending_item_id = None;
        ctx.state = ConversationState::PickItem;
        replies.push(prompts::menu_list(&items, self.config));
        Ok(Transition::replies(replies))
    }

    async fn select_item(
        &self,
        ctx: &mut ConversationContext,
        item_id: ItemId,
        quantity: Option<u32>,
    ) -> Result<Transition> {
        let Some(vendor_id) = ctx.selected_vendor_id else {
            return self.reprompt(ctx, prompts::INVALID_STEP).await;
        };
        let items = self.available_items(vendor_id).await?;
        let Some(item) = items.iter().find(|i| i.id == item_id) else {
            return self.reprompt(ctx, "❌ Plat introuvable ou indisponible.").await;
        };

        match quantity {
            Some(quantity) => self.add_to_cart(ctx, item, quantity).await,
            None => {
                ctx.pending_item_id = Some(item.id);
                ctx.state = ConversationState::PickQuantity;
                Ok(Transition::replies(vec![prompts::quantity_buttons(
                    &item.name,
                    self.config,
                )]))
            }
        }
    }

    async fn select_quantity(
        &self,
        ctx: &mut ConversationContext,
        quantity: u32,
    ) -> Result<Transition> {
        let (Some(vendor_id), Some(item_id)) = (ctx.selected_vendor_id, ctx.pending_item_id) else {
            return self.reprompt(ctx, "Sélectionnez d'abord un plat.").await;
        };
        let items = self.available_items(vendor_id).await?;
        match items.iter().find(|i| i.id == item_id) {
            Some(item) => self.add_to_cart(ctx, item, quantity).await,
            None => {
                ctx.pending_item_id = None;
                ctx.state = ConversationState::PickItem;
                Ok(Transition::replies(vec![
                    Reply::text("❌ Ce plat n'est plus disponible."),
                    prompts::menu_list(&items, self.config),
                ]))
            }
        }
    }

    async fn add_to_cart(
        &self,
        ctx: &mut ConversationContext,
        item: &Item,
        quantity: u32,
    ) -> Result<Transition> {
        if quantity == 0 || quantity > self.config.max_quantity_per_add {
            return self
                .reprompt(
                    ctx,
                    &format!(
                        "Quantité invalide (entre 1 et {}).",
                        self.config.max_quantity_per_add
                    ),
                )
                .await;
        }
        if let Err(e) = ctx.cart.add_or_merge(item, quantity) {
            debug!(error = %e, item_id = item.id, "Cart rejected line");
            return self.reprompt(ctx, "Quantité invalide.").await;
        }

        ctx.cart_vendor_id = ctx.selected_vendor_id;
        ctx.pending_item_id = None;
        ctx.clear_checkout();
        ctx.state = ConversationState::CartReview;

        let mut replies = vec![Reply::text(format!(
            "✅ Ajouté !\n\n{}",
            prompts::cart_summary(&ctx.cart, self.config)
        ))];
        replies.extend(
            prompts::cart_review(&ctx.cart, self.config)
                .into_iter()
                .skip(1),
        );
        Ok(Transition::replies(replies))
    }

    async fn request_checkout(&self, ctx: &mut ConversationContext) -> Result<Transition> {
        if ctx.cart.is_empty() {
            ctx.state = ConversationState::PickItem;
            let mut replies = vec![Reply::text("🛒 Panier vide. Ajoutez un plat.")];
            replies.extend(self.prompt_for_state(ctx).await?);
            return Ok(Transition::replies(replies));
        }
        ctx.state = ConversationState::NeedAddress;
        Ok(Transition::replies(vec![prompts::address_request()]))
    }

    async fn submit_address(
        &self,
        ctx: &mut ConversationContext,
        input: AddressInput,
    ) -> Result<Transition> {
        let (address, destination) = match input {
            AddressInput::Text(text) => {
                let text = text.trim();
                if text.chars().count() < 3 {
                    return self
                        .reprompt(ctx, "❌ Adresse trop courte. Indiquez un quartier et un repère.")
                        .await;
                }
                let coordinates = self
                    .pricing
                    .resolve_coordinates(text, ctx.selected_zone.as_deref())
                    .await;
                (Some(text.to_string()), coordinates)
            }
            AddressInput::Location { coordinates, label } => {
                if !coordinates.is_valid() {
                    return self.reprompt(ctx, "❌ Position invalide.").await;
                }
                (label.filter(|l| !l.trim().is_empty()), coordinates)
            }
        };

        let vendor = match ctx.cart_vendor_id.or(ctx.selected_vendor_id) {
            Some(vendor_id) => self.catalog.vendor(vendor_id).await?,
            None => None,
        };
        let origin = match &vendor {
            Some(v) => self.pricing.vendor_origin(v.coordinates, &v.zone),
            None => self.config.zone_centroid(ctx.selected_zone.as_deref()),
        };
        let quote = self.pricing.quote(
            origin,
            destination,
            vendor.as_ref().and_then(|v| v.average_prep_minutes),
        );

        ctx.delivery_address = address;
        ctx.delivery_coordinates = Some(destination);
        ctx.distance_km = Some(quote.distance_km);
        ctx.delivery_fee = Some(quote.fee);
        ctx.estimated_minutes = Some(quote.estimated_minutes);
        ctx.state = ConversationState::PaymentMethod;
        Ok(Transition::replies(vec![prompts::payment_options(
            ctx,
            self.config,
        )]))
    }

    fn select_payment(&self, ctx: &mut ConversationContext, method: SettlementMethod) -> Transition {
        ctx.settlement_method = Some(method);
        ctx.settlement_phone = None;
        if method.requires_phone() {
            ctx.state = ConversationState::PaymentPhone;
            Transition::replies(vec![prompts::payment_phone_request(method)])
        } else {
            Transition::finalize()
        }
    }

    async fn submit_payment_phone(
        &self,
        ctx: &mut ConversationContext,
        raw: &str,
    ) -> Result<Transition> {
        match self.config.phone.normalize(raw) {
            Ok(phone) => {
                ctx.settlement_phone = Some(phone);
                Ok(Transition::finalize())
            }
            Err(e) => {
                debug!(error = %e, "Rejected settlement phone");
                self.reprompt(ctx, "❌ Numéro invalide. Exemple : 622 00 01 11")
                    .await
            }
        }
    }

    async fn menu(&self, vendor_id: VendorId) -> Result<Vec<Reply>> {
        let items = self.available_items(vendor_id).await?;
        if items.is_empty() {
            Ok(vec![Reply::text("😕 Ce restaurant n'a pas encore de menu.")])
        } else {
            Ok(vec![prompts::menu_list(&items, self.config)])
        }
    }

    /// Active vendors of a zone; re-read on every call.
    pub async fn active_vendors(&self, zone: &str) -> Result<Vec<Vendor>> {
        let mut vendors = self.catalog.vendors_in_zone(zone).await?;
        vendors.retain(|v| v.active);
        Ok(vendors)
    }

    /// Available items of a vendor; re-read on every call.
    pub async fn available_items(&self, vendor_id: VendorId) -> Result<Vec<Item>> {
        let mut items = self.catalog.items_for_vendor(vendor_id).await?;
        items.retain(|i| i.available && i.vendor_id == vendor_id);
        Ok(items)
    }
}
