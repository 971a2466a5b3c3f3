use super::action::{Action, AddressInput};
use super::dialogue::Dialogue;
use super::event::{EventPayload, InboundEvent};
use super::finalize::{FinalizationError, Finalizer};
use super::intent::IntentResolver;
use super::pricing::Pricing;
use super::prompts;
use super::reply::Reply;
use super::router;
use crate::config::EngineConfig;
use crate::domain::context::{ConversationContext, ConversationSnapshot, ConversationState};
use crate::domain::geo::Coordinates;
use crate::domain::order::Order;
use crate::domain::ports::{
    CatalogStoreBox, ConversationStoreBox, CourierPoolBox, GeocoderBox, MessengerBox,
    OrderStoreBox, SettlementGatewayBox,
};
use crate::domain::settlement::SettlementMethod;
use crate::error::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Required collaborators of the engine.
pub struct Collaborators {
    pub catalog: CatalogStoreBox,
    pub orders: OrderStoreBox,
    pub conversations: ConversationStoreBox,
    pub messenger: MessengerBox,
    pub geocoder: GeocoderBox,
}

/// What a processed turn did.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub action: &'static str,
    pub state: ConversationState,
    /// Set when the turn created an order.
    pub order: Option<Order>,
}

enum TurnInput<'a> {
    Text(&'a str),
    Selection(&'a str),
    Location {
        coordinates: Coordinates,
        label: Option<&'a str>,
    },
}

/// The main entry point of the ordering conversation.
///
/// `ConversationEngine` owns the collaborators and runs each inbound event as
/// one turn: load the context, decode the event, apply it, finalize when the
/// dialogue asks for it, save the context and send the replies. Turns of the
/// same identity are serialized; turns of different identities run
/// independently.
pub struct ConversationEngine {
    config: Arc<EngineConfig>,
    catalog: CatalogStoreBox,
    orders: OrderStoreBox,
    conversations: ConversationStoreBox,
    messenger: MessengerBox,
    pricing: Pricing,
    resolver: IntentResolver,
    couriers: Option<CourierPoolBox>,
    gateways: HashMap<SettlementMethod, SettlementGatewayBox>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ConversationEngine {
    pub fn new(config: EngineConfig, collaborators: Collaborators) -> Self {
        let config = Arc::new(config);
        Self {
            resolver: IntentResolver::new(&config),
            pricing: Pricing::new(collaborators.geocoder, Arc::clone(&config)),
            config,
            catalog: collaborators.catalog,
            orders: collaborators.orders,
            conversations: collaborators.conversations,
            messenger: collaborators.messenger,
            couriers: None,
            gateways: HashMap::new(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_courier_pool(mut self, pool: CourierPoolBox) -> Self {
        self.couriers = Some(pool);
        self
    }

    pub fn with_settlement_gateway(
        mut self,
        method: SettlementMethod,
        gateway: SettlementGatewayBox,
    ) -> Self {
        self.gateways.insert(method, gateway);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn handle_event(&self, event: InboundEvent) -> Result<TurnOutcome> {
        let identity = event.identity.as_str();
        match &event.payload {
            EventPayload::Text(body) => self.handle_text(identity, body).await,
            EventPayload::ListSelection(id) => self.handle_list_selection(identity, id).await,
            EventPayload::ButtonSelection(id) => self.handle_button_selection(identity, id).await,
            EventPayload::Location { coordinates, label } => {
                self.handle_location(identity, *coordinates, label.as_deref())
                    .await
            }
        }
    }

    pub async fn handle_text(&self, identity: &str, body: &str) -> Result<TurnOutcome> {
        self.run_turn(identity, TurnInput::Text(body)).await
    }

    pub async fn handle_list_selection(&self, identity: &str, id: &str) -> Result<TurnOutcome> {
        self.run_turn(identity, TurnInput::Selection(id)).await
    }

    pub async fn handle_button_selection(&self, identity: &str, id: &str) -> Result<TurnOutcome> {
        self.run_turn(identity, TurnInput::Selection(id)).await
    }

    pub async fn handle_location(
        &self,
        identity: &str,
        coordinates: Coordinates,
        label: Option<&str>,
    ) -> Result<TurnOutcome> {
        self.run_turn(identity, TurnInput::Location { coordinates, label })
            .await
    }

    /// Current context of `identity`, as the next turn would load it.
    pub async fn context(&self, identity: &str) -> Result<ConversationContext> {
        self.load_context(identity).await
    }

    pub async fn orders(&self) -> Result<Vec<Order>> {
        self.orders.all_orders().await
    }

    /// Consumes the engine and returns every persisted order.
    pub async fn into_orders(self) -> Result<Vec<Order>> {
        self.orders.all_orders().await
    }

    async fn run_turn(&self, identity: &str, input: TurnInput<'_>) -> Result<TurnOutcome> {
        let lock = self.identity_lock(identity).await;
        let outcome = {
            let _guard = lock.lock().await;
            self.process_turn(identity, input).await
        };
        self.release_identity_lock(identity, lock).await;
        outcome
    }

    /// One load → mutate → save cycle; the caller holds the identity lock.
    async fn process_turn(&self, identity: &str, input: TurnInput<'_>) -> Result<TurnOutcome> {
        let mut ctx = match self.load_context(identity).await {
            Ok(ctx) => ctx,
            Err(e) => {
                error!(identity, error = %e, "Conversation context could not be loaded");
                self.send(identity, &[Reply::text(prompts::SERVICE_UNAVAILABLE)])
                    .await;
                return Err(e);
            }
        };
        let before = ctx.clone();

        let dialogue = Dialogue::new(
            self.catalog.as_ref(),
            &self.pricing,
            &self.resolver,
            &self.config,
        );

        let action = match input {
            TurnInput::Text(body) => dialogue.interpret(&ctx, body).await,
            TurnInput::Selection(id) => Ok(router::decode(id)),
            TurnInput::Location { coordinates, label } => {
                Ok(Action::SubmitAddress(AddressInput::Location {
                    coordinates,
                    label: label.map(str::to_string),
                }))
            }
        };
        let action_name = action.as_ref().map_or("rejected", Action::name);
        let transition = match action {
            Ok(action) => dialogue.apply(identity, &mut ctx, action).await,
            Err(e) => Err(e),
        };
        let transition = match transition {
            Ok(transition) => transition,
            Err(e) => {
                error!(identity, state = %before.state, error = %e, "Turn aborted");
                self.send(identity, &[Reply::text(prompts::SERVICE_UNAVAILABLE)])
                    .await;
                return Err(e);
            }
        };

        let mut replies = transition.replies;
        let mut order = None;
        if transition.finalize {
            let finalizer = Finalizer {
                catalog: self.catalog.as_ref(),
                orders: self.orders.as_ref(),
                messenger: self.messenger.as_ref(),
                pricing: &self.pricing,
                couriers: self.couriers.as_ref(),
                gateways: &self.gateways,
                config: &self.config,
            };
            match finalizer.finalize(identity, &mut ctx).await {
                Ok((created, confirmation)) => {
                    replies.extend(confirmation);
                    order = Some(created);
                }
                Err(e) => {
                    match &e {
                        FinalizationError::Persistence(_) => {
                            error!(identity, error = %e, "Order was not created")
                        }
                        FinalizationError::MissingInformation(_) => {
                            warn!(identity, error = %e, "Checkout preconditions not met")
                        }
                    }
                    ctx = before.clone();
                    replies.push(Reply::text(e.customer_message()));
                    match dialogue.prompt_for_state(&ctx).await {
                        Ok(prompt) => replies.extend(prompt),
                        Err(e) => warn!(identity, error = %e, "Step prompt unavailable"),
                    }
                }
            }
        }

        let saved = match ConversationSnapshot::capture(identity, &ctx) {
            Ok(snapshot) => self.conversations.save(snapshot).await,
            Err(e) => Err(e),
        };
        if let Err(e) = saved {
            error!(identity, error = %e, "Conversation context was not saved");
            // The order already exists; the customer still gets its confirmation.
            if order.is_none() {
                self.send(identity, &[Reply::text(prompts::SERVICE_UNAVAILABLE)])
                    .await;
                return Err(e);
            }
        }

        self.send(identity, &replies).await;
        info!(
            identity,
            action = action_name,
            from = %before.state,
            to = %ctx.state,
            "Turn processed"
        );
        Ok(TurnOutcome {
            action: action_name,
            state: ctx.state,
            order,
        })
    }

    async fn load_context(&self, identity: &str) -> Result<ConversationContext> {
        let Some(snapshot) = self.conversations.load(identity).await? else {
            return Ok(ConversationContext::new());
        };
        match snapshot.restore() {
            Ok(ctx) => Ok(ctx),
            Err(e) => {
                warn!(identity, error = %e, "Discarding unreadable conversation snapshot");
                Ok(ConversationContext::new())
            }
        }
    }

    async fn identity_lock(&self, identity: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(identity.to_string()).or_default())
    }

    /// Drops the map entry once no other turn of `identity` holds or waits
    /// on it. Clones are only taken under the map lock, so a count of one
    /// here means the map owns the last reference.
    async fn release_identity_lock(&self, identity: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        drop(lock);
        if locks
            .get(identity)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(identity);
        }
    }

    async fn send(&self, identity: &str, replies: &[Reply]) {
        for reply in replies {
            reply.send(self.messenger.as_ref(), identity).await;
        }
    }
}
