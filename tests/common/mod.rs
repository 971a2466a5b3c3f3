#![allow(dead_code)]

use menuflow::application::engine::{Collaborators, ConversationEngine, TurnOutcome};
use menuflow::config::EngineConfig;
use menuflow::domain::catalog::{Courier, Item, Vendor};
use menuflow::domain::context::{ConversationContext, ConversationState};
use menuflow::domain::geo::Coordinates;
use menuflow::domain::money::Money;
use menuflow::domain::settlement::SettlementMethod;
use menuflow::infrastructure::in_memory::{
    InMemoryCatalog, InMemoryConversationStore, InMemoryCourierPool, InMemoryOrderStore,
    RecordingMessenger, RecordingSettlementGateway, SentMessage, TableGeocoder,
};
use rust_decimal::Decimal;

pub const CUSTOMER: &str = "224620000001";
pub const MIZO_PHONE: &str = "224622000111";

pub fn kipe() -> Coordinates {
    Coordinates::new(9.5980, -13.6530)
}

pub fn kaloum() -> Coordinates {
    Coordinates::new(9.5092, -13.7122)
}

pub fn gnf(amount: i64) -> Money {
    Money::new(Decimal::from(amount))
}

fn vendor(id: u32, name: &str, zone: &str, active: bool) -> Vendor {
    Vendor {
        id,
        name: name.to_string(),
        phone: String::new(),
        zone: zone.to_string(),
        address: None,
        coordinates: None,
        active,
        average_prep_minutes: None,
        rating: 0.0,
    }
}

fn item(id: u32, vendor_id: u32, name: &str, price: i64, available: bool) -> Item {
    Item {
        id,
        vendor_id,
        name: name.to_string(),
        description: String::new(),
        price: gnf(price),
        category: "Plat".to_string(),
        available,
    }
}

/// Two active vendors and one inactive vendor in Kipé, one vendor in Kaloum.
pub fn test_catalog() -> InMemoryCatalog {
    let mizo = Vendor {
        phone: MIZO_PHONE.to_string(),
        coordinates: Some(kipe()),
        average_prep_minutes: Some(25),
        rating: 4.6,
        ..vendor(1, "Chez Mizo", "Kipé", true)
    };
    InMemoryCatalog::with_records(
        vec![
            mizo,
            vendor(2, "Grill de Kipé", "Kipé", true),
            vendor(3, "Maquis Fermé", "Kipé", false),
            vendor(4, "Restaurant Barita", "Kaloum", true),
        ],
        vec![
            item(1, 1, "Poulet Yassa", 15000, true),
            item(2, 1, "Riz au gras", 6000, true),
            item(3, 1, "Jus de bissap", 3000, false),
            item(10, 2, "Brochettes", 8000, true),
            item(20, 3, "Soupe", 5000, true),
            item(30, 4, "Atiéké poisson", 20000, true),
        ],
    )
}

/// Default configuration with a flat 2 000 GNF delivery fee.
pub fn test_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.delivery.base_fee = gnf(2000);
    config.delivery.steps.clear();
    config
}

pub fn courier(id: u32, name: &str, coordinates: Coordinates) -> Courier {
    Courier {
        id,
        name: name.to_string(),
        phone: format!("22462800000{id}"),
        coordinates,
        available: true,
    }
}

/// Engine wired to in-memory adapters, with handles kept for assertions.
pub struct Harness {
    pub engine: ConversationEngine,
    pub catalog: InMemoryCatalog,
    pub orders: InMemoryOrderStore,
    pub conversations: InMemoryConversationStore,
    pub messenger: RecordingMessenger,
    pub couriers: InMemoryCourierPool,
    pub orange: RecordingSettlementGateway,
    pub mtn: RecordingSettlementGateway,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(
            test_config(),
            RecordingSettlementGateway::accepting("OM"),
            RecordingSettlementGateway::accepting("MOMO"),
        )
    }

    pub fn build(
        config: EngineConfig,
        orange: RecordingSettlementGateway,
        mtn: RecordingSettlementGateway,
    ) -> Self {
        let catalog = test_catalog();
        let orders = InMemoryOrderStore::new();
        let conversations = InMemoryConversationStore::new();
        let messenger = RecordingMessenger::new();
        let couriers = InMemoryCourierPool::new(vec![
            courier(1, "Fatoumata", kaloum()),
            courier(2, "Mamadou", Coordinates::new(9.6010, -13.6500)),
        ]);

        let engine = ConversationEngine::new(
            config,
            Collaborators {
                catalog: Box::new(catalog.clone()),
                orders: Box::new(orders.clone()),
                conversations: Box::new(conversations.clone()),
                messenger: Box::new(messenger.clone()),
                geocoder: Box::new(TableGeocoder::new()),
            },
        )
        .with_courier_pool(Box::new(couriers.clone()))
        .with_settlement_gateway(SettlementMethod::OrangeMoney, Box::new(orange.clone()))
        .with_settlement_gateway(SettlementMethod::MtnMobileMoney, Box::new(mtn.clone()));

        Self {
            engine,
            catalog,
            orders,
            conversations,
            messenger,
            couriers,
            orange,
            mtn,
        }
    }

    pub async fn text(&self, body: &str) -> TurnOutcome {
        self.engine.handle_text(CUSTOMER, body).await.unwrap()
    }

    pub async fn select(&self, id: &str) -> TurnOutcome {
        self.engine.handle_list_selection(CUSTOMER, id).await.unwrap()
    }

    pub async fn press(&self, id: &str) -> TurnOutcome {
        self.engine.handle_button_selection(CUSTOMER, id).await.unwrap()
    }

    pub async fn share_location(&self, coordinates: Coordinates) -> TurnOutcome {
        self.engine
            .handle_location(CUSTOMER, coordinates, Some("Maison"))
            .await
            .unwrap()
    }

    pub async fn ctx(&self) -> ConversationContext {
        self.engine.context(CUSTOMER).await.unwrap()
    }

    /// Messages sent to the customer since the last call.
    pub async fn take_customer_messages(&self) -> Vec<SentMessage> {
        let sent = self.messenger.sent_to(CUSTOMER).await;
        self.messenger.clear().await;
        sent
    }

    /// Drives the customer to the cart review with 1× Poulet Yassa and
    /// 2× Riz au gras (subtotal 27 000).
    pub async fn fill_cart(&self) {
        assert_eq!(self.select("zone:Kipé").await.state, ConversationState::PickVendor);
        assert_eq!(self.select("vendor:1").await.state, ConversationState::PickItem);
        assert_eq!(self.select("item:1").await.state, ConversationState::PickQuantity);
        assert_eq!(self.press("qty:1").await.state, ConversationState::CartReview);
        assert_eq!(self.press("more:add").await.state, ConversationState::PickItem);
        assert_eq!(self.select("item:2:2").await.state, ConversationState::CartReview);
    }

    /// Drives the customer to the payment choice, delivering next to the
    /// vendor so the fee is the base fee.
    pub async fn reach_payment(&self) {
        self.fill_cart().await;
        assert_eq!(self.press("more:checkout").await.state, ConversationState::NeedAddress);
        assert_eq!(
            self.share_location(kipe()).await.state,
            ConversationState::PaymentMethod
        );
    }
}
