mod common;

use common::{CUSTOMER, Harness, MIZO_PHONE, gnf, kipe};
use menuflow::application::prompts;
use menuflow::domain::context::{ConversationContext, ConversationSnapshot, ConversationState};
use menuflow::domain::geo::Coordinates;
use menuflow::domain::order::{OrderStatus, SettlementStatus};
use menuflow::domain::ports::{ConversationStore, OrderStore};
use menuflow::domain::settlement::SettlementMethod;
use menuflow::infrastructure::in_memory::{RecordingSettlementGateway, SentMessage};
use std::sync::Arc;

#[tokio::test]
async fn test_zone_lists_only_active_vendors() {
    let h = Harness::new();

    let outcome = h.select("zone:Kipé").await;

    assert_eq!(outcome.state, ConversationState::PickVendor);
    let sent = h.take_customer_messages().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].choice_ids(), vec!["vendor:1", "vendor:2"]);
    assert_eq!(h.ctx().await.selected_zone.as_deref(), Some("Kipé"));
}

#[tokio::test]
async fn test_zone_without_vendors_stays_on_zone_step() {
    let h = Harness::new();

    let outcome = h.select("zone:Matoto").await;

    assert_eq!(outcome.state, ConversationState::PickZone);
    let sent = h.take_customer_messages().await;
    assert!(sent[0].body().contains("Aucun restaurant à Matoto"));
    assert!(sent[1].choice_ids().contains(&"zone:Kaloum"));
    assert_eq!(h.ctx().await.selected_zone, None);
}

#[tokio::test]
async fn test_same_item_merges_into_one_line() {
    let h = Harness::new();
    h.select("zone:Kipé").await;
    h.select("vendor:1").await;

    h.select("item:1").await;
    h.press("qty:2").await;
    h.press("more:add").await;
    h.select("item:1").await;
    h.press("qty:1").await;

    let ctx = h.ctx().await;
    assert_eq!(ctx.cart.len(), 1);
    let line = &ctx.cart.lines()[0];
    assert_eq!(line.quantity, 3);
    assert_eq!(line.line_total(), gnf(45000));
}

#[tokio::test]
async fn test_cart_keeps_price_snapshot() {
    let h = Harness::new();
    h.select("zone:Kipé").await;
    h.select("vendor:1").await;
    h.select("item:1:1").await;

    h.catalog.set_item_price(1, gnf(20000)).await.unwrap();
    h.press("more:add").await;
    h.select("item:1:1").await;

    let ctx = h.ctx().await;
    assert_eq!(ctx.cart.lines()[0].unit_price, gnf(15000));
    assert_eq!(ctx.cart.subtotal(), gnf(30000));
}

#[tokio::test]
async fn test_cash_checkout_creates_order() {
    let h = Harness::new();
    h.reach_payment().await;

    let outcome = h.press("pay:cash").await;

    let order = outcome.order.expect("order created");
    assert_eq!(order.id, 1);
    assert_eq!(order.customer, CUSTOMER);
    assert_eq!(order.vendor_id, 1);
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.subtotal, gnf(27000));
    assert_eq!(order.delivery_fee, gnf(2000));
    assert_eq!(order.total_amount, gnf(29000));
    assert_eq!(order.vendor_commission, gnf(4050));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.settlement_status, SettlementStatus::Pending);
    assert_eq!(order.estimated_minutes, 25);

    assert_eq!(outcome.state, ConversationState::New);
    let ctx = h.ctx().await;
    assert!(ctx.cart.is_empty());
    assert_eq!(ctx.state, ConversationState::New);

    let customer = h.messenger.sent_to(CUSTOMER).await;
    let confirmation = customer.last().unwrap().body();
    assert!(confirmation.starts_with("🎉 Commande #1"));
    assert!(confirmation.contains("29 000 GNF"));
    assert!(confirmation.contains("Espèces"));

    let vendor = h.messenger.sent_to(MIZO_PHONE).await;
    assert_eq!(vendor.len(), 1);
    assert!(vendor[0].body().contains("NOUVELLE COMMANDE #1"));
    assert!(vendor[0].body().contains("2× Riz au gras"));

    let stats = h.orders.customer_stats(CUSTOMER).await.unwrap();
    assert_eq!(stats.order_count, 1);
    assert_eq!(stats.lifetime_spend, gnf(29000));
    let vendor_stats = h.orders.vendor_stats(1).await.unwrap();
    assert_eq!(vendor_stats.lifetime_revenue, gnf(27000));
}

#[tokio::test]
async fn test_invalid_action_does_not_mutate_context() {
    let h = Harness::new();
    h.fill_cart().await;
    let before = h.ctx().await;
    h.take_customer_messages().await;

    for (kind, id) in [
        ("button", "pay:cash"),
        ("list", "zone:Kaloum"),
        ("list", "vendor:4"),
        ("button", "qty:2"),
        ("button", "phone:self"),
        ("list", "vendor:abc"),
    ] {
        let outcome = match kind {
            "button" => h.press(id).await,
            _ => h.select(id).await,
        };
        assert_eq!(outcome.state, ConversationState::CartReview, "{id}");
        assert_eq!(h.ctx().await, before, "{id} changed the context");
    }

    let sent = h.take_customer_messages().await;
    assert_eq!(sent[0].body(), prompts::INVALID_STEP);
    assert!(sent[1].body().contains("Votre panier"));
    assert_eq!(sent[2].choice_ids(), vec!["more:add", "more:checkout", "cancel"]);
}

#[tokio::test]
async fn test_location_before_address_step_is_rejected() {
    let h = Harness::new();
    h.select("zone:Kipé").await;

    let outcome = h.share_location(kipe()).await;

    assert_eq!(outcome.state, ConversationState::PickVendor);
    assert_eq!(h.ctx().await.delivery_coordinates, None);
}

#[tokio::test]
async fn test_inactive_vendor_and_unavailable_item_reprompt() {
    let h = Harness::new();
    h.select("zone:Kipé").await;
    h.take_customer_messages().await;

    assert_eq!(h.select("vendor:3").await.state, ConversationState::PickVendor);
    let sent = h.take_customer_messages().await;
    assert_eq!(sent[0].body(), "❌ Restaurant introuvable ou fermé.");

    h.select("vendor:1").await;
    h.take_customer_messages().await;
    assert_eq!(h.select("item:3").await.state, ConversationState::PickItem);
    assert_eq!(h.select("item:10").await.state, ConversationState::PickItem);
    let sent = h.take_customer_messages().await;
    assert_eq!(sent[0].body(), "❌ Plat introuvable ou indisponible.");
    assert_eq!(sent[1].choice_ids(), vec!["item:1", "item:2"]);
    assert!(h.ctx().await.cart.is_empty());
}

#[tokio::test]
async fn test_quantity_guard() {
    let h = Harness::new();
    h.select("zone:Kipé").await;
    h.select("vendor:1").await;

    let outcome = h.select("item:1:51").await;

    assert_eq!(outcome.state, ConversationState::PickItem);
    assert!(h.ctx().await.cart.is_empty());
}

#[tokio::test]
async fn test_checkout_with_address_text_falls_back_to_zone_centroid() {
    let h = Harness::new();
    h.fill_cart().await;
    h.press("more:checkout").await;

    let outcome = h.text("Derrière la mosquée").await;

    assert_eq!(outcome.state, ConversationState::PaymentMethod);
    let ctx = h.ctx().await;
    assert_eq!(ctx.delivery_address.as_deref(), Some("Derrière la mosquée"));
    assert_eq!(ctx.delivery_coordinates, Some(kipe()));
    assert_eq!(ctx.distance_km, Some(0.0));
    assert_eq!(ctx.delivery_fee, Some(gnf(2000)));
    assert_eq!(ctx.estimated_minutes, Some(25));
}

#[tokio::test]
async fn test_bad_addresses_reprompt() {
    let h = Harness::new();
    h.fill_cart().await;
    h.press("more:checkout").await;
    h.take_customer_messages().await;

    assert_eq!(h.text("ab").await.state, ConversationState::NeedAddress);
    assert_eq!(
        h.share_location(Coordinates::new(95.0, 0.0)).await.state,
        ConversationState::NeedAddress
    );
    let sent = h.take_customer_messages().await;
    assert!(sent[0].body().starts_with("❌ Adresse trop courte"));
    assert_eq!(sent[2].body(), "❌ Position invalide.");
    assert!(!h.ctx().await.has_delivery_destination());
}

#[tokio::test]
async fn test_address_mentioning_cancel_word_is_kept() {
    let h = Harness::new();
    h.fill_cart().await;
    h.press("more:checkout").await;

    let outcome = h.text("Carrefour Stop, Kipé").await;

    assert_eq!(outcome.state, ConversationState::PaymentMethod);
    let ctx = h.ctx().await;
    assert_eq!(ctx.delivery_address.as_deref(), Some("Carrefour Stop, Kipé"));
    assert_eq!(ctx.cart.len(), 2);
}

#[tokio::test]
async fn test_bare_cancel_still_works_at_address_step() {
    let h = Harness::new();
    h.fill_cart().await;
    h.press("more:checkout").await;

    let outcome = h.text("annuler").await;

    assert_eq!(outcome.state, ConversationState::New);
    assert!(h.ctx().await.cart.is_empty());
}

#[tokio::test]
async fn test_vendor_from_other_zone_is_rejected() {
    let h = Harness::new();
    h.select("zone:Kipé").await;
    h.take_customer_messages().await;

    let outcome = h.select("vendor:4").await;

    assert_eq!(outcome.state, ConversationState::PickVendor);
    let ctx = h.ctx().await;
    assert_eq!(ctx.selected_vendor_id, None);
    assert_eq!(ctx.selected_zone.as_deref(), Some("Kipé"));
    let sent = h.take_customer_messages().await;
    assert_eq!(sent[0].body(), "❌ Restaurant introuvable ou fermé.");
    assert_eq!(sent[1].choice_ids(), vec!["vendor:1", "vendor:2"]);
}

#[tokio::test]
async fn test_persistence_failure_keeps_context_for_retry() {
    let h = Harness::new();
    h.reach_payment().await;
    let before = h.ctx().await;
    h.take_customer_messages().await;

    h.orders.set_fail_writes(true);
    let outcome = h.press("pay:cash").await;

    assert!(outcome.order.is_none());
    assert_eq!(outcome.state, ConversationState::PaymentMethod);
    assert_eq!(h.ctx().await, before);
    assert!(h.orders.all_orders().await.unwrap().is_empty());
    let sent = h.take_customer_messages().await;
    assert_eq!(sent[0].body(), prompts::ORDER_RETRY);
    assert_eq!(sent[1].choice_ids(), vec!["pay:cash", "pay:orange", "pay:mtn"]);
    assert!(h.messenger.sent_to(MIZO_PHONE).await.is_empty());

    h.orders.set_fail_writes(false);
    let retry = h.press("pay:cash").await;
    assert_eq!(retry.order.map(|o| o.id), Some(1));
}

#[tokio::test]
async fn test_missing_information_creates_no_order() {
    let h = Harness::new();
    let ctx = ConversationContext {
        state: ConversationState::PaymentMethod,
        ..Default::default()
    };
    h.conversations
        .save(ConversationSnapshot::capture(CUSTOMER, &ctx).unwrap())
        .await
        .unwrap();

    let outcome = h.press("pay:cash").await;

    assert!(outcome.order.is_none());
    assert!(h.orders.all_orders().await.unwrap().is_empty());
    assert_eq!(h.ctx().await, ctx);
    let sent = h.take_customer_messages().await;
    assert_eq!(
        sent[0].body(),
        "⚠️ Informations manquantes : panier, restaurant, adresse de livraison."
    );
}

#[tokio::test]
async fn test_vendor_notification_falls_back_once() {
    let h = Harness::new();
    h.reach_payment().await;
    h.messenger.fail_next_sends(MIZO_PHONE, 1).await;

    let outcome = h.press("pay:cash").await;

    assert!(outcome.order.is_some());
    let vendor = h.messenger.sent_to(MIZO_PHONE).await;
    assert_eq!(vendor.len(), 1);
    assert!(vendor[0].body().starts_with("Nouvelle commande #1"));
}

#[tokio::test]
async fn test_vendor_notification_failure_keeps_order() {
    let h = Harness::new();
    h.reach_payment().await;
    h.messenger.fail_next_sends(MIZO_PHONE, 2).await;

    let outcome = h.press("pay:cash").await;

    assert!(outcome.order.is_some());
    assert!(h.messenger.sent_to(MIZO_PHONE).await.is_empty());
    assert_eq!(h.ctx().await.state, ConversationState::New);
}

#[tokio::test]
async fn test_nearest_courier_is_assigned() {
    let h = Harness::new();
    h.reach_payment().await;

    let order = h.press("pay:cash").await.order.unwrap();

    let stored = h.orders.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.courier_id, Some(2));
    assert!(!h.couriers.courier(2).await.unwrap().available);
    assert!(h.couriers.courier(1).await.unwrap().available);
    let courier_messages = h.messenger.sent_to("224628000002").await;
    assert!(courier_messages[0].body().contains("Nouvelle course #1"));
}

#[tokio::test]
async fn test_orange_money_checkout_initiates_settlement() {
    let h = Harness::new();
    h.reach_payment().await;

    assert_eq!(h.press("pay:orange").await.state, ConversationState::PaymentPhone);
    let outcome = h.text("622 00 01 11").await;

    let order = outcome.order.expect("order created");
    assert_eq!(order.settlement_method, SettlementMethod::OrangeMoney);
    assert_eq!(order.settlement_phone.as_deref(), Some("224622000111"));
    assert_eq!(
        h.orange.calls().await,
        vec![("224622000111".to_string(), gnf(29000), 1)]
    );
    assert!(h.mtn.calls().await.is_empty());

    let stored = h.orders.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.settlement_status, SettlementStatus::Processing);
    assert_eq!(stored.settlement_reference.as_deref(), Some("OM-1"));
    let customer = h.messenger.sent_to(CUSTOMER).await;
    assert!(customer.last().unwrap().body().contains("réf. OM-1"));
}

#[tokio::test]
async fn test_declined_settlement_leaves_order_pending() {
    let h = Harness::build(
        common::test_config(),
        RecordingSettlementGateway::declining("OM"),
        RecordingSettlementGateway::accepting("MOMO"),
    );
    h.reach_payment().await;
    h.press("pay:orange").await;

    let order = h.text("+224 622 00 01 11").await.order.unwrap();

    assert_eq!(h.orange.calls().await.len(), 1);
    let stored = h.orders.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.settlement_status, SettlementStatus::Pending);
    assert_eq!(stored.settlement_reference, None);
}

#[tokio::test]
async fn test_own_number_pays_with_mtn() {
    let h = Harness::new();
    h.reach_payment().await;
    h.press("pay:mtn").await;

    let order = h.press("phone:self").await.order.unwrap();

    assert_eq!(order.settlement_phone.as_deref(), Some(CUSTOMER));
    assert_eq!(h.mtn.calls().await[0].0, CUSTOMER);
}

#[tokio::test]
async fn test_invalid_phone_reprompts() {
    let h = Harness::new();
    h.reach_payment().await;
    h.press("pay:orange").await;
    h.take_customer_messages().await;

    let outcome = h.text("12345").await;

    assert!(outcome.order.is_none());
    assert_eq!(outcome.state, ConversationState::PaymentPhone);
    let sent = h.take_customer_messages().await;
    assert!(sent[0].body().starts_with("❌ Numéro invalide"));
    assert_eq!(sent[1].choice_ids(), vec!["phone:self", "cancel"]);
}

#[tokio::test]
async fn test_cancel_resets_everything() {
    let h = Harness::new();
    h.fill_cart().await;
    h.take_customer_messages().await;

    let outcome = h.text("Annuler").await;

    assert_eq!(outcome.state, ConversationState::New);
    assert_eq!(h.ctx().await, ConversationContext::new());
    let sent = h.take_customer_messages().await;
    assert_eq!(sent[0].body(), prompts::CANCELLED);
}

#[tokio::test]
async fn test_switching_vendor_empties_cart() {
    let h = Harness::new();
    h.fill_cart().await;

    assert_eq!(h.text("autres restaurants").await.state, ConversationState::PickVendor);
    assert_eq!(h.select("vendor:2").await.state, ConversationState::PickItem);

    let ctx = h.ctx().await;
    assert!(ctx.cart.is_empty());
    assert_eq!(ctx.cart_vendor_id, None);
    assert_eq!(ctx.selected_vendor_id, Some(2));
}

#[tokio::test]
async fn test_greeting_mid_flow_reprompts_current_step() {
    let h = Harness::new();
    h.fill_cart().await;
    let before = h.ctx().await;
    h.take_customer_messages().await;

    let outcome = h.text("Salut").await;

    assert_eq!(outcome.state, ConversationState::CartReview);
    assert_eq!(h.ctx().await, before);
    let sent = h.take_customer_messages().await;
    assert_eq!(sent[0].body(), "Reprenons où vous en étiez 👇");
}

#[tokio::test]
async fn test_free_text_conversation() {
    let h = Harness::new();

    assert_eq!(h.text("Bonjour").await.state, ConversationState::PickZone);
    assert_eq!(h.text("kipe").await.state, ConversationState::PickVendor);
    assert_eq!(h.text("Chez Mizo").await.state, ConversationState::PickItem);
    assert_eq!(h.text("2 poulet yassa").await.state, ConversationState::CartReview);
    assert_eq!(h.text("je veux aussi du riz au gras").await.state, ConversationState::PickQuantity);
    assert_eq!(h.text("1").await.state, ConversationState::CartReview);
    assert_eq!(h.text("Valider").await.state, ConversationState::NeedAddress);
    assert_eq!(h.text("Marché de Kipé").await.state, ConversationState::PaymentMethod);

    let order = h.text("cash").await.order.expect("order created");
    assert_eq!(order.subtotal, gnf(36000));
    assert_eq!(order.total_amount, gnf(38000));

    // A vendor whose name contains "restaurant" is picked, not re-listed.
    assert_eq!(h.text("Bonjour").await.state, ConversationState::PickZone);
    assert_eq!(h.text("Kaloum").await.state, ConversationState::PickVendor);
    assert_eq!(h.text("Restaurant Barita").await.state, ConversationState::PickItem);
    assert_eq!(h.ctx().await.selected_vendor_id, Some(4));
    assert_eq!(h.text("restaurants").await.state, ConversationState::PickVendor);
}

#[tokio::test]
async fn test_unrecognized_text_gives_step_hint() {
    let h = Harness::new();
    h.select("zone:Kipé").await;
    h.take_customer_messages().await;

    let outcome = h.text("qwerty").await;

    assert_eq!(outcome.state, ConversationState::PickVendor);
    let sent = h.take_customer_messages().await;
    assert_eq!(sent[0].body(), prompts::state_hint(ConversationState::PickVendor));
    assert_eq!(sent[1].choice_ids(), vec!["vendor:1", "vendor:2"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_turns_of_one_identity_are_serialized() {
    let h = Arc::new(Harness::new());
    h.fill_cart().await;

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let h = Arc::clone(&h);
            tokio::spawn(async move {
                h.engine
                    .handle_list_selection(CUSTOMER, "item:2:1")
                    .await
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let ctx = h.ctx().await;
    let riz = ctx.cart.lines().iter().find(|l| l.item_id == 2).unwrap();
    assert_eq!(riz.quantity, 12);
}

#[tokio::test]
async fn test_identities_are_independent() {
    let h = Harness::new();
    h.fill_cart().await;

    h.engine
        .handle_list_selection("224620000002", "zone:Kaloum")
        .await
        .unwrap();

    assert_eq!(h.ctx().await.state, ConversationState::CartReview);
    let other = h.engine.context("224620000002").await.unwrap();
    assert_eq!(other.selected_zone.as_deref(), Some("Kaloum"));
    assert!(other.cart.is_empty());
    assert!(matches!(
        h.messenger.sent_to("224620000002").await.first(),
        Some(SentMessage::List { .. })
    ));
}
