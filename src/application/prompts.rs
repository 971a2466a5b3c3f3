//! Customer-facing prompts for each dialogue step.

use super::reply::{MAX_LIST_ROWS, Reply, button, row};
use crate::config::EngineConfig;
use crate::domain::cart::Cart;
use crate::domain::catalog::{Item, Vendor};
use crate::domain::context::{ConversationContext, ConversationState};
use crate::domain::settlement::SettlementMethod;

/// Zone rows per page; the last slot is kept for the "more" row.
pub const ZONES_PER_PAGE: usize = MAX_LIST_ROWS - 1;

pub const WELCOME: &str =
    "Bienvenue 👋\nNous allons commander sans écrire. Suivez les étapes.";
pub const INVALID_STEP: &str = "⚠️ Cette action n'est pas disponible à cette étape.";
pub const SERVICE_UNAVAILABLE: &str =
    "😕 Service momentanément indisponible. Réessayez dans un instant.";
pub const ORDER_RETRY: &str =
    "😕 Votre commande n'a pas pu être enregistrée. Veuillez réessayer.";
pub const CANCELLED: &str = "❌ Commande annulée. Écrivez *bonjour* pour recommencer.";

pub fn state_hint(state: ConversationState) -> &'static str {
    match state {
        ConversationState::New
        | ConversationState::OrderCompleted
        | ConversationState::Cancelled
        | ConversationState::PickZone => "Choisissez votre *zone* dans la liste ci-dessous.",
        ConversationState::PickVendor => "Choisissez un *restaurant* dans la liste ci-dessous.",
        ConversationState::PickItem => "Choisissez un *plat* dans le menu ci-dessous.",
        ConversationState::PickQuantity => "Choisissez la *quantité* avec les boutons.",
        ConversationState::CartReview => "Ajoutez un plat ou validez votre panier.",
        ConversationState::NeedAddress => {
            "Envoyez votre *adresse* de livraison ou partagez votre position."
        }
        ConversationState::PaymentMethod => "Choisissez votre *mode de paiement*.",
        ConversationState::PaymentPhone => "Entrez le *numéro* à débiter.",
    }
}

pub fn zone_list(config: &EngineConfig, page: usize) -> Reply {
    let start = page.saturating_mul(ZONES_PER_PAGE).min(config.zones.len());
    let end = (start + ZONES_PER_PAGE).min(config.zones.len());

    let mut rows: Vec<_> = config.zones[start..end]
        .iter()
        .map(|z| row(format!("zone:{}", z.name), z.name.clone(), "Conakry"))
        .collect();
    if end < config.zones.len() {
        rows.push(row(format!("zones:{}", page + 1), "➡️ Autres zones", ""));
    } else if page > 0 {
        rows.push(row("zones:0", "⬅️ Retour", ""));
    }

    Reply::list(
        "📍 Choisissez votre zone",
        "Sélectionnez votre quartier à Conakry :",
        "Choisir",
        rows,
    )
}

pub fn vendor_list(zone: &str, vendors: &[Vendor], config: &EngineConfig) -> Reply {
    let rows = vendors
        .iter()
        .map(|v| {
            let prep = v.average_prep_minutes.unwrap_or(config.default_prep_minutes);
            row(
                format!("vendor:{}", v.id),
                v.name.clone(),
                format!("{} • ⏱ {prep}min", v.rating_label()),
            )
        })
        .collect();
    Reply::list(
        &format!("🍽️ Restaurants à {zone}"),
        "Sélectionnez un restaurant :",
        "Voir",
        rows,
    )
}

pub fn menu_list(items: &[Item], config: &EngineConfig) -> Reply {
    let rows = items
        .iter()
        .map(|i| {
            let price = i.price.format(&config.currency);
            let description = if i.description.is_empty() {
                price
            } else {
                format!("{price} • {}", i.description)
            };
            row(format!("item:{}", i.id), i.name.clone(), description)
        })
        .collect();
    Reply::list("📋 Menu", "Choisissez un plat :", "Sélectionner", rows)
}

pub fn quantity_buttons(item_name: &str, config: &EngineConfig) -> Reply {
    let buttons = config
        .quantity_buttons
        .iter()
        .map(|q| button(format!("qty:{q}"), q.to_string()))
        .collect();
    Reply::buttons(&format!("Combien de « {item_name} » ?"), buttons)
}

pub fn cart_summary(cart: &Cart, config: &EngineConfig) -> String {
    let (lines, subtotal) = cart.totals(&config.currency);
    format!(
        "{}\n\nTotal: {}",
        lines.join("\n"),
        subtotal.format(&config.currency)
    )
}

pub fn cart_review(cart: &Cart, config: &EngineConfig) -> Vec<Reply> {
    vec![
        Reply::text(format!("🛒 Votre panier\n\n{}", cart_summary(cart, config))),
        Reply::buttons(
            "Souhaitez-vous ajouter un autre plat, ou passer à la confirmation ?",
            vec![
                button("more:add", "Ajouter"),
                button("more:checkout", "Valider"),
                button("cancel", "Annuler"),
            ],
        ),
    ]
}

pub fn address_request() -> Reply {
    Reply::text(
        "📍 Envoyez votre adresse de livraison (quartier, repère) ou partagez votre position.",
    )
}

pub fn payment_options(ctx: &ConversationContext, config: &EngineConfig) -> Reply {
    let currency = config.currency.as_str();
    let subtotal = ctx.cart.subtotal();
    let fee = ctx.delivery_fee.unwrap_or_default();
    let mut body = format!(
        "{}\n\nLivraison: {}",
        cart_summary(&ctx.cart, config),
        fee.format(currency)
    );
    if let Some(km) = ctx.distance_km {
        body.push_str(&format!(" ({km:.1} km)"));
    }
    body.push_str(&format!(
        "\n*À payer: {}*",
        (subtotal + fee).format(currency)
    ));
    if let Some(minutes) = ctx.estimated_minutes {
        body.push_str(&format!("\n⏱ Livraison estimée: ~{minutes} min"));
    }
    body.push_str("\n\nComment souhaitez-vous payer ?");

    let buttons = SettlementMethod::ALL
        .iter()
        .map(|m| button(format!("pay:{}", m.code()), m.label()))
        .collect();
    Reply::buttons(&body, buttons)
}

pub fn payment_phone_request(method: SettlementMethod) -> Reply {
    Reply::buttons(
        &format!(
            "📱 Entrez le numéro {} à débiter, ou utilisez ce numéro WhatsApp.",
            method.label()
        ),
        vec![button("phone:self", "Utiliser ce numéro"), button("cancel", "Annuler")],
    )
}
