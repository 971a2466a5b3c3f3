//! Intent Resolver for free-text messages.
//!
//! Classification is keyword membership on normalized text and is kept
//! independent of dialogue state; `dialogue` decides what an intent means
//! for the current step. Item and vendor lookups are best-effort substring
//! and synonym matches that return `None` on ambiguity instead of guessing.

use crate::config::EngineConfig;
use crate::domain::catalog::{Item, Vendor};
use crate::domain::settlement::SettlementMethod;
use crate::domain::text::{contains_phrase, normalize};

const GREETINGS: &[&str] = &[
    "bonjour", "bonsoir", "salut", "hello", "hi", "coucou", "menu", "commencer", "start",
];
const CANCEL_WORDS: &[&str] = &["annuler", "annule", "annulez", "cancel", "stop", "abandonner"];
const CONFIRM_WORDS: &[&str] = &[
    "oui", "ok", "valider", "valide", "confirmer", "confirme", "checkout", "terminer", "c est bon",
];
const VENDOR_WORDS: &[&str] = &["restaurants", "restaurant", "restos", "resto", "vendeurs"];
const ADDRESS_WORDS: &[&str] = &[
    "adresse", "rue", "avenue", "quartier", "carrefour", "pres de", "a cote", "en face",
    "derriere", "immeuble", "maison", "livrer a", "livrez a",
];
const ORDER_WORDS: &[&str] = &[
    "je veux", "je voudrais", "commander", "commande", "ajouter", "ajoute", "prendre", "encore",
    "autre", "donne moi", "donnez moi",
];
const CASH_WORDS: &[&str] = &["cash", "especes", "espece", "liquide", "a la livraison"];
const ORANGE_WORDS: &[&str] = &["orange money", "orange", "om"];
const MTN_WORDS: &[&str] = &["mtn", "momo", "mtn money"];
const NUMBER_WORDS: &[(&str, u32)] = &[
    ("un", 1),
    ("une", 1),
    ("deux", 2),
    ("trois", 3),
    ("quatre", 4),
    ("cinq", 5),
    ("six", 6),
];
/// Words dropped from an order query before item matching.
const FILLER_WORDS: &[&str] = &["de", "du", "des", "le", "la", "les", "x", "fois", "plat", "plats"];

#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Greeting,
    Cancel,
    /// Canonical zone name from the configured zone table.
    SelectZone(String),
    ShowVendors,
    Order {
        quantity: Option<u32>,
        query: String,
    },
    Confirm,
    DeliveryAddress(String),
    Payment(SettlementMethod),
    Other(String),
}

pub struct IntentResolver {
    zones: Vec<(String, String)>,
    synonyms: Vec<(String, String)>,
}

impl IntentResolver {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            zones: config
                .zones
                .iter()
                .map(|z| (normalize(&z.name), z.name.clone()))
                .collect(),
            synonyms: config
                .synonyms
                .iter()
                .map(|(alias, target)| (normalize(alias), normalize(target)))
                .filter(|(alias, target)| !alias.is_empty() && !target.is_empty())
                .collect(),
        }
    }

    pub fn resolve(&self, text: &str) -> Intent {
        let raw = text.trim();
        let norm = normalize(raw);
        if norm.is_empty() {
            return Intent::Other(raw.to_string());
        }

        if has_any(&norm, CANCEL_WORDS) {
            return Intent::Cancel;
        }
        if norm
            .split(' ')
            .next()
            .is_some_and(|first| GREETINGS.contains(&first))
        {
            return Intent::Greeting;
        }
        if let Some(method) = payment_method(&norm) {
            return Intent::Payment(method);
        }
        if has_any(&norm, CONFIRM_WORDS) {
            return Intent::Confirm;
        }
        if has_any(&norm, VENDOR_WORDS) {
            return Intent::ShowVendors;
        }
        if has_any(&norm, ADDRESS_WORDS) {
            return Intent::DeliveryAddress(raw.to_string());
        }
        if let Some((quantity, rest)) = leading_quantity(&norm) {
            return Intent::Order {
                quantity: Some(quantity),
                query: strip_order_words(&rest),
            };
        }
        if has_any(&norm, ORDER_WORDS) {
            let query = strip_order_words(&norm);
            return match leading_quantity(&query) {
                Some((quantity, rest)) => Intent::Order {
                    quantity: Some(quantity),
                    query: strip_order_words(&rest),
                },
                None => Intent::Order {
                    quantity: None,
                    query,
                },
            };
        }
        if let Some(zone) = self.zone_in(&norm) {
            return Intent::SelectZone(zone);
        }
        Intent::Other(raw.to_string())
    }

    /// Like `resolve`, but only recognizes a cancel or a greeting when it is
    /// the whole message. Used where the customer types arbitrary text, such
    /// as an address that may mention a landmark like "Carrefour Stop".
    pub fn resolve_command(&self, text: &str) -> Option<Intent> {
        let norm = normalize(text);
        if CANCEL_WORDS.contains(&norm.as_str()) {
            Some(Intent::Cancel)
        } else if GREETINGS.contains(&norm.as_str()) {
            Some(Intent::Greeting)
        } else {
            None
        }
    }

    /// Canonical name of the single configured zone mentioned in `norm`.
    fn zone_in(&self, norm: &str) -> Option<String> {
        let mut found = self
            .zones
            .iter()
            .filter(|(key, _)| contains_phrase(norm, key))
            .map(|(_, name)| name.clone());
        let first = found.next()?;
        match found.next() {
            Some(_) => None,
            None => Some(first),
        }
    }

    /// Best-effort lookup of one item by name or synonym.
    pub fn match_item<'a>(&self, query: &str, items: &'a [Item]) -> Option<&'a Item> {
        let query = strip_order_words(&normalize(query));
        self.match_named(&query, items, |i| &i.name)
    }

    /// Best-effort lookup of one vendor by name.
    pub fn match_vendor<'a>(&self, query: &str, vendors: &'a [Vendor]) -> Option<&'a Vendor> {
        let query = normalize(query);
        self.match_named(&query, vendors, |v| &v.name)
    }

    fn match_named<'a, T>(
        &self,
        query: &str,
        candidates: &'a [T],
        name_of: impl Fn(&T) -> &str,
    ) -> Option<&'a T> {
        if query.is_empty() {
            return None;
        }
        let names: Vec<String> = candidates.iter().map(|c| normalize(name_of(c))).collect();

        // Full names quoted in the message win over partial matches.
        let strong: Vec<usize> = (0..candidates.len())
            .filter(|&i| contains_phrase(query, &names[i]))
            .collect();
        if !strong.is_empty() {
            return unique(&strong).map(|i| &candidates[i]);
        }

        let expansions: Vec<&str> = self
            .synonyms
            .iter()
            .filter(|(alias, _)| contains_phrase(query, alias))
            .map(|(_, target)| target.as_str())
            .collect();

        let weak: Vec<usize> = (0..candidates.len())
            .filter(|&i| {
                (query.chars().count() >= 3 && contains_phrase(&names[i], query))
                    || expansions.iter().any(|t| contains_phrase(&names[i], t))
            })
            .collect();
        unique(&weak).map(|i| &candidates[i])
    }
}

fn unique(indices: &[usize]) -> Option<usize> {
    match indices {
        [only] => Some(*only),
        _ => None,
    }
}

fn has_any(norm: &str, words: &[&str]) -> bool {
    words.iter().any(|w| contains_phrase(norm, w))
}

fn payment_method(norm: &str) -> Option<SettlementMethod> {
    if has_any(norm, ORANGE_WORDS) {
        Some(SettlementMethod::OrangeMoney)
    } else if has_any(norm, MTN_WORDS) {
        Some(SettlementMethod::MtnMobileMoney)
    } else if has_any(norm, CASH_WORDS) {
        Some(SettlementMethod::CashOnDelivery)
    } else {
        None
    }
}

/// Splits a leading quantity (`2 riz`, `deux riz`, `x2 riz`) from the rest.
fn leading_quantity(norm: &str) -> Option<(u32, String)> {
    let (first, rest) = match norm.split_once(' ') {
        Some((first, rest)) => (first, rest.to_string()),
        None => (norm, String::new()),
    };
    let first = first.strip_prefix('x').filter(|d| !d.is_empty()).unwrap_or(first);
    let quantity = first.parse::<u32>().ok().or_else(|| {
        NUMBER_WORDS
            .iter()
            .find(|(word, _)| *word == first)
            .map(|(_, n)| *n)
    })?;
    (quantity >= 1).then_some((quantity, rest))
}

fn strip_order_words(norm: &str) -> String {
    let mut text = format!(" {norm} ");
    for word in ORDER_WORDS {
        text = text.replace(&format!(" {word} "), " ");
    }
    text.split_whitespace()
        .filter(|w| !FILLER_WORDS.contains(w))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Money;
    use rust_decimal_macros::dec;

    fn resolver() -> IntentResolver {
        IntentResolver::new(&EngineConfig::default())
    }

    fn menu() -> Vec<Item> {
        [
            (1, "Riz sauce arachide"),
            (2, "Riz au gras"),
            (3, "Poisson braisé"),
            (4, "Coca-Cola 33cl"),
        ]
        .into_iter()
        .map(|(id, name)| Item {
            id,
            vendor_id: 1,
            name: name.to_string(),
            description: String::new(),
            price: Money::new(dec!(1000)),
            category: "Plat".to_string(),
            available: true,
        })
        .collect()
    }

    #[test]
    fn test_greetings_and_cancel() {
        let r = resolver();
        assert_eq!(r.resolve("Bonjour !"), Intent::Greeting);
        assert_eq!(r.resolve("MENU"), Intent::Greeting);
        assert_eq!(r.resolve("je veux annuler"), Intent::Cancel);
    }

    #[test]
    fn test_command_must_be_whole_message() {
        let r = resolver();
        assert_eq!(r.resolve_command(" Annuler "), Some(Intent::Cancel));
        assert_eq!(r.resolve_command("bonjour"), Some(Intent::Greeting));
        assert_eq!(r.resolve_command("Carrefour Stop, Kipé"), None);
        assert_eq!(r.resolve_command("Hello Pharmacie, Kaloum"), None);
    }

    #[test]
    fn test_zone_is_accent_insensitive() {
        let r = resolver();
        assert_eq!(r.resolve("kipe"), Intent::SelectZone("Kipé".to_string()));
        assert_eq!(
            r.resolve("Je suis à Kaloum"),
            Intent::SelectZone("Kaloum".to_string())
        );
    }

    #[test]
    fn test_payment_keywords() {
        let r = resolver();
        assert_eq!(
            r.resolve("Orange Money"),
            Intent::Payment(SettlementMethod::OrangeMoney)
        );
        assert_eq!(
            r.resolve("momo"),
            Intent::Payment(SettlementMethod::MtnMobileMoney)
        );
        assert_eq!(
            r.resolve("en espèces"),
            Intent::Payment(SettlementMethod::CashOnDelivery)
        );
    }

    #[test]
    fn test_order_with_quantity() {
        let r = resolver();
        assert_eq!(
            r.resolve("2 riz au gras"),
            Intent::Order {
                quantity: Some(2),
                query: "riz au gras".to_string()
            }
        );
        assert_eq!(
            r.resolve("je veux deux coca"),
            Intent::Order {
                quantity: Some(2),
                query: "coca".to_string()
            }
        );
        assert_eq!(
            r.resolve("3"),
            Intent::Order {
                quantity: Some(3),
                query: String::new()
            }
        );
    }

    #[test]
    fn test_address_and_other() {
        let r = resolver();
        assert!(matches!(
            r.resolve("Près de la mosquée, carrefour Kipé"),
            Intent::DeliveryAddress(_)
        ));
        assert_eq!(r.resolve("blabla"), Intent::Other("blabla".to_string()));
        assert_eq!(r.resolve("oui"), Intent::Confirm);
        assert_eq!(r.resolve("les restaurants"), Intent::ShowVendors);
    }

    #[test]
    fn test_item_matching() {
        let r = resolver();
        let items = menu();
        assert_eq!(r.match_item("riz au gras", &items).unwrap().id, 2);
        assert_eq!(r.match_item("un mafé", &items).unwrap().id, 1);
        assert_eq!(r.match_item("coca", &items).unwrap().id, 4);
        assert_eq!(r.match_item("poisson", &items).unwrap().id, 3);
    }

    #[test]
    fn test_ambiguous_item_is_no_match() {
        let r = resolver();
        let items = menu();
        assert!(r.match_item("riz", &items).is_none());
        assert!(r.match_item("pizza", &items).is_none());
        assert!(r.match_item("", &items).is_none());
    }
}
