//! Selection Router: decodes list/button reply ids into actions.
//!
//! Ids are `kind[:value[:quantity]]`:
//!
//! | id                       | action                         |
//! |--------------------------|--------------------------------|
//! | `zones:<page>`           | `ListZones`                    |
//! | `zone:<name>`            | `SelectZone`                   |
//! | `vendor:<id>`            | `SelectVendor`                 |
//! | `item:<id>[:<qty>]`      | `SelectItem`                   |
//! | `qty:<n>`                | `SelectQuantity`               |
//! | `more:add`               | `RequestMoreItems`             |
//! | `more:checkout`          | `RequestCheckout`              |
//! | `pay:<cash|orange|mtn>`  | `SelectPayment`                |
//! | `phone:self`             | `UseOwnPhone`                  |
//! | `cancel`                 | `Cancel`                       |

use super::action::Action;
use crate::domain::settlement::SettlementMethod;

pub fn decode(id: &str) -> Action {
    let id = id.trim();
    let mut parts = id.splitn(3, ':');
    let kind = parts.next().unwrap_or_default();
    let value = parts.next();
    let extra = parts.next();

    match (kind, value, extra) {
        ("zone", Some(zone), None) if !zone.trim().is_empty() => {
            Action::SelectZone(zone.trim().to_string())
        }
        ("zones", Some(raw), None) => match raw.parse() {
            Ok(page) => Action::ListZones(page),
            Err(_) => reject(id, "zone page is not numeric"),
        },
        ("vendor", Some(raw), None) => match raw.parse() {
            Ok(vendor_id) => Action::SelectVendor(vendor_id),
            Err(_) => reject(id, "vendor id is not numeric"),
        },
        ("item", Some(raw), qty) => {
            let Ok(item_id) = raw.parse() else {
                return reject(id, "item id is not numeric");
            };
            match qty.map(parse_quantity) {
                None => Action::SelectItem {
                    item_id,
                    quantity: None,
                },
                Some(Some(n)) => Action::SelectItem {
                    item_id,
                    quantity: Some(n),
                },
                Some(None) => reject(id, "quantity is not a positive integer"),
            }
        }
        ("qty", Some(raw), None) => match parse_quantity(raw) {
            Some(n) => Action::SelectQuantity(n),
            None => reject(id, "quantity is not a positive integer"),
        },
        ("more", Some("add"), None) => Action::RequestMoreItems,
        ("more", Some("checkout"), None) => Action::RequestCheckout,
        ("pay", Some(code), None) => match code.parse::<SettlementMethod>() {
            Ok(method) => Action::SelectPayment(method),
            Err(_) => reject(id, "unknown settlement method"),
        },
        ("phone", Some("self"), None) => Action::UseOwnPhone,
        ("cancel", None, None) => Action::Cancel,
        _ => reject(id, "unknown selection"),
    }
}

fn parse_quantity(raw: &str) -> Option<u32> {
    raw.parse::<u32>().ok().filter(|n| *n >= 1)
}

fn reject(id: &str, reason: &str) -> Action {
    Action::Rejected(format!("{reason}: {id}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_kinds() {
        assert_eq!(decode("zone:Kipé"), Action::SelectZone("Kipé".to_string()));
        assert_eq!(decode("zones:1"), Action::ListZones(1));
        assert_eq!(decode("vendor:12"), Action::SelectVendor(12));
        assert_eq!(
            decode("item:4"),
            Action::SelectItem {
                item_id: 4,
                quantity: None
            }
        );
        assert_eq!(
            decode("item:4:2"),
            Action::SelectItem {
                item_id: 4,
                quantity: Some(2)
            }
        );
        assert_eq!(decode("qty:3"), Action::SelectQuantity(3));
        assert_eq!(decode("more:add"), Action::RequestMoreItems);
        assert_eq!(decode("more:checkout"), Action::RequestCheckout);
        assert_eq!(
            decode("pay:orange"),
            Action::SelectPayment(SettlementMethod::OrangeMoney)
        );
        assert_eq!(decode("phone:self"), Action::UseOwnPhone);
        assert_eq!(decode("cancel"), Action::Cancel);
    }

    #[test]
    fn test_decode_rejections() {
        for id in [
            "vendor:abc",
            "item:x",
            "item:4:0",
            "item:4:two",
            "qty:0",
            "qty:-1",
            "pay:bitcoin",
            "zone:",
            "more:maybe",
            "rest:1",
            "",
        ] {
            assert!(
                matches!(decode(id), Action::Rejected(_)),
                "{id} should be rejected"
            );
        }
    }
}
