use super::catalog::{Item, ItemId};
use super::money::Money;
use crate::error::{OrderFlowError, Result};
use serde::{Deserialize, Serialize};

/// One item/quantity entry of an open cart.
///
/// `unit_price` is captured when the line is created so later catalog price
/// changes never alter an open cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub item_id: ItemId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl CartLine {
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

/// Ordered cart lines, at most one per item id.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Adds `quantity` of `item`, merging into an existing line for the same
    /// item id. A new line snapshots the item's current price.
    pub fn add_or_merge(&mut self, item: &Item, quantity: u32) -> Result<&CartLine> {
        if quantity == 0 {
            return Err(OrderFlowError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let index = match self.lines.iter().position(|l| l.item_id == item.id) {
            Some(index) => {
                let line = &mut self.lines[index];
                line.quantity = line.quantity.checked_add(quantity).ok_or_else(|| {
                    OrderFlowError::ValidationError("Quantity overflow".to_string())
                })?;
                index
            }
            None => {
                self.lines.push(CartLine {
                    item_id: item.id,
                    name: item.name.clone(),
                    unit_price: item.price,
                    quantity,
                });
                self.lines.len() - 1
            }
        };

        Ok(&self.lines[index])
    }

    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Display lines in insertion order plus the subtotal.
    pub fn totals(&self, currency: &str) -> (Vec<String>, Money) {
        let lines = self
            .lines
            .iter()
            .map(|l| {
                format!(
                    "• {}× {} — {}",
                    l.quantity,
                    l.name,
                    l.line_total().format(currency)
                )
            })
            .collect();
        (lines, self.subtotal())
    }
}
