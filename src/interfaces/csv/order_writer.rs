use crate::domain::order::Order;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

/// One exported order. `items` is `qty×item_id` pairs joined by `;`.
#[derive(Debug, Serialize)]
struct OrderRow {
    order: u64,
    customer: String,
    vendor: u32,
    items: String,
    subtotal: String,
    delivery_fee: String,
    total: String,
    commission: String,
    status: String,
    settlement: String,
    courier: Option<u32>,
}

impl From<&Order> for OrderRow {
    fn from(order: &Order) -> Self {
        Self {
            order: order.id,
            customer: order.customer.clone(),
            vendor: order.vendor_id,
            items: order
                .items
                .iter()
                .map(|l| format!("{}x{}", l.quantity, l.item_id))
                .collect::<Vec<_>>()
                .join(";"),
            subtotal: order.subtotal.to_string(),
            delivery_fee: order.delivery_fee.to_string(),
            total: order.total_amount.to_string(),
            commission: order.vendor_commission.to_string(),
            status: order.status.to_string(),
            settlement: order.settlement_status.to_string(),
            courier: order.courier_id,
        }
    }
}

/// Writes orders as CSV with a header row.
pub struct OrderWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OrderWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_orders(&mut self, orders: &[Order]) -> Result<()> {
        if orders.is_empty() {
            self.writer.write_record([
                "order",
                "customer",
                "vendor",
                "items",
                "subtotal",
                "delivery_fee",
                "total",
                "commission",
                "status",
                "settlement",
                "courier",
            ])?;
        }
        for order in orders {
            self.writer.serialize(OrderRow::from(order))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
