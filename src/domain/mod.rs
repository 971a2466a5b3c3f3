//! Domain layer: value types, pure pricing rules and the ports the
//! application layer talks to.

pub mod cart;
pub mod catalog;
pub mod context;
pub mod geo;
pub mod money;
pub mod order;
pub mod ports;
pub mod settlement;
pub mod text;
