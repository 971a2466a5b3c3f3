//! Application layer: turns inbound events into dialogue transitions.
//!
//! `ConversationEngine` is the entry point. Structured selections are decoded
//! by the `router`, free text by the `intent` resolver; both produce an
//! `Action` that the `dialogue` state machine applies to the per-identity
//! context. Checkout is delegated to `finalize`.

pub mod action;
pub mod dialogue;
pub mod engine;
pub mod event;
pub mod finalize;
pub mod intent;
pub mod pricing;
pub mod prompts;
pub mod reply;
pub mod router;
