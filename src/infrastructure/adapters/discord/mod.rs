//! Discord adapter
//!
//! REST for outbound calls, the gateway websocket for inbound events.

pub mod client;
pub mod gateway;
pub mod model;
pub mod rest;

pub use client::{ClientEvent, DiscordClient};
pub use rest::DiscordRest;
