//! hermes-bot - a small Discord bot built around a service container and an event bus

pub mod application;
pub mod bootstrap;
pub mod domain;
pub mod infrastructure;
