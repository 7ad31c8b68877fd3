//! Application services - Business logic orchestration

pub mod command_service;

pub use command_service::{reverse, CommandService, PONG_REPLY, UNKNOWN_COMMAND_REPLY};
