//! Service providers wiring platform adapters into the application

pub mod console;
pub mod discord;

pub use console::ConsoleProvider;
pub use discord::DiscordProvider;
