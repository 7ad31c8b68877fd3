//! Infrastructure layer - External concerns
//! 
//! This layer contains:
//! - Config: Configuration loading
//! - Adapters: Platform integrations (Discord, console)
//! - Providers: Lifecycle wiring of the adapters into the application

pub mod adapters;
pub mod config;
pub mod providers;
