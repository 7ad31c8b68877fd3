//! Application layer - Use cases and business logic
//! 
//! This layer contains:
//! - Kernel: Provider lifecycle, service container, event bus
//! - Events and listeners: What happens when the bot starts or is invoked
//! - Services: Command registry and handlers
//! - Messaging: Interaction middleware, dispatching, parsing
//! - Errors: Domain-specific errors

pub mod container;
pub mod errors;
pub mod events;
pub mod kernel;
pub mod listeners;
pub mod messaging;
pub mod services;
