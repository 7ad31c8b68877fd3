//! Event listeners and their registration on the emitter

pub mod bot_started_listener;
pub mod interaction_created_listener;

pub use bot_started_listener::BotStartedListener;
pub use interaction_created_listener::InteractionCreatedListener;

use std::sync::Arc;

use crate::application::events::{BotStarted, Emitter, InteractionCreated};
use crate::application::messaging::InteractionDispatcher;

/// Subscribe the bot's listeners
pub fn register(emitter: &Emitter, dispatcher: Arc<InteractionDispatcher>) {
    emitter.on::<BotStarted, _>(BotStartedListener::new(Arc::clone(dispatcher.commands())));
    emitter.on::<InteractionCreated, _>(InteractionCreatedListener::new(dispatcher));
}
