use std::sync::Arc;

use async_trait::async_trait;

use crate::application::errors::BotError;
use crate::application::events::{InteractionCreated, Listener};
use crate::application::messaging::InteractionDispatcher;

/// Answers chat-input commands
pub struct InteractionCreatedListener {
    dispatcher: Arc<InteractionDispatcher>,
}

impl InteractionCreatedListener {
    pub fn new(dispatcher: Arc<InteractionDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl Listener<InteractionCreated> for InteractionCreatedListener {
    async fn handle(&self, event: &InteractionCreated) -> Result<(), BotError> {
        let Some(reply) = self.dispatcher.dispatch(event.interaction.clone())? else {
            return Ok(());
        };

        tracing::info!(
            "Replying to /{} ({}): {}",
            event.interaction.command_name().unwrap_or_default(),
            event.interaction.id,
            reply.chars().take(100).collect::<String>()
        );
        event.client.reply(&event.interaction, &reply).await
    }
}
