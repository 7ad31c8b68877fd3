//! Interaction dispatcher - Routes interactions through middleware to command handlers

use std::sync::Arc;

use super::middleware::{Context, Endpoint, Middleware, MiddlewareChain, MiddlewareError, Next};
use crate::application::errors::BotError;
use crate::application::services::CommandService;
use crate::domain::entities::Interaction;

pub const RATE_LIMITED_REPLY: &str = "Rate limited. Please try again later.";

const RESPONSE_KEY: &str = "response";

/// Runs interactions through the middleware chain and into the command service
pub struct InteractionDispatcher {
    commands: Arc<CommandService>,
    middleware: Vec<Arc<dyn Middleware>>,
    endpoint: Endpoint,
}

impl InteractionDispatcher {
    pub fn new(commands: Arc<CommandService>) -> Self {
        let service = Arc::clone(&commands);
        let endpoint: Endpoint = Arc::new(move |mut ctx: Context| {
            match service.handle(&ctx.interaction) {
                Ok(Some(reply)) => {
                    ctx.set(RESPONSE_KEY, reply);
                    Ok(ctx)
                }
                Ok(None) => Ok(ctx),
                Err(e) => Err(MiddlewareError::Failed(e.to_string())),
            }
        });

        Self {
            commands,
            middleware: Vec::new(),
            endpoint,
        }
    }

    /// Add middleware to the chain
    pub fn with_middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Append every middleware of a built chain
    pub fn with_chain(mut self, chain: MiddlewareChain) -> Self {
        self.middleware.extend(chain.build());
        self
    }

    pub fn commands(&self) -> &Arc<CommandService> {
        &self.commands
    }

    /// Produce the reply for an interaction, if any
    pub fn dispatch(&self, interaction: Interaction) -> Result<Option<String>, BotError> {
        // Only chat-input commands get a reply or count against limits.
        if !interaction.is_chat_input_command() {
            return Ok(None);
        }

        let ctx = Context::new(interaction);
        let next = Next::new(self.middleware.clone(), Arc::clone(&self.endpoint));

        match next.run(ctx) {
            Ok(ctx) => Ok(ctx.get(RESPONSE_KEY).cloned()),
            Err(MiddlewareError::Blocked(msg)) => Ok(Some(msg)),
            Err(MiddlewareError::RateLimited { .. }) => Ok(Some(RATE_LIMITED_REPLY.to_string())),
            Err(MiddlewareError::Failed(msg)) => Ok(Some(format!("Error: {}", msg))),
            Err(MiddlewareError::Internal(msg)) => Err(BotError::Internal(msg)),
        }
    }
}
