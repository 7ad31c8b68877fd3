//! Application assembly
//!
//! Builds the command service and dispatcher, subscribes the listeners and
//! picks the platform provider from the configuration.

use std::sync::Arc;

use crate::application::kernel::Application;
use crate::application::listeners;
use crate::application::messaging::{
    InteractionDispatcher, LoggingMiddleware, MiddlewareChain, RateLimitMiddleware,
};
use crate::application::services::CommandService;
use crate::infrastructure::config::Config;
use crate::infrastructure::providers::{ConsoleProvider, DiscordProvider};

/// Which chat platform drives the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Discord,
    Console,
}

impl Platform {
    /// Discord when a token is configured, the console otherwise
    pub fn detect(config: &Config) -> Self {
        if config.token().is_some() {
            Platform::Discord
        } else {
            Platform::Console
        }
    }
}

/// Dispatcher with the configured middleware in front of the command service
pub fn build_dispatcher(config: &Config, commands: Arc<CommandService>) -> InteractionDispatcher {
    let mut chain = MiddlewareChain::new().add(LoggingMiddleware);
    let limits = &config.security.rate_limit;
    if limits.enabled {
        chain = chain.add(RateLimitMiddleware::new(limits.max_requests, limits.window_seconds));
    }
    InteractionDispatcher::new(commands).with_chain(chain)
}

/// Services and listeners, with no platform provider yet
pub fn application(config: Config) -> Application {
    let commands = Arc::new(CommandService::with_defaults());
    let dispatcher = Arc::new(build_dispatcher(&config, Arc::clone(&commands)));

    let app = Application::new(config);
    app.container().instance(commands);
    app.container().instance(Arc::clone(&dispatcher));
    listeners::register(&app.emitter(), dispatcher);
    app
}

/// Build the full application for a platform
pub fn build(config: Config, platform: Platform) -> Application {
    tracing::info!("Using {:?} platform", platform);
    let app = application(config);
    match platform {
        Platform::Discord => app.with_provider(DiscordProvider::new()),
        Platform::Console => app.with_provider(ConsoleProvider::new()),
    }
}
