use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::application::errors::BotError;
use crate::application::events::{BotStarted, Listener};
use crate::application::services::CommandService;
use crate::domain::entities::RegisteredCommand;
use crate::domain::traits::Bot;

/// Logs readiness, then fetches guilds and refreshes slash commands concurrently
pub struct BotStartedListener {
    commands: Arc<CommandService>,
}

impl BotStartedListener {
    pub fn new(commands: Arc<CommandService>) -> Self {
        Self { commands }
    }

    async fn refresh_slash_commands(&self, client: &dyn Bot) -> Result<Vec<RegisteredCommand>, BotError> {
        let definitions = self.commands.definitions();
        tracing::info!("Refreshing slash commands with {} commands", definitions.len());
        client.set_commands(&definitions).await
    }
}

/// `2024-01-02T03:04:05.678Z`
fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[async_trait]
impl Listener<BotStarted> for BotStartedListener {
    async fn handle(&self, event: &BotStarted) -> Result<(), BotError> {
        let info = event.client.bot_info();
        tracing::info!("Logged in as {}!", info.tag());
        tracing::info!(
            "Last uptime date was {}",
            info.ready_at.map(iso_timestamp).unwrap_or_else(|| "unknown".to_string())
        );

        let client = event.client.as_ref();
        let (guilds, commands) = tokio::try_join!(
            client.fetch_guilds(),
            self.refresh_slash_commands(client),
        )?;

        tracing::info!("Bot is in {} guilds", guilds.len());
        tracing::info!("Bot has {} slash commands", commands.len());
        Ok(())
    }
}
