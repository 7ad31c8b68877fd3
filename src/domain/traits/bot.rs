use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::application::errors::BotError;
use crate::domain::entities::{Command, Guild, Interaction, RegisteredCommand};

/// Bot trait - abstraction for chat platform clients
#[async_trait]
pub trait Bot: Send + Sync {
    /// Reply to an interaction with plain text
    async fn reply(&self, interaction: &Interaction, content: &str) -> Result<(), BotError>;

    /// Fetch the guilds the bot is a member of
    async fn fetch_guilds(&self) -> Result<Vec<Guild>, BotError>;

    /// Replace the registered slash commands with the given set
    async fn set_commands(&self, commands: &[&Command]) -> Result<Vec<RegisteredCommand>, BotError>;

    /// Get bot info
    fn bot_info(&self) -> BotInfo;
}

/// Bot information
#[derive(Debug, Clone, Default)]
pub struct BotInfo {
    pub id: String,
    pub name: String,
    pub username: String,
    pub discriminator: Option<String>,
    pub ready_at: Option<DateTime<Utc>>,
}

impl BotInfo {
    pub fn tag(&self) -> String {
        match self.discriminator.as_deref() {
            Some(d) if !d.is_empty() && d != "0" => format!("{}#{}", self.username, d),
            _ => self.username.clone(),
        }
    }
}
