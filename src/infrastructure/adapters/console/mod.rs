//! Console adapter for development/testing

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use crate::application::errors::BotError;
use crate::domain::entities::{Command, Guild, Interaction, RegisteredCommand};
use crate::domain::traits::{Bot, BotInfo};

/// Console bot adapter for local development
pub struct ConsoleAdapter {
    info: BotInfo,
    sender: Option<mpsc::UnboundedSender<String>>,
}

impl ConsoleAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            info: BotInfo {
                id: "console".to_string(),
                name: name.into(),
                username: "console".to_string(),
                discriminator: None,
                ready_at: Some(Utc::now()),
            },
            sender: None,
        }
    }

    /// Mirror every reply into a channel
    pub fn with_sender(mut self, sender: mpsc::UnboundedSender<String>) -> Self {
        self.sender = Some(sender);
        self
    }
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self::new("hermes-bot")
    }
}

#[async_trait]
impl Bot for ConsoleAdapter {
    async fn reply(&self, _interaction: &Interaction, content: &str) -> Result<(), BotError> {
        println!("[BOT] {}", content);
        if let Some(sender) = &self.sender {
            sender
                .send(content.to_string())
                .map_err(|e| BotError::Internal(format!("console reply channel closed: {}", e)))?;
        }
        Ok(())
    }

    async fn fetch_guilds(&self) -> Result<Vec<Guild>, BotError> {
        Ok(Vec::new())
    }

    async fn set_commands(&self, commands: &[&Command]) -> Result<Vec<RegisteredCommand>, BotError> {
        Ok(commands
            .iter()
            .map(|c| RegisteredCommand {
                id: format!("console-{}", c.name),
                name: c.name.clone(),
            })
            .collect())
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::InteractionKind;

    #[tokio::test]
    async fn replies_are_mirrored() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let adapter = ConsoleAdapter::default().with_sender(tx);
        let interaction = Interaction::new("1", "t", InteractionKind::ApplicationCommand);

        adapter.reply(&interaction, "Pong!").await.unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("Pong!"));
    }

    #[tokio::test]
    async fn registers_commands_locally() {
        let adapter = ConsoleAdapter::new("dev");
        let ping = Command::new("ping");
        let registered = adapter.set_commands(&[&ping]).await.unwrap();

        assert_eq!(registered, vec![RegisteredCommand { id: "console-ping".into(), name: "ping".into() }]);
        assert!(adapter.fetch_guilds().await.unwrap().is_empty());
        assert_eq!(adapter.bot_info().tag(), "console");
    }
}
