//! Discord client - gateway events in, REST calls out

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use super::gateway::{Gateway, GatewayEvent};
use super::model::Ready;
use super::rest::DiscordRest;
use crate::application::errors::{BotError, ConfigError};
use crate::domain::entities::{Command, Guild, Interaction, RegisteredCommand};
use crate::domain::traits::{Bot, BotInfo};
use crate::infrastructure::config::DiscordConfig;

const EVENT_CAPACITY: usize = 256;

/// Events re-broadcast to subscribers
#[derive(Debug, Clone)]
pub enum ClientEvent {
    Ready,
    InteractionCreate(Interaction),
}

/// Discord bot client
pub struct DiscordClient {
    rest: DiscordRest,
    token: String,
    gateway_url: String,
    intents: u64,
    reconnect_delay: Duration,
    info: RwLock<BotInfo>,
    application_id: RwLock<Option<String>>,
    events: broadcast::Sender<ClientEvent>,
    shutdown: watch::Sender<bool>,
}

impl DiscordClient {
    pub fn new(config: &DiscordConfig) -> Result<Self, BotError> {
        let token = config
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ConfigError::MissingField("discord.token".to_string()))?
            .to_string();

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            rest: DiscordRest::new(config.api_base.as_str(), token.as_str())?,
            token,
            gateway_url: config.gateway_url.clone(),
            intents: config.intents,
            reconnect_delay: Duration::from_secs(config.reconnect_delay_seconds),
            info: RwLock::new(BotInfo::default()),
            application_id: RwLock::new(None),
            events,
            shutdown,
        })
    }

    /// Receive `Ready` and `InteractionCreate` events
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Connect to the gateway in the background
    pub fn login(self: &Arc<Self>) -> JoinHandle<Result<(), BotError>> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let gateway = Gateway::new(
            self.gateway_url.as_str(),
            self.token.as_str(),
            self.intents,
            self.reconnect_delay,
            tx,
        );
        let shutdown = self.shutdown.subscribe();
        let client = Arc::clone(self);

        let masked: String = self.token.chars().take(8).collect();
        tracing::info!("Logging in to Discord (token: {}...)", masked);

        tokio::spawn(async move {
            let connection = tokio::spawn(gateway.run(shutdown));
            // Ends once the gateway drops its sender.
            while let Some(event) = rx.recv().await {
                client.handle_gateway_event(event);
            }
            connection
                .await
                .map_err(|e| BotError::Internal(format!("gateway task panicked: {}", e)))?
        })
    }

    /// Ask the gateway to close
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn application_id(&self) -> Option<String> {
        self.application_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn handle_gateway_event(&self, event: GatewayEvent) {
        let event = match event {
            // Every reconnect identifies again; only the first session announces readiness.
            GatewayEvent::Ready(ready) => {
                if !self.record_ready(ready) {
                    return;
                }
                ClientEvent::Ready
            }
            GatewayEvent::InteractionCreate(raw) => ClientEvent::InteractionCreate(raw.into()),
        };

        if self.events.send(event).is_err() {
            tracing::debug!("No subscribers for client event");
        }
    }

    /// Store the session identity; `true` for the first READY of this client
    fn record_ready(&self, ready: Ready) -> bool {
        tracing::debug!("Gateway session {} ready", ready.session_id);
        let user = ready.user;
        let mut info = self.info.write().unwrap_or_else(PoisonError::into_inner);
        let first = info.ready_at.is_none();
        *info = BotInfo {
            id: user.id,
            name: user.global_name.unwrap_or_else(|| user.username.clone()),
            username: user.username,
            discriminator: user.discriminator,
            ready_at: info.ready_at.or_else(|| Some(Utc::now())),
        };
        drop(info);
        *self.application_id.write().unwrap_or_else(PoisonError::into_inner) = Some(ready.application.id);
        first
    }

    async fn resolve_application_id(&self) -> Result<String, BotError> {
        if let Some(id) = self.application_id() {
            return Ok(id);
        }
        let id = self.rest.current_application_id().await?;
        *self.application_id.write().unwrap_or_else(PoisonError::into_inner) = Some(id.clone());
        Ok(id)
    }
}

#[async_trait]
impl Bot for DiscordClient {
    async fn reply(&self, interaction: &Interaction, content: &str) -> Result<(), BotError> {
        self.rest
            .create_interaction_response(&interaction.id, &interaction.token, content)
            .await
    }

    async fn fetch_guilds(&self) -> Result<Vec<Guild>, BotError> {
        self.rest.current_user_guilds().await
    }

    async fn set_commands(&self, commands: &[&Command]) -> Result<Vec<RegisteredCommand>, BotError> {
        let application_id = self.resolve_application_id().await?;
        self.rest
            .bulk_overwrite_global_commands(&application_id, commands)
            .await
    }

    fn bot_info(&self) -> BotInfo {
        self.info
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::discord::model::RawInteraction;
    use serde_json::json;

    fn client() -> DiscordClient {
        let config = DiscordConfig {
            token: Some("token-1234567890".to_string()),
            ..DiscordConfig::default()
        };
        DiscordClient::new(&config).unwrap()
    }

    #[test]
    fn requires_token() {
        let result = DiscordClient::new(&DiscordConfig::default());
        assert!(matches!(result, Err(BotError::Config(ConfigError::MissingField(_)))));
    }

    #[tokio::test]
    async fn ready_records_identity() {
        let client = client();
        let mut events = client.subscribe();

        let ready = serde_json::from_value(json!({
            "user": { "id": "1", "username": "hermes", "discriminator": "4242" },
            "session_id": "s",
            "application": { "id": "app-9" }
        }))
        .unwrap();
        client.handle_gateway_event(GatewayEvent::Ready(ready));

        assert!(matches!(events.recv().await.unwrap(), ClientEvent::Ready));
        let info = client.bot_info();
        assert_eq!(info.tag(), "hermes#4242");
        assert!(info.ready_at.is_some());
        assert_eq!(client.application_id().as_deref(), Some("app-9"));
    }

    #[tokio::test]
    async fn ready_after_reconnect_is_not_rebroadcast() {
        let client = client();
        let mut events = client.subscribe();

        for (session, username) in [("s1", "hermes"), ("s2", "hermes-renamed")] {
            let ready = serde_json::from_value(json!({
                "user": { "id": "1", "username": username },
                "session_id": session,
                "application": { "id": "app-9" }
            }))
            .unwrap();
            client.handle_gateway_event(GatewayEvent::Ready(ready));
        }

        assert!(matches!(events.recv().await.unwrap(), ClientEvent::Ready));
        assert!(matches!(
            events.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
        // The session identity still follows the latest READY.
        assert_eq!(client.bot_info().username, "hermes-renamed");
    }

    #[tokio::test]
    async fn interactions_are_converted() {
        let client = client();
        let mut events = client.subscribe();

        let raw: RawInteraction = serde_json::from_value(json!({
            "id": "7", "application_id": "app", "type": 2, "token": "t",
            "data": { "id": "c", "name": "echo", "options": [{ "name": "input", "type": 3, "value": "hi" }] }
        }))
        .unwrap();
        client.handle_gateway_event(GatewayEvent::InteractionCreate(raw));

        match events.recv().await.unwrap() {
            ClientEvent::InteractionCreate(interaction) => {
                assert_eq!(interaction.get_string("input"), Some("hi"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
