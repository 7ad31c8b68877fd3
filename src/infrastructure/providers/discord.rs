//! Discord provider - owns the client connection for the application's lifetime

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::application::errors::BotError;
use crate::application::events::{BotStarted, Emitter, InteractionCreated};
use crate::application::kernel::{Application, ServiceProvider};
use crate::domain::traits::Bot;
use crate::infrastructure::adapters::discord::{ClientEvent, DiscordClient};
use crate::infrastructure::config::Config;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Binds the Discord client as `"discord"` and connects it on start
#[derive(Default)]
pub struct DiscordProvider {
    forwarder: Mutex<Option<JoinHandle<()>>>,
    connection: Mutex<Option<JoinHandle<()>>>,
}

impl DiscordProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

fn take(slot: &Mutex<Option<JoinHandle<()>>>) -> Option<JoinHandle<()>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

fn store(slot: &Mutex<Option<JoinHandle<()>>>, task: JoinHandle<()>) {
    *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
}

#[async_trait]
impl ServiceProvider for DiscordProvider {
    fn name(&self) -> &str {
        "discord"
    }

    fn register(&self, app: &Application) -> Result<(), BotError> {
        app.container().singleton(|c| {
            let config = c.make::<Config>()?;
            DiscordClient::new(&config.discord)
        });
        app.container().alias::<DiscordClient>("discord");
        Ok(())
    }

    async fn boot(&self, app: &Application) -> Result<(), BotError> {
        // Surface a bad token or config before anything connects.
        app.container().make_alias::<DiscordClient>("discord")?;
        Ok(())
    }

    async fn start(&self, app: &Application) -> Result<(), BotError> {
        let client = app.container().make_alias::<DiscordClient>("discord")?;

        let events = client.subscribe();
        store(
            &self.forwarder,
            tokio::spawn(forward_events(events, Arc::clone(&client), app.emitter())),
        );

        let connection = client.login();
        let exit = app.exit_handle();
        store(&self.connection, tokio::spawn(async move {
            match connection.await {
                Ok(Ok(())) => exit.request(),
                Ok(Err(e)) => {
                    tracing::error!("Discord connection failed: {}", e);
                    exit.fail(e.to_string());
                }
                Err(e) => exit.fail(format!("Discord connection task failed: {}", e)),
            }
        }));
        Ok(())
    }

    async fn shutdown(&self, app: &Application) -> Result<(), BotError> {
        if let Ok(client) = app.container().make_alias::<DiscordClient>("discord") {
            client.shutdown();
        }

        if let Some(mut connection) = take(&self.connection) {
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut connection).await.is_err() {
                tracing::warn!("Discord connection did not close in time, aborting");
                connection.abort();
            }
        }
        if let Some(forwarder) = take(&self.forwarder) {
            forwarder.abort();
        }
        Ok(())
    }
}

/// Re-emit client events on the application's event bus
async fn forward_events(
    mut events: tokio::sync::broadcast::Receiver<ClientEvent>,
    client: Arc<DiscordClient>,
    emitter: Arc<Emitter>,
) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("Dropped {} Discord events", skipped);
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        let bot: Arc<dyn Bot> = client.clone();
        let emitter = Arc::clone(&emitter);
        // Each event gets its own task so a slow listener does not stall the gateway.
        tokio::spawn(async move {
            match event {
                ClientEvent::Ready => {
                    emitter.emit(BotStarted::new(bot)).await;
                }
                ClientEvent::InteractionCreate(interaction) => {
                    emitter.emit(InteractionCreated::new(interaction, bot)).await;
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::events::Listener;
    use crate::infrastructure::adapters::discord::gateway::GatewayEvent;
    use serde_json::json;
    use tokio::sync::mpsc;

    struct Forwarded(mpsc::UnboundedSender<String>);

    #[async_trait]
    impl Listener<InteractionCreated> for Forwarded {
        async fn handle(&self, event: &InteractionCreated) -> Result<(), BotError> {
            let name = event.interaction.command_name().unwrap_or_default().to_string();
            self.0.send(name).map_err(|e| BotError::Internal(e.to_string()))
        }
    }

    #[async_trait]
    impl Listener<BotStarted> for Forwarded {
        async fn handle(&self, event: &BotStarted) -> Result<(), BotError> {
            let tag = event.client.bot_info().tag();
            self.0.send(format!("started:{}", tag)).map_err(|e| BotError::Internal(e.to_string()))
        }
    }

    #[tokio::test]
    async fn client_events_reach_listeners() {
        let config = Config::default().with_token("abcdefghijkl");
        let client = Arc::new(DiscordClient::new(&config.discord).unwrap());
        let emitter = Arc::new(Emitter::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        emitter.on::<InteractionCreated, _>(Forwarded(tx.clone()));
        emitter.on::<BotStarted, _>(Forwarded(tx));

        let forwarder = tokio::spawn(forward_events(
            client.subscribe(),
            Arc::clone(&client),
            Arc::clone(&emitter),
        ));

        let ready = serde_json::from_value(json!({
            "user": { "id": "1", "username": "hermes" },
            "session_id": "s",
            "application": { "id": "app" }
        }))
        .unwrap();
        client.handle_gateway_event(GatewayEvent::Ready(ready));
        let timeout = std::time::Duration::from_secs(5);
        let started = tokio::time::timeout(timeout, rx.recv()).await.unwrap();
        assert_eq!(started.as_deref(), Some("started:hermes"));

        let raw = serde_json::from_value(json!({
            "id": "7", "application_id": "app", "type": 2, "token": "t",
            "data": { "id": "c", "name": "ping" }
        }))
        .unwrap();
        client.handle_gateway_event(GatewayEvent::InteractionCreate(raw));
        let name = tokio::time::timeout(timeout, rx.recv()).await.unwrap();
        assert_eq!(name.as_deref(), Some("ping"));

        forwarder.abort();
    }

    #[tokio::test]
    async fn missing_token_fails_boot() {
        let app = Application::new(Config::default()).with_provider(DiscordProvider::new());
        let err = app.boot().await.unwrap_err();
        assert!(err.to_string().contains("discord.token"), "{}", err);
    }

    #[tokio::test]
    async fn client_is_bound_under_alias() {
        let app = Application::new(Config::default().with_token("abcdefghijkl"))
            .with_provider(DiscordProvider::new());
        app.boot().await.unwrap();

        let client = app.container().make_alias::<DiscordClient>("discord").unwrap();
        let again = app.container().make::<DiscordClient>().unwrap();
        assert!(Arc::ptr_eq(&client, &again));
    }
}
