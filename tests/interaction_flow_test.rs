//! Event flow from the emitter through listeners to the bot
//! Run with: cargo test --test interaction_flow_test

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use hermes_bot::application::errors::BotError;
use hermes_bot::application::events::{BotStarted, InteractionCreated};
use hermes_bot::application::messaging::RATE_LIMITED_REPLY;
use hermes_bot::bootstrap;
use hermes_bot::domain::entities::{
    Command, CommandData, Guild, Interaction, InteractionKind, RegisteredCommand, User,
};
use hermes_bot::domain::traits::{Bot, BotInfo};
use hermes_bot::infrastructure::config::Config;

/// Records every call instead of talking to a platform
#[derive(Default)]
struct RecordingBot {
    replies: Mutex<Vec<String>>,
    registered: Mutex<Vec<String>>,
    fail_guilds: bool,
}

impl RecordingBot {
    fn replies(&self) -> Vec<String> {
        self.replies.lock().unwrap().clone()
    }
}

#[async_trait]
impl Bot for RecordingBot {
    async fn reply(&self, _interaction: &Interaction, content: &str) -> Result<(), BotError> {
        self.replies.lock().unwrap().push(content.to_string());
        Ok(())
    }

    async fn fetch_guilds(&self) -> Result<Vec<Guild>, BotError> {
        if self.fail_guilds {
            return Err(BotError::Network("offline".to_string()));
        }
        Ok(vec![Guild::new("1", "Test Guild")])
    }

    async fn set_commands(&self, commands: &[&Command]) -> Result<Vec<RegisteredCommand>, BotError> {
        let mut registered = self.registered.lock().unwrap();
        registered.clear();
        registered.extend(commands.iter().map(|c| c.name.clone()));
        Ok(commands
            .iter()
            .enumerate()
            .map(|(i, c)| RegisteredCommand { id: i.to_string(), name: c.name.clone() })
            .collect())
    }

    fn bot_info(&self) -> BotInfo {
        BotInfo {
            id: "1".to_string(),
            name: "Hermes".to_string(),
            username: "hermes".to_string(),
            discriminator: Some("0001".to_string()),
            ready_at: Some(Utc::now()),
        }
    }
}

fn command(name: &str) -> Interaction {
    Interaction::command("i", "t", CommandData::chat_input(name))
        .with_user(User::new("u1", "alice"))
        .with_channel("c1")
}

fn echo(input: &str) -> Interaction {
    Interaction::command("i", "t", CommandData::chat_input("echo").with_option("input", input))
        .with_user(User::new("u1", "alice"))
        .with_channel("c1")
}

#[tokio::test]
async fn ping_and_echo_reply() {
    let app = bootstrap::application(Config::default());
    let bot = Arc::new(RecordingBot::default());
    let client: Arc<dyn Bot> = bot.clone();

    app.emitter().emit(InteractionCreated::new(command("ping"), client.clone())).await;
    app.emitter().emit(InteractionCreated::new(echo("hello world"), client.clone())).await;
    app.emitter().emit(InteractionCreated::new(echo("héllo 👋"), client.clone())).await;

    assert_eq!(bot.replies(), vec!["Pong!", "dlrow olleh", "👋 olléh"]);
}

#[tokio::test]
async fn ping_always_pongs_with_default_config() {
    let app = bootstrap::application(Config::default());
    let bot = Arc::new(RecordingBot::default());
    let client: Arc<dyn Bot> = bot.clone();

    for _ in 0..50 {
        app.emitter().emit(InteractionCreated::new(command("ping"), client.clone())).await;
    }

    let replies = bot.replies();
    assert_eq!(replies.len(), 50);
    assert!(replies.iter().all(|r| r == "Pong!"));
}

#[tokio::test]
async fn components_do_not_consume_rate_limit() {
    let mut config = Config::default();
    config.security.rate_limit.enabled = true;
    config.security.rate_limit.max_requests = 1;
    let app = bootstrap::application(config);
    let bot = Arc::new(RecordingBot::default());
    let client: Arc<dyn Bot> = bot.clone();

    let click = Interaction::new("i", "t", InteractionKind::MessageComponent)
        .with_user(User::new("u1", "alice"))
        .with_channel("c1");
    app.emitter().emit(InteractionCreated::new(click.clone(), client.clone())).await;
    app.emitter().emit(InteractionCreated::new(command("ping"), client.clone())).await;
    app.emitter().emit(InteractionCreated::new(click, client.clone())).await;

    assert_eq!(bot.replies(), vec!["Pong!"]);
}

#[tokio::test]
async fn unknown_and_invalid_commands() {
    let app = bootstrap::application(Config::default());
    let bot = Arc::new(RecordingBot::default());
    let client: Arc<dyn Bot> = bot.clone();

    app.emitter().emit(InteractionCreated::new(command("dance"), client.clone())).await;
    // echo without its required option
    app.emitter().emit(InteractionCreated::new(command("echo"), client.clone())).await;

    let replies = bot.replies();
    assert_eq!(replies[0], "Unknown command");
    assert!(replies[1].starts_with("Error: "), "{}", replies[1]);
}

#[tokio::test]
async fn non_command_interactions_are_ignored() {
    let app = bootstrap::application(Config::default());
    let bot = Arc::new(RecordingBot::default());
    let client: Arc<dyn Bot> = bot.clone();

    let component = Interaction::new("i", "t", InteractionKind::MessageComponent);
    let handled = app.emitter().emit(InteractionCreated::new(component, client)).await;

    assert_eq!(handled, 1);
    assert!(bot.replies().is_empty());
}

#[tokio::test]
async fn rate_limit_replies_after_quota() {
    let mut config = Config::default();
    config.security.rate_limit.enabled = true;
    config.security.rate_limit.max_requests = 2;
    let app = bootstrap::application(config);
    let bot = Arc::new(RecordingBot::default());
    let client: Arc<dyn Bot> = bot.clone();

    for _ in 0..3 {
        app.emitter().emit(InteractionCreated::new(command("ping"), client.clone())).await;
    }

    assert_eq!(bot.replies(), vec!["Pong!", "Pong!", RATE_LIMITED_REPLY]);
}

#[tokio::test]
async fn bot_started_registers_exactly_ping_and_echo() {
    let app = bootstrap::application(Config::default());
    let bot = Arc::new(RecordingBot::default());

    let handled = app.emitter().emit(BotStarted::new(bot.clone())).await;

    assert_eq!(handled, 1);
    assert_eq!(*bot.registered.lock().unwrap(), vec!["ping", "echo"]);
}

#[tokio::test]
async fn bot_started_failure_is_contained() {
    let app = bootstrap::application(Config::default());
    let bot = Arc::new(RecordingBot { fail_guilds: true, ..Default::default() });

    let handled = app.emitter().emit(BotStarted::new(bot)).await;
    assert_eq!(handled, 0);
}
