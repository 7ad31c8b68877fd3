//! Console provider - drives the bot from stdin lines

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::application::errors::BotError;
use crate::application::events::{BotStarted, InteractionCreated};
use crate::application::kernel::{Application, ServiceProvider};
use crate::application::messaging::InteractionParser;
use crate::application::services::CommandService;
use crate::domain::entities::User;
use crate::domain::traits::Bot;
use crate::infrastructure::adapters::console::ConsoleAdapter;
use crate::infrastructure::config::Config;

type Input = Box<dyn AsyncBufRead + Send + Unpin>;

/// Binds a [`ConsoleAdapter`] as `"console"` and feeds it typed commands
pub struct ConsoleProvider {
    input: Mutex<Option<Input>>,
    replies: Option<mpsc::UnboundedSender<String>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ConsoleProvider {
    /// Read from stdin
    pub fn new() -> Self {
        Self::with_input(BufReader::new(tokio::io::stdin()))
    }

    pub fn with_input<R: AsyncBufRead + Send + Unpin + 'static>(input: R) -> Self {
        Self {
            input: Mutex::new(Some(Box::new(input))),
            replies: None,
            task: Mutex::new(None),
        }
    }

    /// Mirror bot replies into a channel
    pub fn with_replies(mut self, replies: mpsc::UnboundedSender<String>) -> Self {
        self.replies = Some(replies);
        self
    }
}

impl Default for ConsoleProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn console_user() -> User {
    let name = std::env::var("USER").unwrap_or_else(|_| "console".to_string());
    User::new("console", name)
}

#[async_trait]
impl ServiceProvider for ConsoleProvider {
    fn name(&self) -> &str {
        "console"
    }

    fn register(&self, app: &Application) -> Result<(), BotError> {
        let config = app.config()?;
        let mut adapter = ConsoleAdapter::new(config.bot.name.clone());
        if let Some(replies) = &self.replies {
            adapter = adapter.with_sender(replies.clone());
        }
        app.container().instance(Arc::new(adapter));
        app.container().alias::<ConsoleAdapter>("console");
        Ok(())
    }

    async fn start(&self, app: &Application) -> Result<(), BotError> {
        let input = self
            .input
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| BotError::Internal("console input already consumed".to_string()))?;

        let bot: Arc<dyn Bot> = app.container().make_alias::<ConsoleAdapter>("console")?;
        let config = app.container().make::<Config>()?;
        let commands = app.container().make::<CommandService>()?;
        let parser = InteractionParser::new(config.bot.prefix.clone(), commands.definitions());
        let help = commands.get_help();
        let emitter = app.emitter();
        let exit = app.exit_handle();
        let prefix = config.bot.prefix.clone();

        let task = tokio::spawn(async move {
            emitter.emit(BotStarted::new(Arc::clone(&bot))).await;
            print!("{}", help);
            println!("Type 'exit' to quit.");

            let mut lines = input.lines();
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!("Failed to read console input: {}", e);
                        break;
                    }
                };

                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "exit" || line == "quit" {
                    break;
                }

                match parser.parse(line, Some(console_user())) {
                    Some(interaction) => {
                        emitter
                            .emit(InteractionCreated::new(interaction, Arc::clone(&bot)))
                            .await;
                    }
                    None => println!("Commands start with '{}'", prefix),
                }
            }
            exit.request();
        });

        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
        Ok(())
    }

    async fn shutdown(&self, _app: &Application) -> Result<(), BotError> {
        // Blocked on stdin, so it cannot be awaited.
        if let Some(task) = self.task.lock().unwrap_or_else(PoisonError::into_inner).take() {
            task.abort();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn input_lines_reach_the_emitter() {
        let app = Application::new(Config::default());
        app.container().instance(Arc::new(CommandService::with_defaults()));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let provider = ConsoleProvider::with_input(&b"/ping\nhello\nexit\n/ping\n"[..]).with_replies(tx);
        let app = app.with_provider(provider);

        let seen = Arc::new(Mutex::new(Vec::new()));
        struct Capture(Arc<Mutex<Vec<String>>>);

        #[async_trait]
        impl crate::application::events::Listener<InteractionCreated> for Capture {
            async fn handle(&self, event: &InteractionCreated) -> Result<(), BotError> {
                let name = event.interaction.command_name().unwrap_or_default().to_string();
                self.0.lock().unwrap().push(name);
                event.client.reply(&event.interaction, "ok").await
            }
        }
        app.emitter().on::<InteractionCreated, _>(Capture(Arc::clone(&seen)));

        app.run().await.unwrap();

        // Lines after `exit` are never read.
        assert_eq!(*seen.lock().unwrap(), vec!["ping".to_string()]);
        assert_eq!(rx.recv().await.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn end_of_input_requests_exit() {
        let app = Application::new(Config::default());
        app.container().instance(Arc::new(CommandService::with_defaults()));
        let app = app.with_provider(ConsoleProvider::with_input(&b""[..]));

        app.run().await.unwrap();
        assert!(app.container().make_alias::<ConsoleAdapter>("console").is_ok());
    }
}
