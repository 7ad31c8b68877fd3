use crate::application::errors::CommandError;
use crate::domain::entities::{Command, CommandOption, CommandRegistry, Interaction};

pub const PONG_REPLY: &str = "Pong!";
pub const UNKNOWN_COMMAND_REPLY: &str = "Unknown command";

/// Reverse a string by Unicode scalar value
pub fn reverse(input: &str) -> String {
    input.chars().rev().collect()
}

/// Service for managing and executing slash commands
#[derive(Default)]
pub struct CommandService {
    registry: CommandRegistry,
}

impl CommandService {
    pub fn new() -> Self {
        Self::default()
    }

    /// A service with `ping` and `echo` registered
    pub fn with_defaults() -> Self {
        let mut service = Self::new();
        service.register_defaults();
        service
    }

    pub fn register(&mut self, command: Command) {
        self.registry.register(command);
    }

    pub fn register_defaults(&mut self) {
        self.register(Command::new("ping")
            .with_description("Replies with pong")
            .with_handler(|_| Ok(PONG_REPLY.to_string())));

        self.register(Command::new("echo")
            .with_description("Replies with your input")
            .with_option(CommandOption::string("input", "The input to echo").required())
            .with_handler(|interaction| {
                let input = interaction.require_string("input")?;
                Ok(reverse(input))
            }));
    }

    /// Produce the reply for an interaction.
    ///
    /// `Ok(None)` means the interaction is not a chat-input command and gets no reply.
    pub fn handle(&self, interaction: &Interaction) -> Result<Option<String>, CommandError> {
        if !interaction.is_chat_input_command() {
            return Ok(None);
        }
        let Some(name) = interaction.command_name() else {
            return Ok(None);
        };

        let Some(cmd) = self.registry.get(name) else {
            tracing::debug!("Unknown command: /{}", name);
            return Ok(Some(UNKNOWN_COMMAND_REPLY.to_string()));
        };

        match &cmd.handler {
            Some(handler) => Ok(Some(handler(interaction)?)),
            None => Err(CommandError::ExecutionFailed(format!("Command {} not implemented", cmd.name))),
        }
    }

    /// Command definitions in registration order
    pub fn definitions(&self) -> Vec<&Command> {
        self.registry.all().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.registry.get(name)
    }

    pub fn get_help(&self) -> String {
        let mut help = "Available commands:\n".to_string();
        for cmd in self.registry.all() {
            help.push_str(&format!("  /{} - {}\n", cmd.name, cmd.description));
        }
        help
    }
}
