use chrono::{DateTime, Utc};

use super::User;
use crate::application::errors::CommandError;

/// Kind of interaction delivered by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    Ping,
    ApplicationCommand,
    MessageComponent,
    Autocomplete,
    ModalSubmit,
    Other(u8),
}

impl InteractionKind {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => InteractionKind::Ping,
            2 => InteractionKind::ApplicationCommand,
            3 => InteractionKind::MessageComponent,
            4 => InteractionKind::Autocomplete,
            5 => InteractionKind::ModalSubmit,
            other => InteractionKind::Other(other),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            InteractionKind::Ping => "ping",
            InteractionKind::ApplicationCommand => "application_command",
            InteractionKind::MessageComponent => "message_component",
            InteractionKind::Autocomplete => "autocomplete",
            InteractionKind::ModalSubmit => "modal_submit",
            InteractionKind::Other(_) => "other",
        }
    }
}

/// Kind of application command that was invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    ChatInput,
    User,
    Message,
    Other(u8),
}

impl CommandKind {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => CommandKind::ChatInput,
            2 => CommandKind::User,
            3 => CommandKind::Message,
            other => CommandKind::Other(other),
        }
    }
}

/// A single named argument supplied with a command
#[derive(Debug, Clone, PartialEq)]
pub struct CommandArgument {
    pub name: String,
    pub value: serde_json::Value,
}

/// Invoked command and its arguments
#[derive(Debug, Clone, PartialEq)]
pub struct CommandData {
    pub id: String,
    pub name: String,
    pub kind: CommandKind,
    pub options: Vec<CommandArgument>,
}

impl CommandData {
    pub fn chat_input(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            kind: CommandKind::ChatInput,
            options: Vec::new(),
        }
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.options.push(CommandArgument {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}

/// An incoming interaction (slash command invocation, component click, ...)
#[derive(Debug, Clone)]
pub struct Interaction {
    pub id: String,
    pub token: String,
    pub application_id: String,
    pub kind: InteractionKind,
    pub guild_id: Option<String>,
    pub channel_id: Option<String>,
    pub user: Option<User>,
    pub data: Option<CommandData>,
    pub received_at: DateTime<Utc>,
    pub platform: String,
}

impl Interaction {
    pub fn new(id: impl Into<String>, token: impl Into<String>, kind: InteractionKind) -> Self {
        Self {
            id: id.into(),
            token: token.into(),
            application_id: String::new(),
            kind,
            guild_id: None,
            channel_id: None,
            user: None,
            data: None,
            received_at: Utc::now(),
            platform: "unknown".to_string(),
        }
    }

    /// Build a chat-input command interaction
    pub fn command(id: impl Into<String>, token: impl Into<String>, data: CommandData) -> Self {
        let mut interaction = Self::new(id, token, InteractionKind::ApplicationCommand);
        interaction.data = Some(data);
        interaction
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = Some(channel_id.into());
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn is_chat_input_command(&self) -> bool {
        self.kind == InteractionKind::ApplicationCommand
            && matches!(&self.data, Some(data) if data.kind == CommandKind::ChatInput)
    }

    pub fn command_name(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.name.as_str())
    }

    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.data
            .as_ref()?
            .options
            .iter()
            .find(|o| o.name == name)
            .and_then(|o| o.value.as_str())
    }

    /// Like `get_string`, but a missing option is an error
    pub fn require_string(&self, name: &str) -> Result<&str, CommandError> {
        self.get_string(name)
            .ok_or_else(|| CommandError::InvalidArgs(format!("missing required option '{}'", name)))
    }
}
