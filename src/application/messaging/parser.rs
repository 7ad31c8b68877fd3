//! Interaction parser - Turns typed command lines into interactions

use std::collections::HashMap;

use crate::domain::entities::{Command, CommandData, Interaction, User};

/// Parses `/name rest of line` into a chat-input interaction.
///
/// The text after the command name is bound to the command's first declared option.
pub struct InteractionParser {
    command_prefix: String,
    first_options: HashMap<String, String>,
}

impl InteractionParser {
    pub fn new<'a>(prefix: impl Into<String>, commands: impl IntoIterator<Item = &'a Command>) -> Self {
        let first_options = commands
            .into_iter()
            .filter_map(|c| c.options.first().map(|o| (c.name.clone(), o.name.clone())))
            .collect();

        Self {
            command_prefix: prefix.into(),
            first_options,
        }
    }

    /// Parse a line; `None` when it is not a command
    pub fn parse(&self, text: &str, sender: Option<User>) -> Option<Interaction> {
        let text = text.trim();
        let cmd_text = text.strip_prefix(self.command_prefix.as_str())?;

        let (name, rest) = match cmd_text.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (cmd_text, ""),
        };
        if name.is_empty() {
            return None;
        }

        let mut data = CommandData::chat_input(name);
        if !rest.is_empty() {
            if let Some(option) = self.first_options.get(name) {
                data = data.with_option(option.clone(), rest);
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        let mut interaction = Interaction::command(id.clone(), id, data)
            .with_platform("console")
            .with_channel("console");
        if let Some(user) = sender {
            interaction = interaction.with_user(user);
        }
        Some(interaction)
    }
}
