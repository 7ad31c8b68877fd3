use crate::application::errors::CommandError;
use crate::domain::entities::Interaction;

/// Option value type, carrying the platform's wire code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    String,
    Integer,
    Boolean,
}

impl OptionKind {
    pub fn code(&self) -> u8 {
        match self {
            OptionKind::String => 3,
            OptionKind::Integer => 4,
            OptionKind::Boolean => 5,
        }
    }
}

/// Declared argument of a slash command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOption {
    pub name: String,
    pub description: String,
    pub kind: OptionKind,
    pub required: bool,
}

impl CommandOption {
    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind: OptionKind::String,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Command handler function type
pub type CommandHandler = Box<dyn Fn(&Interaction) -> Result<String, CommandError> + Send + Sync>;

/// Represents a slash command
pub struct Command {
    pub name: String,
    pub description: String,
    pub options: Vec<CommandOption>,
    pub handler: Option<CommandHandler>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            options: Vec::new(),
            handler: None,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn with_option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Interaction) -> Result<String, CommandError> + Send + Sync + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("options", &self.options)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

/// A command as acknowledged by the platform after registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredCommand {
    pub id: String,
    pub name: String,
}

/// Command registry for managing available commands.
/// Keeps registration order, which is also the order sent to the platform.
#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<Command>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command, replacing any previous one with the same name
    pub fn register(&mut self, command: Command) {
        match self.commands.iter_mut().find(|c| c.name == command.name) {
            Some(existing) => *existing = command,
            None => self.commands.push(command),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.name == name)
    }

    pub fn all(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_replaces_same_name() {
        let mut registry = CommandRegistry::new();
        registry.register(Command::new("ping").with_description("first"));
        registry.register(Command::new("echo"));
        registry.register(Command::new("ping").with_description("second"));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("ping").map(|c| c.description.as_str()), Some("second"));
        let names: Vec<_> = registry.all().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["ping", "echo"]);
    }

    #[test]
    fn lookup_is_exact() {
        let mut registry = CommandRegistry::new();
        registry.register(Command::new("ping"));
        assert!(registry.get("ping").is_some());
        assert!(registry.get("pin").is_none());
        assert!(registry.get("pingx").is_none());
    }

    #[test]
    fn string_option_code() {
        let option = CommandOption::string("input", "The input").required();
        assert!(option.required);
        assert_eq!(option.kind.code(), 3);
    }
}
