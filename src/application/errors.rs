//! Application layer errors

use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for BotError {
    fn from(e: serde_json::Error) -> Self {
        BotError::Parse(e.to_string())
    }
}

/// Command execution errors
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// Service container errors
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("No binding registered for {0}")]
    NotBound(&'static str),

    #[error("Unknown alias '{0}'")]
    AliasNotFound(String),

    #[error("Alias '{alias}' is not bound to {expected}")]
    AliasMismatch { alias: String, expected: &'static str },

    #[error("Failed to construct {type_name}: {reason}")]
    Construction { type_name: &'static str, reason: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
