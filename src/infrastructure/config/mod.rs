//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::application::errors::ConfigError;

/// Environment variables checked for the bot token, in order
pub const TOKEN_ENV_VARS: [&str; 2] = ["TOKEN", "DISCORD_TOKEN"];

/// `GUILDS` gateway intent
pub const DEFAULT_INTENTS: u64 = 1;

/// Bot configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub bot: BotConfig,
    pub discord: DiscordConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotConfig {
    pub name: String,
    pub prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DiscordConfig {
    pub token: Option<String>,
    pub intents: u64,
    pub api_base: String,
    pub gateway_url: String,
    pub reconnect_delay_seconds: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SecurityConfig {
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub max_requests: u32,
    pub window_seconds: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "hermes-bot".to_string(),
            prefix: "/".to_string(),
        }
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: None,
            intents: DEFAULT_INTENTS,
            api_base: "https://discord.com/api/v10".to_string(),
            gateway_url: "wss://gateway.discord.gg/?v=10&encoding=json".to_string(),
            reconnect_delay_seconds: 5,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_requests: 20,
            window_seconds: 60,
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config {}: {}", path.display(), e)))?;

        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl Into<PathBuf>) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path.into(), content)?;
        Ok(())
    }

    pub fn load_env() -> Self {
        Config::default().with_env()
    }

    /// Overlay values from the environment
    pub fn with_env(mut self) -> Self {
        if let Some(token) = TOKEN_ENV_VARS
            .iter()
            .filter_map(|key| std::env::var(key).ok())
            .find(|v| !v.trim().is_empty())
        {
            self.discord.token = Some(token);
        }

        if let Ok(prefix) = std::env::var("BOT_PREFIX") {
            self.bot.prefix = prefix;
        }

        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.discord.token = Some(token.into());
        self
    }

    /// The configured token, ignoring blank values
    pub fn token(&self) -> Option<&str> {
        self.discord
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.prefix.is_empty() {
            return Err(ConfigError::MissingField("bot.prefix".to_string()));
        }
        if self.discord.api_base.is_empty() {
            return Err(ConfigError::MissingField("discord.api-base".to_string()));
        }
        if !(self.discord.gateway_url.starts_with("ws://") || self.discord.gateway_url.starts_with("wss://")) {
            return Err(ConfigError::InvalidValue(format!(
                "discord.gateway-url must be a ws:// or wss:// URL, got '{}'",
                self.discord.gateway_url
            )));
        }
        if self.security.rate_limit.enabled && self.security.rate_limit.max_requests == 0 {
            return Err(ConfigError::InvalidValue(
                "security.rate-limit.max-requests must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bot:\n  name: test-bot\nsecurity:\n  rate-limit:\n    max-requests: 3").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.bot.name, "test-bot");
        assert_eq!(config.bot.prefix, "/");
        assert_eq!(config.security.rate_limit.max_requests, 3);
        assert_eq!(config.security.rate_limit.window_seconds, 60);
        assert!(!config.security.rate_limit.enabled);
        assert_eq!(config.discord.intents, DEFAULT_INTENTS);
        assert!(config.token().is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        Config::default().with_token("abc").save(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("api-base"));
        assert_eq!(Config::load(&path).unwrap().token(), Some("abc"));
    }

    #[test]
    fn blank_token_is_none() {
        assert!(Config::default().with_token("   ").token().is_none());
    }

    #[test]
    fn rejects_bad_gateway_url() {
        let mut config = Config::default();
        config.discord.gateway_url = "https://example.com".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Config::load("/definitely/not/here.yaml").is_err());
    }
}
