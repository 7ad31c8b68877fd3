//! Discord REST client

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::model::{
    ApplicationCommand, ApplicationCommandResponse, DiscordUser, InteractionResponse, PartialGuild,
};
use crate::application::errors::BotError;
use crate::domain::entities::{Command, Guild, RegisteredCommand, User};

/// Thin wrapper over the Discord HTTP API
#[derive(Clone)]
pub struct DiscordRest {
    client: Client,
    api_base: String,
    token: String,
}

impl DiscordRest {
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Result<Self, BotError> {
        let client = Client::builder()
            .user_agent(concat!(
                "DiscordBot (https://github.com/hermes-bot, ",
                env!("CARGO_PKG_VERSION"),
                ")"
            ))
            .build()
            .map_err(|e| BotError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Get the API URL for a route
    fn api_url(&self, route: &str) -> String {
        format!("{}{}", self.api_base, route)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("Authorization", format!("Bot {}", self.token))
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, BotError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED => BotError::Auth(format!("Discord rejected the token: {}", body)),
            StatusCode::TOO_MANY_REQUESTS => BotError::RateLimited(body),
            StatusCode::NOT_FOUND => BotError::NotFound(body),
            _ => BotError::Network(format!("Discord API error {}: {}", status, body)),
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BotError> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| BotError::Parse(e.to_string()))
    }

    /// `GET /users/@me`
    pub async fn current_user(&self) -> Result<User, BotError> {
        let user: DiscordUser = self
            .send_json(self.client.get(self.api_url("/users/@me")))
            .await?;
        Ok(user.into())
    }

    /// `GET /oauth2/applications/@me`, returns the application id
    pub async fn current_application_id(&self) -> Result<String, BotError> {
        #[derive(Deserialize)]
        struct Application {
            id: String,
        }

        let app: Application = self
            .send_json(self.client.get(self.api_url("/oauth2/applications/@me")))
            .await?;
        Ok(app.id)
    }

    /// `GET /users/@me/guilds`
    pub async fn current_user_guilds(&self) -> Result<Vec<Guild>, BotError> {
        let guilds: Vec<PartialGuild> = self
            .send_json(self.client.get(self.api_url("/users/@me/guilds")))
            .await?;
        Ok(guilds.into_iter().map(Guild::from).collect())
    }

    /// `PUT /applications/{id}/commands`, replacing every global command
    pub async fn bulk_overwrite_global_commands(
        &self,
        application_id: &str,
        commands: &[&Command],
    ) -> Result<Vec<RegisteredCommand>, BotError> {
        let body: Vec<ApplicationCommand> = commands.iter().map(|c| ApplicationCommand::from(*c)).collect();
        let url = self.api_url(&format!("/applications/{}/commands", application_id));

        let registered: Vec<ApplicationCommandResponse> =
            self.send_json(self.client.put(url).json(&body)).await?;

        tracing::info!("Registered {} application commands", registered.len());
        Ok(registered.into_iter().map(RegisteredCommand::from).collect())
    }

    /// `POST /interactions/{id}/{token}/callback` with a plain message
    pub async fn create_interaction_response(
        &self,
        interaction_id: &str,
        interaction_token: &str,
        content: &str,
    ) -> Result<(), BotError> {
        let url = self.api_url(&format!(
            "/interactions/{}/{}/callback",
            interaction_id, interaction_token
        ));
        self.send(self.client.post(url).json(&InteractionResponse::message(content)))
            .await?;
        Ok(())
    }
}
