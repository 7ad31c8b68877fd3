//! Discord wire types (API v10)

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::entities::{
    Command, CommandArgument, CommandData, CommandKind, Guild, Interaction, InteractionKind,
    RegisteredCommand, User,
};

/// Gateway opcodes
pub mod opcode {
    pub const DISPATCH: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const IDENTIFY: u8 = 2;
    pub const RECONNECT: u8 = 7;
    pub const INVALID_SESSION: u8 = 9;
    pub const HELLO: u8 = 10;
    pub const HEARTBEAT_ACK: u8 = 11;
}

/// Interaction callback type: reply with a message
pub const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;

/// Every gateway frame
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayPayload {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub t: Option<String>,
}

impl GatewayPayload {
    pub fn new(op: u8, d: Value) -> Self {
        Self { op, d, s: None, t: None }
    }

    pub fn heartbeat(seq: Option<u64>) -> Self {
        Self::new(opcode::HEARTBEAT, seq.map_or(Value::Null, Value::from))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hello {
    pub heartbeat_interval: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Identify {
    pub token: String,
    pub intents: u64,
    pub properties: IdentifyProperties,
}

#[derive(Debug, Clone, Serialize)]
pub struct IdentifyProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
}

impl Identify {
    pub fn new(token: impl Into<String>, intents: u64) -> Self {
        Self {
            token: token.into(),
            intents,
            properties: IdentifyProperties {
                os: std::env::consts::OS.to_string(),
                browser: env!("CARGO_PKG_NAME").to_string(),
                device: env!("CARGO_PKG_NAME").to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl From<DiscordUser> for User {
    fn from(u: DiscordUser) -> Self {
        User {
            id: u.id,
            username: u.username,
            discriminator: u.discriminator,
            global_name: u.global_name,
            is_bot: u.bot,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartialApplication {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnavailableGuild {
    pub id: String,
}

/// `READY` dispatch
#[derive(Debug, Clone, Deserialize)]
pub struct Ready {
    pub user: DiscordUser,
    pub session_id: String,
    pub application: PartialApplication,
    #[serde(default)]
    pub guilds: Vec<UnavailableGuild>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartialGuild {
    pub id: String,
    pub name: String,
}

impl From<PartialGuild> for Guild {
    fn from(g: PartialGuild) -> Self {
        Guild::new(g.id, g.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMember {
    #[serde(default)]
    pub user: Option<DiscordUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawOption {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCommandData {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default = "chat_input")]
    pub kind: u8,
    #[serde(default)]
    pub options: Vec<RawOption>,
}

fn chat_input() -> u8 {
    1
}

/// `INTERACTION_CREATE` dispatch
#[derive(Debug, Clone, Deserialize)]
pub struct RawInteraction {
    pub id: String,
    pub application_id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    pub token: String,
    #[serde(default)]
    pub data: Option<RawCommandData>,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub member: Option<RawMember>,
    #[serde(default)]
    pub user: Option<DiscordUser>,
}

impl From<RawInteraction> for Interaction {
    fn from(raw: RawInteraction) -> Self {
        let kind = InteractionKind::from_code(raw.kind);
        // Guild invocations carry the user inside `member`, DMs at the top level.
        let user = raw.member.and_then(|m| m.user).or(raw.user).map(User::from);
        let data = raw.data.map(|d| CommandData {
            id: d.id,
            name: d.name,
            kind: CommandKind::from_code(d.kind),
            options: d
                .options
                .into_iter()
                .filter_map(|o| {
                    o.value.map(|value| CommandArgument { name: o.name, value })
                })
                .collect(),
        });

        let mut interaction = Interaction::new(raw.id, raw.token, kind).with_platform("discord");
        interaction.application_id = raw.application_id;
        interaction.guild_id = raw.guild_id;
        interaction.channel_id = raw.channel_id;
        interaction.user = user;
        interaction.data = data;
        interaction
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationCommandOption {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: u8,
    pub required: bool,
}

/// Body item for `PUT /applications/{id}/commands`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationCommand {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ApplicationCommandOption>,
}

impl From<&Command> for ApplicationCommand {
    fn from(cmd: &Command) -> Self {
        Self {
            name: cmd.name.clone(),
            description: cmd.description.clone(),
            options: cmd
                .options
                .iter()
                .map(|o| ApplicationCommandOption {
                    name: o.name.clone(),
                    description: o.description.clone(),
                    kind: o.kind.code(),
                    required: o.required,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationCommandResponse {
    pub id: String,
    pub name: String,
}

impl From<ApplicationCommandResponse> for RegisteredCommand {
    fn from(c: ApplicationCommandResponse) -> Self {
        RegisteredCommand { id: c.id, name: c.name }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    pub data: InteractionResponseData,
}

#[derive(Debug, Clone, Serialize)]
pub struct InteractionResponseData {
    pub content: String,
}

impl InteractionResponse {
    pub fn message(content: impl Into<String>) -> Self {
        Self {
            kind: CHANNEL_MESSAGE_WITH_SOURCE,
            data: InteractionResponseData {
                content: content.into(),
            },
        }
    }
}
