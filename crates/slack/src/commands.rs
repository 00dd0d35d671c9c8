use async_trait::async_trait;
use thiserror::Error;

use crate::blocks::{self, MessageTemplate};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub command: String,
    pub text: String,
    pub channel_id: String,
    pub user_id: String,
    pub trigger_ts: String,
    pub request_id: String,
    pub response_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandEnvelope {
    pub command: String,
    pub args: String,
    pub payload: SlashCommandPayload,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotCommand {
    Smash,
    Ping,
    Invite,
    Help,
    Unknown { command: String },
}

/// What a command produced: a message still to be sent, or a reply the service already
/// delivered through its own surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandReply {
    Message(MessageTemplate),
    Delivered,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("slash command name is missing")]
    MissingCommand,
    #[error("slash command `{0}` has no response_url")]
    MissingResponseUrl(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("command service failed: {0}")]
    Service(String),
}

pub fn normalize_bot_command(
    payload: SlashCommandPayload,
) -> Result<CommandEnvelope, CommandParseError> {
    let command = payload.command.trim().trim_start_matches('/').to_ascii_lowercase();
    if command.is_empty() {
        return Err(CommandParseError::MissingCommand);
    }
    if payload.response_url.trim().is_empty() {
        return Err(CommandParseError::MissingResponseUrl(command));
    }

    let args = payload.text.trim().to_owned();
    Ok(CommandEnvelope { command, args, payload })
}

pub fn parse_bot_command(command: &str, args: &str) -> BotCommand {
    match (command, args.trim().to_ascii_lowercase().as_str()) {
        (_, "help") => BotCommand::Help,
        ("smash", _) => BotCommand::Smash,
        ("ping", _) => BotCommand::Ping,
        ("invite", _) => BotCommand::Invite,
        ("help", _) => BotCommand::Help,
        (other, _) => BotCommand::Unknown { command: other.to_owned() },
    }
}

pub struct CommandRouter<S> {
    service: S,
}

impl<S> CommandRouter<S>
where
    S: BotCommandService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub async fn route(&self, envelope: CommandEnvelope) -> Result<CommandReply, CommandRouteError> {
        match parse_bot_command(&envelope.command, &envelope.args) {
            BotCommand::Smash => self.service.start_session(&envelope).await,
            BotCommand::Ping => self.service.ping(&envelope).await,
            BotCommand::Invite => self.service.invite(&envelope).await,
            BotCommand::Help => Ok(CommandReply::Message(blocks::help_message())),
            BotCommand::Unknown { command } => Ok(CommandReply::Message(blocks::error_message(
                &format!("Unsupported command `/{command}`. Try `/smash help`."),
                &envelope.payload.request_id,
            ))),
        }
    }
}

#[async_trait]
pub trait BotCommandService: Send + Sync {
    async fn start_session(
        &self,
        envelope: &CommandEnvelope,
    ) -> Result<CommandReply, CommandRouteError>;

    async fn ping(&self, envelope: &CommandEnvelope) -> Result<CommandReply, CommandRouteError>;

    async fn invite(&self, envelope: &CommandEnvelope) -> Result<CommandReply, CommandRouteError>;
}
