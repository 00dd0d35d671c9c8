use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::blocks::MessageTemplate;
use crate::commands::SlashCommandPayload;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ReplyError {
    #[error("reply transport failed: {0}")]
    Transport(String),
    #[error("slack rejected reply with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("reply was edited before it was sent")]
    NotSent,
}

/// The one reply a command owns. It is sent once, privately, and edited in place afterwards.
#[async_trait]
pub trait ResponseSurface: Send + Sync {
    async fn send_private(&self, message: &MessageTemplate) -> Result<(), ReplyError>;
    async fn edit(&self, message: &MessageTemplate) -> Result<(), ReplyError>;

    /// Points later edits at a fresher endpoint, such as the `response_url` of a click.
    fn retarget(&self, _response_url: &str) {}
}

pub trait SurfaceFactory: Send + Sync {
    fn for_command(&self, payload: &SlashCommandPayload) -> Arc<dyn ResponseSurface>;
}

/// Posts to a Slack `response_url`.
pub struct ResponseUrlSurface {
    client: reqwest::Client,
    target: Mutex<String>,
    sent: AtomicBool,
}

impl ResponseUrlSurface {
    pub fn new(client: reqwest::Client, response_url: impl Into<String>) -> Self {
        Self { client, target: Mutex::new(response_url.into()), sent: AtomicBool::new(false) }
    }

    fn current_target(&self) -> String {
        self.target.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    async fn post(&self, body: Value) -> Result<(), ReplyError> {
        let target = self.current_target();
        let response = self
            .client
            .post(&target)
            .json(&body)
            .send()
            .await
            .map_err(|error| ReplyError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReplyError::Rejected { status: status.as_u16(), body });
        }

        debug!(event_name = "egress.slack.reply_posted", status = status.as_u16(), "reply posted");
        Ok(())
    }
}

#[async_trait]
impl ResponseSurface for ResponseUrlSurface {
    async fn send_private(&self, message: &MessageTemplate) -> Result<(), ReplyError> {
        self.post(ephemeral_body(message)?).await?;
        self.sent.store(true, Ordering::Release);
        Ok(())
    }

    async fn edit(&self, message: &MessageTemplate) -> Result<(), ReplyError> {
        if !self.sent.load(Ordering::Acquire) {
            return Err(ReplyError::NotSent);
        }
        self.post(replace_body(message)?).await
    }

    fn retarget(&self, response_url: &str) {
        *self.target.lock().unwrap_or_else(PoisonError::into_inner) = response_url.to_owned();
    }
}

fn message_body(message: &MessageTemplate) -> Result<Value, ReplyError> {
    serde_json::to_value(message).map_err(|error| ReplyError::Transport(error.to_string()))
}

fn ephemeral_body(message: &MessageTemplate) -> Result<Value, ReplyError> {
    let mut body = message_body(message)?;
    body["response_type"] = json!("ephemeral");
    Ok(body)
}

fn replace_body(message: &MessageTemplate) -> Result<Value, ReplyError> {
    let mut body = message_body(message)?;
    body["replace_original"] = json!(true);
    Ok(body)
}

pub struct ResponseUrlSurfaceFactory {
    client: reqwest::Client,
}

impl ResponseUrlSurfaceFactory {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl SurfaceFactory for ResponseUrlSurfaceFactory {
    fn for_command(&self, payload: &SlashCommandPayload) -> Arc<dyn ResponseSurface> {
        Arc::new(ResponseUrlSurface::new(self.client.clone(), payload.response_url.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::{ephemeral_body, replace_body, ReplyError, ResponseSurface, ResponseUrlSurface};
    use crate::blocks::pinging_message;

    #[test]
    fn first_reply_is_ephemeral_and_edits_replace_it() {
        let message = pinging_message();

        let sent = ephemeral_body(&message).expect("ephemeral body");
        let edited = replace_body(&message).expect("replace body");

        assert_eq!(sent["response_type"], "ephemeral");
        assert_eq!(sent["text"], "...Pinging!");
        assert!(sent.get("replace_original").is_none());
        assert_eq!(edited["replace_original"], true);
        assert!(edited.get("response_type").is_none());
    }

    #[tokio::test]
    async fn editing_before_sending_is_rejected_without_network() {
        let surface =
            ResponseUrlSurface::new(reqwest::Client::new(), "https://hooks.slack.com/commands/x");

        let result = surface.edit(&pinging_message()).await;

        assert_eq!(result, Err(ReplyError::NotSent));
    }

    #[test]
    fn retarget_switches_the_endpoint_for_later_posts() {
        let surface =
            ResponseUrlSurface::new(reqwest::Client::new(), "https://hooks.slack.com/commands/x");

        surface.retarget("https://hooks.slack.com/actions/y");

        assert_eq!(surface.current_target(), "https://hooks.slack.com/actions/y");
    }
}
