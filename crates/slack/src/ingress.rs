//! Envelope pump between a Slack connection and the [`EventDispatcher`].
//!
//! Connectivity is owned by an [`EnvelopeSource`]. Every envelope is acknowledged before it is
//! dispatched; Slack redelivers anything left unacknowledged for three seconds.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::events::{EventContext, EventDispatcher, HandlerResult, SlackEnvelope, SlackEvent};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("envelope source read failed: {0}")]
    Receive(String),
    #[error("envelope acknowledgement failed: {0}")]
    Acknowledge(String),
}

#[async_trait]
pub trait EnvelopeSource: Send + Sync {
    /// The next envelope, or `None` once the connection has closed for good.
    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, SourceError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), SourceError>;
}

/// Source for deployments without a Slack connection. It closes immediately.
#[derive(Clone, Copy, Debug, Default)]
pub struct DetachedSource;

#[async_trait]
impl EnvelopeSource for DetachedSource {
    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, SourceError> {
        Ok(None)
    }

    async fn acknowledge(&self, _envelope_id: &str) -> Result<(), SourceError> {
        Ok(())
    }
}

/// What one run of the pump saw.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngressSummary {
    pub commands: usize,
    pub clicks: usize,
    pub ignored: usize,
    pub failed: usize,
}

impl IngressSummary {
    pub fn total(&self) -> usize {
        self.commands + self.clicks + self.ignored + self.failed
    }
}

pub struct SlackIngress {
    source: Arc<dyn EnvelopeSource>,
    dispatcher: EventDispatcher,
}

impl SlackIngress {
    pub fn new(source: Arc<dyn EnvelopeSource>, dispatcher: EventDispatcher) -> Self {
        Self { source, dispatcher }
    }

    /// Pumps envelopes until the source closes. A read failure ends the run; reconnecting is
    /// the source's job.
    pub async fn run(&self) -> Result<IngressSummary, SourceError> {
        let mut summary = IngressSummary::default();

        while let Some(envelope) = self.source.next_envelope().await? {
            let user_id = envelope_user(&envelope).unwrap_or("unknown");
            let reply_id = envelope_reply(&envelope).unwrap_or("none");
            debug!(
                event_name = "ingress.slack.envelope_received",
                correlation_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                user_id,
                reply_id,
                "received slack envelope"
            );

            if let Err(error) = self.source.acknowledge(&envelope.envelope_id).await {
                warn!(
                    event_name = "ingress.slack.ack_failed",
                    correlation_id = %envelope.envelope_id,
                    user_id,
                    reply_id,
                    error = %error,
                    "failed to acknowledge slack envelope"
                );
            }

            let context = EventContext { correlation_id: envelope.envelope_id.clone() };
            match self.dispatcher.dispatch(&envelope, &context).await {
                Ok(HandlerResult::Ignored) => {
                    summary.ignored += 1;
                    debug!(
                        event_name = "ingress.slack.ignored",
                        correlation_id = %envelope.envelope_id,
                        user_id,
                        reply_id,
                        "slack envelope ignored"
                    );
                }
                Ok(_) => match envelope.event {
                    SlackEvent::BlockAction(_) => summary.clicks += 1,
                    _ => summary.commands += 1,
                },
                Err(error) => {
                    summary.failed += 1;
                    warn!(
                        event_name = "ingress.slack.dispatch_failed",
                        correlation_id = %envelope.envelope_id,
                        user_id,
                        reply_id,
                        error = %error,
                        "slack envelope dispatch failed"
                    );
                }
            }
        }

        info!(
            event_name = "ingress.slack.closed",
            commands = summary.commands,
            clicks = summary.clicks,
            ignored = summary.ignored,
            failed = summary.failed,
            "slack envelope source closed"
        );
        Ok(summary)
    }
}

fn envelope_user(envelope: &SlackEnvelope) -> Option<&str> {
    match &envelope.event {
        SlackEvent::SlashCommand(payload) => Some(payload.user_id.as_str()),
        SlackEvent::BlockAction(action) => Some(action.user_id.as_str()),
        SlackEvent::Unsupported { .. } => None,
    }
}

// Clicks carry the reply id as the button value.
fn envelope_reply(envelope: &SlackEnvelope) -> Option<&str> {
    match &envelope.event {
        SlackEvent::BlockAction(action) => action.value.as_deref(),
        _ => None,
    }
}
