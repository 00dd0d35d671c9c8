use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use crate::blocks::{error_message, invite_message, pinging_message, pong_message};
use crate::commands::{BotCommandService, CommandEnvelope, CommandReply, CommandRouteError};
use crate::session::SessionController;
use crate::surface::SurfaceFactory;

/// Command service backing the bot's slash commands.
pub struct GameCommandService {
    controller: Arc<SessionController>,
    surfaces: Arc<dyn SurfaceFactory>,
    invite_url: Option<String>,
}

impl GameCommandService {
    pub fn new(
        controller: Arc<SessionController>,
        surfaces: Arc<dyn SurfaceFactory>,
        invite_url: Option<String>,
    ) -> Self {
        Self { controller, surfaces, invite_url }
    }
}

#[async_trait]
impl BotCommandService for GameCommandService {
    async fn start_session(
        &self,
        envelope: &CommandEnvelope,
    ) -> Result<CommandReply, CommandRouteError> {
        let controller = Arc::clone(&self.controller);
        let surface = self.surfaces.for_command(&envelope.payload);
        let user_id = envelope.payload.user_id.clone();
        let request_id = envelope.payload.request_id.clone();

        tokio::spawn(async move {
            if let Err(error) = controller.run(&user_id, surface).await {
                warn!(
                    event_name = "session.aborted",
                    request_id = %request_id,
                    user_id = %user_id,
                    error = %error,
                    "session stopped because its reply could not be delivered"
                );
            }
        });

        Ok(CommandReply::Delivered)
    }

    async fn ping(&self, envelope: &CommandEnvelope) -> Result<CommandReply, CommandRouteError> {
        let surface = self.surfaces.for_command(&envelope.payload);
        let bot_latency_ms =
            latency_since(&envelope.payload.trigger_ts, Utc::now().timestamp_millis());

        let sent_at = Instant::now();
        surface
            .send_private(&pinging_message())
            .await
            .map_err(|error| CommandRouteError::Service(error.to_string()))?;
        let round_trip_ms = sent_at.elapsed().as_millis();

        surface
            .edit(&pong_message(bot_latency_ms, round_trip_ms))
            .await
            .map_err(|error| CommandRouteError::Service(error.to_string()))?;

        info!(
            event_name = "bot.ping.answered",
            request_id = %envelope.payload.request_id,
            bot_latency_ms,
            round_trip_ms = u64::try_from(round_trip_ms).unwrap_or(u64::MAX),
            "ping answered"
        );
        Ok(CommandReply::Delivered)
    }

    async fn invite(&self, envelope: &CommandEnvelope) -> Result<CommandReply, CommandRouteError> {
        match &self.invite_url {
            Some(url) => Ok(CommandReply::Message(invite_message(url))),
            None => Ok(CommandReply::Message(error_message(
                "No invite link is configured for this bot.",
                &envelope.payload.request_id,
            ))),
        }
    }
}

/// Milliseconds between a Slack `ts` value ("seconds.micros") and `now_ms`.
fn latency_since(trigger_ts: &str, now_ms: i64) -> Option<i64> {
    let seconds: f64 = trigger_ts.trim().parse().ok()?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }
    let trigger_ms = (seconds * 1_000.0).round() as i64;
    Some(now_ms.saturating_sub(trigger_ms).max(0))
}
