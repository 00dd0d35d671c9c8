use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use smashbot_core::config::SessionConfig;
use smashbot_core::session::{
    reduce, start, Effect, EndReason, IgnoreReason, Session, SessionEvent, SessionView,
};
use smashbot_core::{Catalog, ItemKey, StoreError, VoteKind, VoteStore, VoteTally};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::blocks::session_message;
use crate::collector::{CollectorRegistry, Subscription, SubscriptionEvent};
use crate::surface::{ReplyError, ResponseSurface};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionSettings {
    pub idle_timeout: Duration,
    pub store_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self { idle_timeout: Duration::from_secs(30), store_timeout: Duration::from_secs(3) }
    }
}

impl From<&SessionConfig> for SessionSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
            store_timeout: Duration::from_millis(config.store_timeout_ms),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionReport {
    pub reason: EndReason,
    pub rounds: u32,
    pub votes_recorded: u32,
}

/// Drives one interactive session from the first reply to its final message.
pub struct SessionController {
    catalog: Arc<Catalog>,
    store: Arc<dyn VoteStore>,
    registry: Arc<CollectorRegistry>,
    settings: SessionSettings,
}

impl SessionController {
    pub fn new(
        catalog: Arc<Catalog>,
        store: Arc<dyn VoteStore>,
        registry: Arc<CollectorRegistry>,
        settings: SessionSettings,
    ) -> Self {
        Self { catalog, store, registry, settings }
    }

    pub async fn run(
        &self,
        user_id: &str,
        surface: Arc<dyn ResponseSurface>,
    ) -> Result<SessionReport, ReplyError> {
        let mut rng = StdRng::from_entropy();
        let item = self.catalog.pick_random(&mut rng).clone();
        let (session, view) = start(user_id, item);
        let reply_id = format!("reply.{}", Uuid::new_v4().simple());

        let mut subscription =
            self.registry.subscribe(reply_id.clone(), user_id, self.settings.idle_timeout);
        surface.send_private(&session_message(&view, &reply_id)).await?;

        info!(
            event_name = "session.started",
            user_id,
            reply_id = %reply_id,
            item_key = %session.item_key(),
            "session started"
        );

        let mut run = ActiveSession { session, votes_recorded: 0, surface, reply_id };
        let reason = loop {
            let event = match subscription.next().await {
                SubscriptionEvent::Click(click) => {
                    if !run.session.accepts(&click.token) {
                        debug!(
                            event_name = "session.click.stale",
                            reply_id = %run.reply_id,
                            token = %click.token,
                            phase = ?run.session.phase,
                            "dropping click on a control the current view does not offer"
                        );
                        continue;
                    }
                    subscription.reset_timer();
                    if let Some(response_url) = &click.response_url {
                        run.surface.retarget(response_url);
                    }
                    SessionEvent::Click(click.token)
                }
                SubscriptionEvent::IdleTimeout => SessionEvent::IdleTimeout,
                SubscriptionEvent::Closed => SessionEvent::Terminate,
            };

            match self.step(&mut run, event, &mut rng, &mut subscription).await {
                Ok(Some(reason)) => break reason,
                Ok(None) => {}
                Err(reply_error) => {
                    error!(
                        event_name = "session.render_failed",
                        reply_id = %run.reply_id,
                        error = %reply_error,
                        "could not update session reply; tearing session down"
                    );
                    return Err(reply_error);
                }
            }
        };
        subscription.cancel();

        let report = SessionReport {
            reason,
            rounds: run.session.round,
            votes_recorded: run.votes_recorded,
        };
        info!(
            event_name = "session.ended",
            reply_id = %run.reply_id,
            reason = reason.as_str(),
            rounds = report.rounds,
            votes_recorded = report.votes_recorded,
            "session ended"
        );
        Ok(report)
    }

    /// Applies one event and carries out its effect. Returns the end reason once the session
    /// has rendered its final message.
    async fn step(
        &self,
        run: &mut ActiveSession,
        event: SessionEvent,
        rng: &mut StdRng,
        subscription: &mut Subscription,
    ) -> Result<Option<EndReason>, ReplyError> {
        let mut next = Some(event);
        while let Some(event) = next.take() {
            let transition = reduce(run.session.clone(), event, &self.catalog, rng);
            run.session = transition.session;

            match transition.effect {
                Effect::Render(view) => run.render(&view).await?,
                Effect::RecordVote { item_key, kind } => {
                    next = Some(self.record_vote(run, &item_key, kind).await);
                    // Time spent on the store does not count against the user.
                    subscription.reset_timer();
                }
                Effect::Finish { reason, view } => {
                    run.render(&view).await?;
                    return Ok(Some(reason));
                }
                Effect::Ignore(reason) => log_ignored(&run.session, &reason),
            }
        }
        Ok(None)
    }

    async fn record_vote(
        &self,
        run: &mut ActiveSession,
        item_key: &ItemKey,
        kind: VoteKind,
    ) -> SessionEvent {
        match self.increment_and_read(item_key, kind).await {
            Ok(tally) => {
                run.votes_recorded = run.votes_recorded.saturating_add(1);
                info!(
                    event_name = "session.vote.recorded",
                    reply_id = %run.reply_id,
                    item_key = %item_key,
                    vote = kind.label(),
                    approve = tally.approve,
                    reject = tally.reject,
                    "vote recorded"
                );
                SessionEvent::VoteRecorded { kind, tally }
            }
            Err(store_error) => {
                error!(
                    event_name = "session.vote.store_failed",
                    reply_id = %run.reply_id,
                    item_key = %item_key,
                    vote = kind.label(),
                    error = %store_error,
                    "vote store failed; ending session"
                );
                SessionEvent::VoteFailed
            }
        }
    }

    async fn increment_and_read(
        &self,
        item_key: &ItemKey,
        kind: VoteKind,
    ) -> Result<VoteTally, StoreError> {
        self.bounded("increment", self.store.increment(item_key, kind)).await?;
        self.bounded("read", self.store.read(item_key)).await
    }

    async fn bounded<T, F>(&self, operation: &'static str, future: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.settings.store_timeout, future).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                operation,
                timeout_ms: u64::try_from(self.settings.store_timeout.as_millis())
                    .unwrap_or(u64::MAX),
            }),
        }
    }
}

struct ActiveSession {
    session: Session,
    votes_recorded: u32,
    surface: Arc<dyn ResponseSurface>,
    reply_id: String,
}

impl ActiveSession {
    async fn render(&self, view: &SessionView) -> Result<(), ReplyError> {
        self.surface.edit(&session_message(view, &self.reply_id)).await
    }
}

fn log_ignored(session: &Session, reason: &IgnoreReason) {
    match reason {
        IgnoreReason::StaleControl | IgnoreReason::AtBoundary => {
            debug!(event_name = "session.event.ignored", reason = ?reason, "event ignored");
        }
        _ => {
            warn!(
                event_name = "session.event.ignored",
                phase = ?session.phase,
                reason = ?reason,
                "event ignored"
            );
        }
    }
}
