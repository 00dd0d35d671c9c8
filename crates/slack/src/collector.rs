use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use smashbot_core::session::ControlToken;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClickEvent {
    pub user_id: String,
    pub token: ControlToken,
    pub response_url: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteOutcome {
    Delivered,
    /// The click came from someone other than the session owner.
    Unauthorized,
    NoSubscriber,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubscriptionEvent {
    Click(ClickEvent),
    IdleTimeout,
    /// The registry shut down; no more clicks will arrive.
    Closed,
}

struct SubscriberEntry {
    id: u64,
    owner: String,
    sender: mpsc::UnboundedSender<ClickEvent>,
}

/// Routes button clicks to the session that owns the clicked reply.
#[derive(Default)]
pub struct CollectorRegistry {
    subscribers: Mutex<HashMap<String, SubscriberEntry>>,
    next_id: AtomicU64,
    live: AtomicUsize,
}

impl CollectorRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers interest in clicks on `reply_id` from `owner`. The subscription detaches when
    /// dropped or cancelled; a later subscription on the same reply replaces it.
    pub fn subscribe(
        self: &Arc<Self>,
        reply_id: impl Into<String>,
        owner: impl Into<String>,
        idle_timeout: Duration,
    ) -> Subscription {
        let reply_id = reply_id.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();
        self.lock().insert(reply_id.clone(), SubscriberEntry { id, owner: owner.into(), sender });
        self.live.fetch_add(1, Ordering::AcqRel);

        Subscription {
            id,
            reply_id,
            receiver,
            idle_timeout,
            deadline: Instant::now() + idle_timeout,
            registry: Arc::clone(self),
        }
    }

    pub fn route(&self, reply_id: &str, click: ClickEvent) -> RouteOutcome {
        let mut subscribers = self.lock();
        let Some(entry) = subscribers.get(reply_id) else {
            return RouteOutcome::NoSubscriber;
        };
        if entry.owner != click.user_id {
            debug!(
                event_name = "session.click.unauthorized",
                reply_id,
                user_id = %click.user_id,
                "dropping click from non-owner"
            );
            return RouteOutcome::Unauthorized;
        }

        if entry.sender.send(click).is_err() {
            subscribers.remove(reply_id);
            return RouteOutcome::NoSubscriber;
        }
        RouteOutcome::Delivered
    }

    /// Subscriptions that can still receive clicks.
    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    /// Subscriptions not yet dropped, including ones closed by [`Self::close_all`] whose
    /// sessions are still rendering their final message.
    pub fn live_count(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Drops every sender so live sessions observe [`SubscriptionEvent::Closed`].
    pub fn close_all(&self) {
        self.lock().clear();
    }

    fn detach(&self, reply_id: &str, id: u64) {
        self.live.fetch_sub(1, Ordering::AcqRel);
        let mut subscribers = self.lock();
        if subscribers.get(reply_id).is_some_and(|entry| entry.id == id) {
            subscribers.remove(reply_id);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SubscriberEntry>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct Subscription {
    id: u64,
    reply_id: String,
    receiver: mpsc::UnboundedReceiver<ClickEvent>,
    idle_timeout: Duration,
    deadline: Instant,
    registry: Arc<CollectorRegistry>,
}

impl Subscription {
    pub fn reply_id(&self) -> &str {
        &self.reply_id
    }

    /// Waits for the next click, or reports that the idle window elapsed first.
    pub async fn next(&mut self) -> SubscriptionEvent {
        match tokio::time::timeout_at(self.deadline, self.receiver.recv()).await {
            Ok(Some(click)) => SubscriptionEvent::Click(click),
            Ok(None) => SubscriptionEvent::Closed,
            Err(_) => SubscriptionEvent::IdleTimeout,
        }
    }

    pub fn reset_timer(&mut self) {
        self.deadline = Instant::now() + self.idle_timeout;
    }

    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.detach(&self.reply_id, self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use smashbot_core::session::ControlToken;

    use super::{ClickEvent, CollectorRegistry, RouteOutcome, SubscriptionEvent};

    fn click(user_id: &str, token: &str) -> ClickEvent {
        ClickEvent {
            user_id: user_id.to_owned(),
            token: ControlToken(token.to_owned()),
            response_url: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn owner_clicks_are_delivered_and_others_dropped() {
        let registry = CollectorRegistry::new();
        let mut subscription = registry.subscribe("reply-1", "U1", Duration::from_secs(30));

        assert_eq!(registry.route("reply-1", click("U2", "smash.a")), RouteOutcome::Unauthorized);
        assert_eq!(registry.route("reply-1", click("U1", "smash.b")), RouteOutcome::Delivered);
        assert_eq!(registry.route("reply-9", click("U1", "smash.c")), RouteOutcome::NoSubscriber);

        assert_eq!(subscription.next().await, SubscriptionEvent::Click(click("U1", "smash.b")));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_window_elapses_without_clicks() {
        let registry = CollectorRegistry::new();
        let mut subscription = registry.subscribe("reply-1", "U1", Duration::from_secs(30));

        let started = tokio::time::Instant::now();
        assert_eq!(subscription.next().await, SubscriptionEvent::IdleTimeout);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(30) && waited < Duration::from_secs(31));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_timer_extends_the_deadline_from_now() {
        let registry = CollectorRegistry::new();
        let mut subscription = registry.subscribe("reply-1", "U1", Duration::from_secs(30));
        let started = tokio::time::Instant::now();

        tokio::time::advance(Duration::from_secs(20)).await;
        subscription.reset_timer();

        assert_eq!(subscription.next().await, SubscriptionEvent::IdleTimeout);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(50) && waited < Duration::from_secs(51));
    }

    #[tokio::test]
    async fn dropping_subscription_detaches_it() {
        let registry = CollectorRegistry::new();
        let subscription = registry.subscribe("reply-1", "U1", Duration::from_secs(30));
        assert_eq!(registry.active_count(), 1);

        subscription.cancel();

        assert_eq!(registry.active_count(), 0);
        assert_eq!(registry.route("reply-1", click("U1", "smash.a")), RouteOutcome::NoSubscriber);
    }

    #[tokio::test]
    async fn close_all_ends_live_subscriptions() {
        let registry = CollectorRegistry::new();
        let mut subscription = registry.subscribe("reply-1", "U1", Duration::from_secs(30));

        registry.close_all();

        assert_eq!(subscription.next().await, SubscriptionEvent::Closed);
        assert_eq!(registry.active_count(), 0);
        assert_eq!(registry.live_count(), 1);
        drop(subscription);
        assert_eq!(registry.live_count(), 0);
    }
}
