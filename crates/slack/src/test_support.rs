use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use smashbot_core::{ItemKey, StoreError, VoteKind, VoteStore, VoteTally};

use crate::blocks::{MessageTemplate, TextObject};
use crate::commands::SlashCommandPayload;
use crate::surface::{ReplyError, ResponseSurface, SurfaceFactory};

pub fn slash_payload(command: &str, user_id: &str) -> SlashCommandPayload {
    SlashCommandPayload {
        command: command.to_owned(),
        text: String::new(),
        channel_id: "C1".to_owned(),
        user_id: user_id.to_owned(),
        trigger_ts: "1700000000.000100".to_owned(),
        request_id: "req-1".to_owned(),
        response_url: "https://hooks.slack.com/commands/T/1".to_owned(),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Posted {
    Sent(MessageTemplate),
    Edited(MessageTemplate),
}

impl Posted {
    pub fn message(&self) -> &MessageTemplate {
        match self {
            Self::Sent(message) | Self::Edited(message) => message,
        }
    }
}

/// Keeps every message posted to it, in order.
#[derive(Default)]
pub struct RecordingSurface {
    posts: Mutex<Vec<Posted>>,
    targets: Mutex<Vec<String>>,
}

impl RecordingSurface {
    pub fn posts(&self) -> Vec<Posted> {
        self.posts.lock().expect("posts lock").clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.posts().iter().map(|posted| posted.message().fallback_text.clone()).collect()
    }

    pub fn last_text(&self) -> Option<String> {
        self.texts().pop()
    }

    pub fn last_message(&self) -> Option<MessageTemplate> {
        self.posts().pop().map(|posted| posted.message().clone())
    }

    pub fn last_button_count(&self) -> usize {
        self.last_message().map(|message| message.buttons().count()).unwrap_or_default()
    }

    /// Reply id carried by the buttons of the most recent message that had any.
    pub fn last_reply_id(&self) -> Option<String> {
        self.posts()
            .iter()
            .rev()
            .find_map(|posted| posted.message().buttons().find_map(|button| button.value.clone()))
    }

    pub fn token_for_label(&self, label: &str) -> Option<String> {
        let message = self.last_message()?;
        let token = message
            .buttons()
            .find(|button| matches!(&button.text, TextObject::Plain { text } if text == label))
            .map(|button| button.action_id.clone());
        token
    }

    pub fn targets(&self) -> Vec<String> {
        self.targets.lock().expect("targets lock").clone()
    }
}

#[async_trait]
impl ResponseSurface for RecordingSurface {
    async fn send_private(&self, message: &MessageTemplate) -> Result<(), ReplyError> {
        self.posts.lock().expect("posts lock").push(Posted::Sent(message.clone()));
        Ok(())
    }

    async fn edit(&self, message: &MessageTemplate) -> Result<(), ReplyError> {
        let mut posts = self.posts.lock().expect("posts lock");
        if !posts.iter().any(|posted| matches!(posted, Posted::Sent(_))) {
            return Err(ReplyError::NotSent);
        }
        posts.push(Posted::Edited(message.clone()));
        Ok(())
    }

    fn retarget(&self, response_url: &str) {
        self.targets.lock().expect("targets lock").push(response_url.to_owned());
    }
}

/// Hands out one [`RecordingSurface`] per command and remembers them.
#[derive(Default)]
pub struct RecordingSurfaces {
    surfaces: Mutex<Vec<Arc<RecordingSurface>>>,
}

impl RecordingSurfaces {
    pub fn surfaces(&self) -> Vec<Arc<RecordingSurface>> {
        self.surfaces.lock().expect("surfaces lock").clone()
    }

    /// Fallback text of every first reply, across all surfaces handed out.
    pub fn sent_texts(&self) -> Vec<String> {
        self.surfaces()
            .iter()
            .flat_map(|surface| surface.posts())
            .filter_map(|posted| match posted {
                Posted::Sent(message) => Some(message.fallback_text),
                Posted::Edited(_) => None,
            })
            .collect()
    }
}

impl SurfaceFactory for RecordingSurfaces {
    fn for_command(&self, _payload: &SlashCommandPayload) -> Arc<dyn ResponseSurface> {
        let surface = Arc::new(RecordingSurface::default());
        self.surfaces.lock().expect("surfaces lock").push(Arc::clone(&surface));
        surface
    }
}

/// Rejects every call with a database error.
pub struct FailingStore;

#[async_trait]
impl VoteStore for FailingStore {
    async fn increment(&self, _key: &ItemKey, _kind: VoteKind) -> Result<(), StoreError> {
        Err(StoreError::Database("disk I/O error".to_owned()))
    }

    async fn read(&self, _key: &ItemKey) -> Result<VoteTally, StoreError> {
        Err(StoreError::Database("disk I/O error".to_owned()))
    }

    async fn ensure_exists(&self, _key: &ItemKey) -> Result<(), StoreError> {
        Err(StoreError::Database("disk I/O error".to_owned()))
    }

    async fn list(&self) -> Result<Vec<(ItemKey, VoteTally)>, StoreError> {
        Err(StoreError::Database("disk I/O error".to_owned()))
    }
}

/// Never completes a write.
pub struct StallingStore;

#[async_trait]
impl VoteStore for StallingStore {
    async fn increment(&self, _key: &ItemKey, _kind: VoteKind) -> Result<(), StoreError> {
        std::future::pending().await
    }

    async fn read(&self, _key: &ItemKey) -> Result<VoteTally, StoreError> {
        std::future::pending().await
    }

    async fn ensure_exists(&self, _key: &ItemKey) -> Result<(), StoreError> {
        Ok(())
    }

    async fn list(&self) -> Result<Vec<(ItemKey, VoteTally)>, StoreError> {
        Ok(Vec::new())
    }
}
