use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::item::{Item, ItemKey};
use crate::domain::vote::{VoteKind, VoteTally};
use crate::session::view::SessionView;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Browsing,
    Voted,
    Ended,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlAction {
    PreviousPage,
    NextPage,
    Vote(VoteKind),
    PlayAgain,
    Quit,
}

impl ControlAction {
    pub const ALL: [ControlAction; 6] = [
        ControlAction::PreviousPage,
        ControlAction::NextPage,
        ControlAction::Vote(VoteKind::Approve),
        ControlAction::Vote(VoteKind::Reject),
        ControlAction::PlayAgain,
        ControlAction::Quit,
    ];
}

/// Opaque identifier carried by a button and routed back to the issuing session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControlToken(pub String);

impl ControlToken {
    fn issue() -> Self {
        Self(format!("smash.{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ControlToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlBinding {
    pub item_key: ItemKey,
    pub action: ControlAction,
}

/// One token per action, issued for a single item and reissued whenever the item changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSet {
    item_key: ItemKey,
    previous_page: ControlToken,
    next_page: ControlToken,
    approve: ControlToken,
    reject: ControlToken,
    play_again: ControlToken,
    quit: ControlToken,
}

impl ControlSet {
    pub fn issue(item_key: &ItemKey) -> Self {
        Self {
            item_key: item_key.clone(),
            previous_page: ControlToken::issue(),
            next_page: ControlToken::issue(),
            approve: ControlToken::issue(),
            reject: ControlToken::issue(),
            play_again: ControlToken::issue(),
            quit: ControlToken::issue(),
        }
    }

    pub fn token_for(&self, action: ControlAction) -> &ControlToken {
        match action {
            ControlAction::PreviousPage => &self.previous_page,
            ControlAction::NextPage => &self.next_page,
            ControlAction::Vote(VoteKind::Approve) => &self.approve,
            ControlAction::Vote(VoteKind::Reject) => &self.reject,
            ControlAction::PlayAgain => &self.play_again,
            ControlAction::Quit => &self.quit,
        }
    }

    pub fn resolve(&self, token: &ControlToken) -> Option<ControlBinding> {
        ControlAction::ALL
            .into_iter()
            .find(|action| self.token_for(*action) == token)
            .map(|action| ControlBinding { item_key: self.item_key.clone(), action })
    }

    pub fn tokens(&self) -> impl Iterator<Item = &ControlToken> {
        ControlAction::ALL.into_iter().map(|action| self.token_for(action))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Quit,
    Idle,
    Error,
    Other,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quit => "quit",
            Self::Idle => "idle",
            Self::Error => "error",
            Self::Other => "other",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Idle => "You've timed out!",
            Self::Error => "Something went wrong! Please try again later.",
            Self::Quit | Self::Other => "Thanks for playing!",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub item: Item,
    pub page: usize,
    pub phase: Phase,
    pub controls: ControlSet,
    /// Vote accepted from a click and awaiting the store round trip.
    pub pending_vote: Option<VoteKind>,
    pub round: u32,
}

impl Session {
    pub fn item_key(&self) -> ItemKey {
        self.item.key()
    }

    pub fn page_count(&self) -> usize {
        self.item.page_count().max(1)
    }

    pub fn last_page(&self) -> usize {
        self.page_count() - 1
    }

    /// True when `token` is an enabled button of the view currently on screen. Tokens that
    /// resolve but are not drawn (a vote button after voting, a nav button at the edge) fail.
    pub fn accepts(&self, token: &ControlToken) -> bool {
        if self.phase == Phase::Ended || self.pending_vote.is_some() {
            return false;
        }
        let Some(binding) = self.controls.resolve(token) else {
            return false;
        };
        match (self.phase, binding.action) {
            (Phase::Browsing, ControlAction::PreviousPage) => self.page > 0,
            (Phase::Browsing, ControlAction::NextPage) => self.page < self.last_page(),
            (Phase::Browsing, ControlAction::Vote(_)) => true,
            (Phase::Voted, ControlAction::PlayAgain | ControlAction::Quit) => true,
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Click(ControlToken),
    VoteRecorded { kind: VoteKind, tally: VoteTally },
    VoteFailed,
    IdleTimeout,
    Terminate,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    StaleControl,
    NotAllowed { phase: Phase, action: ControlAction },
    AtBoundary,
    VotePending,
    NoPendingVote,
    Ended,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    Render(SessionView),
    RecordVote { item_key: ItemKey, kind: VoteKind },
    Finish { reason: EndReason, view: SessionView },
    Ignore(IgnoreReason),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub session: Session,
    pub effect: Effect,
}
