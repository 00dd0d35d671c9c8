use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteKind {
    /// "Smash".
    Approve,
    /// "Pass".
    Reject,
}

impl VoteKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Approve => "smash",
            Self::Reject => "pass",
        }
    }
}

/// Aggregate counters for one item. Both counters only ever grow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub approve: u64,
    pub reject: u64,
}

impl VoteTally {
    pub fn new(approve: u64, reject: u64) -> Self {
        Self { approve, reject }
    }

    pub fn total(&self) -> u64 {
        self.approve.saturating_add(self.reject)
    }

    pub fn record(&mut self, kind: VoteKind) {
        match kind {
            VoteKind::Approve => self.approve = self.approve.saturating_add(1),
            VoteKind::Reject => self.reject = self.reject.saturating_add(1),
        }
    }
}
