use crate::domain::vote::{VoteKind, VoteTally};
use crate::session::states::{ControlAction, ControlToken, EndReason, Session};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlTone {
    Neutral,
    Positive,
    Negative,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControlButton {
    pub token: ControlToken,
    pub action: ControlAction,
    pub label: &'static str,
    pub tone: ControlTone,
    pub enabled: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemCard {
    pub title: String,
    pub description: Option<String>,
    pub image_url: String,
    pub tally: Option<VoteTally>,
}

/// Everything a surface needs to draw one state of a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionView {
    /// The single line of plain text describing the session's state.
    pub content: String,
    pub card: Option<ItemCard>,
    pub controls: Vec<ControlButton>,
}

impl SessionView {
    pub fn control(&self, action: ControlAction) -> Option<&ControlButton> {
        self.controls.iter().find(|button| button.action == action)
    }

    pub fn has_controls(&self) -> bool {
        !self.controls.is_empty()
    }
}

pub fn browse_view(session: &Session) -> SessionView {
    let page_count = session.page_count();
    let page_number = session.page + 1;

    SessionView {
        content: format!(":eyes: Page {page_number} of {page_count}"),
        card: Some(ItemCard {
            title: format!("Would you smash the {}?", session.item.name),
            description: Some(format!("Page {page_number} of {page_count}")),
            image_url: current_image(session),
            tally: None,
        }),
        controls: vec![
            button(session, ControlAction::PreviousPage, session.page > 0),
            button(session, ControlAction::Vote(VoteKind::Approve), true),
            button(session, ControlAction::Vote(VoteKind::Reject), true),
            button(session, ControlAction::NextPage, session.page < session.last_page()),
        ],
    }
}

pub fn results_view(session: &Session, kind: VoteKind, tally: VoteTally) -> SessionView {
    SessionView {
        content: format!(
            "You voted {}! Smashes: {}, Passes: {}",
            kind.label(),
            tally.approve,
            tally.reject
        ),
        card: Some(ItemCard {
            title: format!("Here's how other people voted on the {}!", session.item.name),
            description: None,
            image_url: current_image(session),
            tally: Some(tally),
        }),
        controls: vec![
            button(session, ControlAction::PlayAgain, true),
            button(session, ControlAction::Quit, true),
        ],
    }
}

pub fn terminal_view(reason: EndReason) -> SessionView {
    SessionView { content: reason.message().to_owned(), card: None, controls: Vec::new() }
}

fn current_image(session: &Session) -> String {
    session.item.image(session.page).unwrap_or_default().to_owned()
}

fn button(session: &Session, action: ControlAction, enabled: bool) -> ControlButton {
    let (label, tone) = match action {
        ControlAction::PreviousPage => ("◀️ Previous Page", ControlTone::Neutral),
        ControlAction::NextPage => ("Next Page ▶️", ControlTone::Neutral),
        ControlAction::Vote(VoteKind::Approve) => ("Smash", ControlTone::Positive),
        ControlAction::Vote(VoteKind::Reject) => ("Pass", ControlTone::Negative),
        ControlAction::PlayAgain => ("Play Again", ControlTone::Positive),
        ControlAction::Quit => ("Quit", ControlTone::Negative),
    };

    ControlButton { token: session.controls.token_for(action).clone(), action, label, tone, enabled }
}
