use rand::Rng;

use crate::catalog::Catalog;
use crate::domain::item::Item;
use crate::session::states::{
    ControlAction, ControlSet, Effect, EndReason, IgnoreReason, Phase, Session, SessionEvent,
    Transition,
};
use crate::session::view::{browse_view, results_view, terminal_view, SessionView};

/// Opens a session on `item` at page 0 with a fresh set of control tokens.
pub fn start(user_id: impl Into<String>, item: Item) -> (Session, SessionView) {
    let controls = ControlSet::issue(&item.key());
    let session = Session {
        user_id: user_id.into(),
        item,
        page: 0,
        phase: Phase::Browsing,
        controls,
        pending_vote: None,
        round: 1,
    };
    let view = browse_view(&session);
    (session, view)
}

/// Applies one event to a session. Side effects (store writes, rendering) are described by
/// the returned [`Effect`] and performed by the caller.
pub fn reduce<R>(
    mut session: Session,
    event: SessionEvent,
    catalog: &Catalog,
    rng: &mut R,
) -> Transition
where
    R: Rng + ?Sized,
{
    if session.phase == Phase::Ended {
        return ignore(session, IgnoreReason::Ended);
    }

    match event {
        SessionEvent::IdleTimeout => finish(session, EndReason::Idle),
        SessionEvent::Terminate => finish(session, EndReason::Other),
        SessionEvent::VoteFailed => {
            if session.pending_vote.is_none() {
                return ignore(session, IgnoreReason::NoPendingVote);
            }
            finish(session, EndReason::Error)
        }
        SessionEvent::VoteRecorded { kind, tally } => {
            if session.pending_vote != Some(kind) {
                return ignore(session, IgnoreReason::NoPendingVote);
            }
            session.pending_vote = None;
            session.phase = Phase::Voted;
            let view = results_view(&session, kind, tally);
            Transition { session, effect: Effect::Render(view) }
        }
        SessionEvent::Click(token) => {
            let Some(binding) = session.controls.resolve(&token) else {
                return ignore(session, IgnoreReason::StaleControl);
            };
            if binding.item_key != session.item_key() {
                return ignore(session, IgnoreReason::StaleControl);
            }
            let action = binding.action;
            if session.pending_vote.is_some() {
                return ignore(session, IgnoreReason::VotePending);
            }
            apply_action(session, action, catalog, rng)
        }
    }
}

fn apply_action<R>(
    mut session: Session,
    action: ControlAction,
    catalog: &Catalog,
    rng: &mut R,
) -> Transition
where
    R: Rng + ?Sized,
{
    match (session.phase, action) {
        (Phase::Browsing, ControlAction::PreviousPage) => {
            if session.page == 0 {
                return ignore(session, IgnoreReason::AtBoundary);
            }
            session.page -= 1;
            render(session)
        }
        (Phase::Browsing, ControlAction::NextPage) => {
            if session.page >= session.last_page() {
                return ignore(session, IgnoreReason::AtBoundary);
            }
            session.page += 1;
            render(session)
        }
        (Phase::Browsing, ControlAction::Vote(kind)) => {
            session.pending_vote = Some(kind);
            let item_key = session.item_key();
            Transition { session, effect: Effect::RecordVote { item_key, kind } }
        }
        (Phase::Voted, ControlAction::PlayAgain) => {
            let item = catalog.pick_random(rng).clone();
            session.controls = ControlSet::issue(&item.key());
            session.item = item;
            session.page = 0;
            session.phase = Phase::Browsing;
            session.round = session.round.saturating_add(1);
            render(session)
        }
        (Phase::Voted, ControlAction::Quit) => finish(session, EndReason::Quit),
        (phase, action) => ignore(session, IgnoreReason::NotAllowed { phase, action }),
    }
}

fn render(session: Session) -> Transition {
    let view = browse_view(&session);
    Transition { session, effect: Effect::Render(view) }
}

fn finish(mut session: Session, reason: EndReason) -> Transition {
    session.phase = Phase::Ended;
    session.pending_vote = None;
    Transition { session, effect: Effect::Finish { reason, view: terminal_view(reason) } }
}

fn ignore(session: Session, reason: IgnoreReason) -> Transition {
    Transition { session, effect: Effect::Ignore(reason) }
}
