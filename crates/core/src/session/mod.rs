pub mod engine;
pub mod states;
pub mod view;

pub use engine::{reduce, start};
pub use states::{
    ControlAction, ControlBinding, ControlSet, ControlToken, Effect, EndReason, IgnoreReason,
    Phase, Session, SessionEvent, Transition,
};
pub use view::{ControlButton, ControlTone, ItemCard, SessionView};
