pub mod item;
pub mod vote;
