//! Slack Integration - bot interface
//!
//! This crate provides the Slack interface for smashbot:
//! - **Ingress** (`ingress`) - acknowledges and dispatches envelopes read from an `EnvelopeSource`
//! - **Slash Commands** (`commands`) - `/smash`, `/ping`, `/invite`, `/smash help`
//! - **Events** (`events`) - dispatch of slash commands and button clicks
//! - **Block Kit** (`blocks`) - session cards and utility replies
//! - **Sessions** (`session`, `collector`) - one private, button-driven game per `/smash`
//!
//! # Architecture
//!
//! ```text
//! EnvelopeSource → SlackIngress → EventDispatcher
//!                                   ├→ SlashCommandHandler → GameCommandService
//!                                   │                          │ spawns
//!                                   └→ BlockActionHandler → CollectorRegistry → SessionController
//!                                                                                │
//!                                               ResponseSurface (edits) ←────────┘
//! ```
//!
//! # Key Types
//!
//! - `SlackIngress` - envelope pump in front of the dispatcher
//! - `EventDispatcher` - routes events to handlers
//! - `CollectorRegistry` - delivers clicks to the session that owns the clicked reply
//! - `SessionController` - drives the core state machine and the vote store

pub mod blocks;
pub mod collector;
pub mod commands;
pub mod events;
pub mod ingress;
pub mod service;
pub mod session;
pub mod surface;

#[cfg(test)]
mod test_support;
