pub mod connection;
pub mod migrations;
pub mod reconcile;
pub mod repositories;

pub use connection::{connect, connect_with_settings, ping, DbPool};
pub use reconcile::{reconcile_catalog, ReconcileReport};
pub use repositories::{InMemoryVoteStore, RepositoryError, SqlVoteStore};
