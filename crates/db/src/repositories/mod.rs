use smashbot_core::StoreError;
use thiserror::Error;

pub mod memory;
pub mod votes;

pub use memory::InMemoryVoteStore;
pub use votes::SqlVoteStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for StoreError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Database(sqlx::Error::PoolTimedOut) => {
                Self::Unavailable("connection pool timed out".to_owned())
            }
            RepositoryError::Database(sqlx::Error::PoolClosed) => {
                Self::Unavailable("connection pool is closed".to_owned())
            }
            RepositoryError::Database(source) => Self::Database(source.to_string()),
            RepositoryError::Decode(message) => Self::Database(message),
        }
    }
}
