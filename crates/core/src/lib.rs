pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod session;
pub mod votes;

pub use catalog::{Catalog, CatalogLoadError};
pub use domain::item::{Item, ItemKey};
pub use domain::vote::{VoteKind, VoteTally};
pub use errors::{ApplicationError, InterfaceError};
pub use votes::{StoreError, VoteStore};
