//! Resume profile: data model, legacy adapter, store reconciliation and the
//! resume-coach suggestion applier.

pub mod gateway;
pub mod handlers;
pub mod legacy;
pub mod lenient;
pub mod merge;
pub mod prompts;
pub mod suggestions;
pub mod sync;
pub mod types;

use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

pub use gateway::ProfileGateway;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("No profile for user {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}
