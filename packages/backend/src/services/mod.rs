pub mod analysis;
pub mod journals;
pub mod missions;
pub mod profile;
pub mod routines;

use quest_algo::TransitionError;
use thiserror::Error;

use crate::auth::Account;
use crate::generative::GenerationError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("forbidden")]
    Forbidden,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    /// Generation gave up after retries; `fallback` is what the user sees.
    #[error("generation failed: {source}")]
    Generation {
        fallback: &'static str,
        #[source]
        source: GenerationError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub(crate) fn require_teacher(actor: &Account) -> ServiceResult<()> {
    if actor.is_teacher() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden)
    }
}

/// Owners act on their own documents; teachers may act on any student's.
pub(crate) fn require_owner_or_teacher(actor: &Account, owner_id: &str) -> ServiceResult<()> {
    if actor.is_teacher() || actor.user_id == owner_id {
        Ok(())
    } else {
        Err(ServiceError::Forbidden)
    }
}
