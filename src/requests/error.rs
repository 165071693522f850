// Help request lifecycle errors

use uuid::Uuid;

use crate::categories::CategoryError;
use crate::db::StoreError;
use crate::error::ApiError;
use crate::geo::{GeocodingError, MatchError};
use crate::requests::models::{RequestEvent, RequestStatus};

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("help request {0} not found")]
    NotFound(Uuid),

    /// The (state, event) pair is not in the transition table, or another
    /// actor changed the state first
    #[error("cannot {event} a request that is {from}")]
    IllegalTransition {
        from: RequestStatus,
        event: RequestEvent,
    },

    /// Right state, wrong actor
    #[error("{0}")]
    NotAllowed(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Category(#[from] CategoryError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Geocoding(#[from] GeocodingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::NotFound(id) => ApiError::not_found("HelpRequest", id),
            LifecycleError::IllegalTransition { .. } => ApiError::IllegalStateTransition {
                message: err.to_string(),
            },
            LifecycleError::NotAllowed(message) => ApiError::Forbidden(message),
            LifecycleError::InvalidInput(message) => ApiError::InvalidInput(message),
            LifecycleError::Category(err) => err.into(),
            LifecycleError::Match(err) => err.into(),
            LifecycleError::Geocoding(err) => err.into(),
            LifecycleError::Store(err) => err.into(),
        }
    }
}
