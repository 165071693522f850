use crate::auth::models::Role;
use crate::auth::AuthError;
use crate::categories::CategoryError;
use crate::error::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("user {0} not found")]
    NotFound(i32),

    #[error("role '{0}' is not a staff role")]
    NotStaffRole(Role),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Category(#[from] CategoryError),
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::NotFound(id) => ApiError::not_found("User", id),
            AccountError::NotStaffRole(role) => {
                ApiError::InvalidInput(format!("Role '{}' is not a staff role", role))
            }
            AccountError::Auth(err) => err.into(),
            AccountError::Category(err) => err.into(),
        }
    }
}

impl From<crate::db::StoreError> for AccountError {
    fn from(err: crate::db::StoreError) -> Self {
        AccountError::Auth(AuthError::Store(err))
    }
}

impl From<crate::geo::GeocodingError> for AccountError {
    fn from(err: crate::geo::GeocodingError) -> Self {
        AccountError::Auth(AuthError::Geocoding(err))
    }
}
