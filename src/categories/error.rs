use crate::db::StoreError;
use crate::error::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum CategoryError {
    #[error("category {0} not found")]
    NotFound(i32),

    #[error("category {0} is no longer active")]
    Inactive(i32),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<CategoryError> for ApiError {
    fn from(err: CategoryError) -> Self {
        match err {
            CategoryError::NotFound(id) => ApiError::not_found("Category", id),
            CategoryError::Inactive(id) => {
                ApiError::InvalidInput(format!("Category {} is no longer active", id))
            }
            CategoryError::Store(err) => err.into(),
        }
    }
}
