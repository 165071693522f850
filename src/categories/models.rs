use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::validation::validate_not_blank;

/// Kind of help a request asks for; categories may nest one level under a parent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Category {
    pub id: i32,
    #[schema(example = "Groceries")]
    pub name: String,
    pub parent_id: Option<i32>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub name: String,
    pub parent_id: Option<i32>,
}
