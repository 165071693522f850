// HTTP handlers for the category catalogue

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use crate::categories::models::{Category, CreateCategoryRequest};
use crate::error::{ApiError, ErrorResponse};
use crate::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct CategoryListQuery {
    /// Include deactivated categories
    #[serde(default)]
    pub include_inactive: bool,
}

/// Handler for POST /moderator/categories
#[utoipa::path(
    post,
    path = "/moderator/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 400, description = "Invalid input or inactive parent", body = ErrorResponse),
        (status = 404, description = "Parent category not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "moderator"
)]
pub async fn create_category_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    request.validate()?;
    let category = state.category_service.create(request).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Handler for DELETE /moderator/categories/{id}
/// Deactivates the category; existing requests keep their reference
#[utoipa::path(
    delete,
    path = "/moderator/categories/{id}",
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category deactivated", body = Category),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "moderator"
)]
pub async fn deactivate_category_handler(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.category_service.deactivate(id).await?))
}

/// Handler for GET /developers/categories
#[utoipa::path(
    get,
    path = "/developers/categories",
    params(CategoryListQuery),
    responses(
        (status = 200, description = "Category catalogue", body = Vec<Category>)
    ),
    security(("bearer_auth" = [])),
    tag = "developers"
)]
pub async fn list_categories_handler(
    State(state): State<AppState>,
    Query(query): Query<CategoryListQuery>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.category_service.list(query.include_inactive).await?))
}
