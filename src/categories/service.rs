use std::sync::Arc;
use tracing::info;

use crate::categories::error::CategoryError;
use crate::categories::models::{Category, CreateCategoryRequest};
use crate::categories::repository::CategoryStore;

#[derive(Clone)]
pub struct CategoryService {
    categories: Arc<dyn CategoryStore>,
}

impl CategoryService {
    pub fn new(categories: Arc<dyn CategoryStore>) -> Self {
        Self { categories }
    }

    pub async fn create(&self, request: CreateCategoryRequest) -> Result<Category, CategoryError> {
        if let Some(parent_id) = request.parent_id {
            self.require_active(parent_id).await?;
        }
        let category = self
            .categories
            .create(request.name.trim(), request.parent_id)
            .await?;
        info!("Created category {} '{}'", category.id, category.name);
        Ok(category)
    }

    /// Categories are never removed, only hidden from new requests
    pub async fn deactivate(&self, id: i32) -> Result<Category, CategoryError> {
        let category = self
            .categories
            .deactivate(id)
            .await?
            .ok_or(CategoryError::NotFound(id))?;
        info!("Deactivated category {}", id);
        Ok(category)
    }

    pub async fn list(&self, include_inactive: bool) -> Result<Vec<Category>, CategoryError> {
        Ok(self.categories.list(include_inactive).await?)
    }

    pub async fn require_active(&self, id: i32) -> Result<Category, CategoryError> {
        let category = self
            .categories
            .find_by_id(id)
            .await?
            .ok_or(CategoryError::NotFound(id))?;
        if !category.is_active {
            return Err(CategoryError::Inactive(id));
        }
        Ok(category)
    }

    pub async fn volunteer_categories(&self, user_id: i32) -> Result<Vec<i32>, CategoryError> {
        Ok(self.categories.volunteer_categories(user_id).await?)
    }

    pub async fn set_volunteer_categories(
        &self,
        user_id: i32,
        category_ids: &[i32],
    ) -> Result<Vec<i32>, CategoryError> {
        let ids = self.require_all_active(category_ids).await?;
        self.categories.set_volunteer_categories(user_id, &ids).await?;
        Ok(ids)
    }

    /// Sorted, deduplicated ids, all of which name active categories
    pub async fn require_all_active(&self, category_ids: &[i32]) -> Result<Vec<i32>, CategoryError> {
        let mut ids = category_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        for id in &ids {
            self.require_active(*id).await?;
        }
        Ok(ids)
    }
}
