// Category catalogue and volunteer subscriptions

use axum::async_trait;
use sqlx::PgPool;

use crate::categories::models::Category;
use crate::db::StoreResult;

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn create(&self, name: &str, parent_id: Option<i32>) -> StoreResult<Category>;

    async fn find_by_id(&self, id: i32) -> StoreResult<Option<Category>>;

    /// Ordered by id; inactive categories only when asked for
    async fn list(&self, include_inactive: bool) -> StoreResult<Vec<Category>>;

    async fn deactivate(&self, id: i32) -> StoreResult<Option<Category>>;

    /// Category ids a volunteer subscribed to
    async fn volunteer_categories(&self, user_id: i32) -> StoreResult<Vec<i32>>;

    /// Replaces the volunteer's subscriptions
    async fn set_volunteer_categories(&self, user_id: i32, category_ids: &[i32]) -> StoreResult<()>;
}

#[derive(Clone)]
pub struct CategoryRepository {
    pool: PgPool,
}

impl CategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryStore for CategoryRepository {
    async fn create(&self, name: &str, parent_id: Option<i32>) -> StoreResult<Category> {
        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, parent_id) VALUES ($1, $2) \
             RETURNING id, name, parent_id, is_active",
        )
        .bind(name)
        .bind(parent_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(category)
    }

    async fn find_by_id(&self, id: i32) -> StoreResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, parent_id, is_active FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    async fn list(&self, include_inactive: bool) -> StoreResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, parent_id, is_active FROM categories \
             WHERE is_active OR $1 ORDER BY id",
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    async fn deactivate(&self, id: i32) -> StoreResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "UPDATE categories SET is_active = FALSE WHERE id = $1 \
             RETURNING id, name, parent_id, is_active",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    async fn volunteer_categories(&self, user_id: i32) -> StoreResult<Vec<i32>> {
        let ids: Vec<(i32,)> = sqlx::query_as(
            "SELECT category_id FROM volunteer_categories WHERE user_id = $1 ORDER BY category_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn set_volunteer_categories(&self, user_id: i32, category_ids: &[i32]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM volunteer_categories WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO volunteer_categories (user_id, category_id) \
             SELECT $1, UNNEST($2::INTEGER[]) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(category_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
