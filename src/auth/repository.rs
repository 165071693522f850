// Credential store: persisted user records of every role

use axum::async_trait;
use sqlx::PgPool;

use crate::auth::models::{NewUser, ProfileUpdate, User};
use crate::db::{StoreError, StoreResult};
use crate::geo::BoundingBox;

const USER_COLUMNS: &str = "id, role, phone_num, tg_id, firstname, lastname, patronymic, \
     password_hash, latitude, longitude, address_name, is_verified, is_active, \
     created_at, updated_at";

/// Storage seam for users; services depend on this rather than on Postgres
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `StoreError::Duplicate` when the phone number is taken
    async fn create(&self, user: NewUser) -> StoreResult<User>;

    async fn find_by_id(&self, id: i32) -> StoreResult<Option<User>>;

    async fn find_by_phone(&self, phone_num: &str) -> StoreResult<Option<User>>;

    async fn find_by_ids(&self, ids: &[i32]) -> StoreResult<Vec<User>>;

    /// Applies the non-empty fields of `update`; never touches the role
    async fn update_profile(&self, id: i32, update: ProfileUpdate) -> StoreResult<Option<User>>;

    async fn set_verified(&self, id: i32, verified: bool) -> StoreResult<Option<User>>;

    /// Soft-disable; rows are never deleted
    async fn deactivate(&self, id: i32) -> StoreResult<Option<User>>;

    async fn list_unverified(&self) -> StoreResult<Vec<User>>;

    /// Active, verified volunteers whose stored location lies inside `bbox`
    async fn volunteers_within(&self, bbox: BoundingBox) -> StoreResult<Vec<User>>;
}

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let (latitude, longitude, address_name) = match user.location {
            Some(location) => (
                Some(location.point.latitude),
                Some(location.point.longitude),
                location.address_name,
            ),
            None => (None, None, None),
        };

        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (role, phone_num, tg_id, firstname, lastname, patronymic, \
             password_hash, latitude, longitude, address_name, is_verified) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.role)
        .bind(&user.phone_num)
        .bind(&user.tg_id)
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(&user.patronymic)
        .bind(&user.password_hash)
        .bind(latitude)
        .bind(longitude)
        .bind(address_name)
        .bind(user.is_verified)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::from_insert(e, "User with this phone number"))
    }

    async fn find_by_id(&self, id: i32) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_phone(&self, phone_num: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE phone_num = $1"
        ))
        .bind(phone_num)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_ids(&self, ids: &[i32]) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1) ORDER BY id"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn update_profile(&self, id: i32, update: ProfileUpdate) -> StoreResult<Option<User>> {
        let has_location = update.location.is_some();
        let (latitude, longitude, address_name) = match update.location {
            Some(location) => (
                Some(location.point.latitude),
                Some(location.point.longitude),
                location.address_name,
            ),
            None => (None, None, None),
        };

        // Location columns move together, so an unknown address clears the old name
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET \
               firstname = COALESCE($2, firstname), \
               lastname = COALESCE($3, lastname), \
               patronymic = COALESCE($4, patronymic), \
               tg_id = COALESCE($5, tg_id), \
               latitude = CASE WHEN $6 THEN $7 ELSE latitude END, \
               longitude = CASE WHEN $6 THEN $8 ELSE longitude END, \
               address_name = CASE WHEN $6 THEN $9 ELSE address_name END, \
               updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(update.firstname)
        .bind(update.lastname)
        .bind(update.patronymic)
        .bind(update.tg_id)
        .bind(has_location)
        .bind(latitude)
        .bind(longitude)
        .bind(address_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn set_verified(&self, id: i32, verified: bool) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_verified = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(verified)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn deactivate(&self, id: i32) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_active = FALSE, updated_at = NOW() WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn list_unverified(&self) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE NOT is_verified AND is_active \
             ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn volunteers_within(&self, bbox: BoundingBox) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE role = 'volunteer' AND is_active AND is_verified \
               AND latitude BETWEEN $1 AND $2 \
               AND longitude BETWEEN $3 AND $4"
        ))
        .bind(bbox.min_latitude)
        .bind(bbox.max_latitude)
        .bind(bbox.min_longitude)
        .bind(bbox.max_longitude)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}
