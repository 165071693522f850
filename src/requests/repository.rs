// Help request persistence

use axum::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::StoreResult;
use crate::requests::models::{HelpRequest, NewHelpRequest, RequestStatus, Transition, TransitionRecord};

const REQUEST_COLUMNS: &str = "id, beneficiary_id, category_id, description, latitude, longitude, \
     address_name, radius_km, status, assigned_volunteer_id, active_to, created_at, updated_at";

#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn insert(&self, request: NewHelpRequest) -> StoreResult<HelpRequest>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<HelpRequest>>;

    /// Newest first
    async fn list_by_beneficiary(
        &self,
        beneficiary_id: i32,
        status: Option<RequestStatus>,
    ) -> StoreResult<Vec<HelpRequest>>;

    /// Requests assigned to the volunteer in any of `statuses`, newest first
    async fn list_by_volunteer(
        &self,
        volunteer_id: i32,
        statuses: &[RequestStatus],
    ) -> StoreResult<Vec<HelpRequest>>;

    /// Every request, optionally filtered by status, newest first
    async fn list_by_status(&self, status: Option<RequestStatus>) -> StoreResult<Vec<HelpRequest>>;

    /// Applies `transition` only if the stored status still equals
    /// `transition.from`, recording an audit row in the same transaction.
    ///
    /// Returns `None` when nothing matched (another writer got there first or
    /// the request does not exist).
    async fn apply_transition(&self, transition: Transition) -> StoreResult<Option<HelpRequest>>;

    /// Audit trail of a request, oldest first
    async fn transitions(&self, request_id: Uuid) -> StoreResult<Vec<TransitionRecord>>;

    /// Completed request counts per volunteer
    async fn completion_counts(&self) -> StoreResult<Vec<(i32, i64)>>;
}

#[derive(Clone)]
pub struct RequestRepository {
    pool: PgPool,
}

impl RequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RequestStore for RequestRepository {
    async fn insert(&self, request: NewHelpRequest) -> StoreResult<HelpRequest> {
        let inserted = sqlx::query_as::<_, HelpRequest>(&format!(
            "INSERT INTO help_requests \
               (id, beneficiary_id, category_id, description, latitude, longitude, \
                address_name, radius_km, status, active_to) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(request.beneficiary_id)
        .bind(request.category_id)
        .bind(&request.description)
        .bind(request.location.point.latitude)
        .bind(request.location.point.longitude)
        .bind(&request.location.address_name)
        .bind(request.radius_km)
        .bind(RequestStatus::Submitted)
        .bind(request.active_to)
        .fetch_one(&self.pool)
        .await?;

        Ok(inserted)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<HelpRequest>> {
        let request = sqlx::query_as::<_, HelpRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM help_requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    async fn list_by_beneficiary(
        &self,
        beneficiary_id: i32,
        status: Option<RequestStatus>,
    ) -> StoreResult<Vec<HelpRequest>> {
        let requests = sqlx::query_as::<_, HelpRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM help_requests \
             WHERE beneficiary_id = $1 AND ($2::TEXT IS NULL OR status = $2) \
             ORDER BY created_at DESC"
        ))
        .bind(beneficiary_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    async fn list_by_volunteer(
        &self,
        volunteer_id: i32,
        statuses: &[RequestStatus],
    ) -> StoreResult<Vec<HelpRequest>> {
        let statuses: Vec<&str> = statuses.iter().map(RequestStatus::as_str).collect();
        let requests = sqlx::query_as::<_, HelpRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM help_requests \
             WHERE assigned_volunteer_id = $1 AND status = ANY($2) \
             ORDER BY updated_at DESC"
        ))
        .bind(volunteer_id)
        .bind(statuses)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    async fn list_by_status(&self, status: Option<RequestStatus>) -> StoreResult<Vec<HelpRequest>> {
        let requests = sqlx::query_as::<_, HelpRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM help_requests \
             WHERE $1::TEXT IS NULL OR status = $1 \
             ORDER BY created_at DESC"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    async fn apply_transition(&self, transition: Transition) -> StoreResult<Option<HelpRequest>> {
        let mut tx = self.pool.begin().await?;

        // Compare-and-set: zero rows means the status moved under us
        let updated = sqlx::query_as::<_, HelpRequest>(&format!(
            "UPDATE help_requests \
             SET status = $3, assigned_volunteer_id = $4, updated_at = NOW() \
             WHERE id = $1 AND status = $2 \
             RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(transition.request_id)
        .bind(transition.from)
        .bind(transition.to)
        .bind(transition.assigned_volunteer_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(updated) = updated else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            "INSERT INTO request_transitions (request_id, from_status, to_status, actor_id) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(transition.request_id)
        .bind(transition.from)
        .bind(transition.to)
        .bind(transition.actor_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn transitions(&self, request_id: Uuid) -> StoreResult<Vec<TransitionRecord>> {
        let records = sqlx::query_as::<_, TransitionRecord>(
            "SELECT request_id, from_status, to_status, actor_id, created_at \
             FROM request_transitions WHERE request_id = $1 ORDER BY id",
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn completion_counts(&self) -> StoreResult<Vec<(i32, i64)>> {
        let counts: Vec<(i32, i64)> = sqlx::query_as(
            "SELECT assigned_volunteer_id, COUNT(*) FROM help_requests \
             WHERE status = 'completed' AND assigned_volunteer_id IS NOT NULL \
             GROUP BY assigned_volunteer_id \
             ORDER BY COUNT(*) DESC, assigned_volunteer_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }
}
