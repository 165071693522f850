use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::geo::{GeoPoint, LocationInput, LocationResponse, ResolvedLocation};
use crate::validation::validate_not_blank;

/// Help request lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Submitted,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 5] = [
        RequestStatus::Submitted,
        RequestStatus::Assigned,
        RequestStatus::InProgress,
        RequestStatus::Completed,
        RequestStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Submitted => "submitted",
            RequestStatus::Assigned => "assigned",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    /// Nothing leaves a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Cancelled)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something an actor does to a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestEvent {
    Accept,
    Start,
    Finish,
    Cancel,
}

impl RequestEvent {
    pub const ALL: [RequestEvent; 4] = [
        RequestEvent::Accept,
        RequestEvent::Start,
        RequestEvent::Finish,
        RequestEvent::Cancel,
    ];
}

impl fmt::Display for RequestEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RequestEvent::Accept => "accept",
            RequestEvent::Start => "start",
            RequestEvent::Finish => "finish",
            RequestEvent::Cancel => "cancel",
        })
    }
}

/// Help request database model
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct HelpRequest {
    pub id: Uuid,
    pub beneficiary_id: i32,
    pub category_id: Option<i32>,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address_name: Option<String>,
    pub radius_km: f64,
    pub status: RequestStatus,
    pub assigned_volunteer_id: Option<i32>,
    pub active_to: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HelpRequest {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.active_to.map_or(false, |active_to| active_to <= now)
    }
}

/// Insert payload for the request store
#[derive(Debug, Clone)]
pub struct NewHelpRequest {
    pub beneficiary_id: i32,
    pub category_id: Option<i32>,
    pub description: String,
    pub location: ResolvedLocation,
    pub radius_km: f64,
    pub active_to: Option<DateTime<Utc>>,
}

/// A planned status change, applied with compare-and-set on `from`
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub request_id: Uuid,
    pub from: RequestStatus,
    pub to: RequestStatus,
    pub assigned_volunteer_id: Option<i32>,
    pub actor_id: i32,
}

/// Audit row written with every applied transition
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TransitionRecord {
    pub request_id: Uuid,
    pub from_status: RequestStatus,
    pub to_status: RequestStatus,
    pub actor_id: i32,
    pub created_at: DateTime<Utc>,
}

/// Help request submission DTO
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateHelpRequest {
    #[schema(example = "Need groceries delivered, 3rd floor, no elevator")]
    #[validate(length(min = 1, max = 2000), custom = "validate_not_blank")]
    pub description: String,
    pub category_id: Option<i32>,
    /// Falls back to the beneficiary's profile location
    #[validate]
    pub location: Option<LocationInput>,
    /// Defaults to the configured search radius
    #[validate(range(min = 0.1, max = 500.0))]
    pub radius_km: Option<f64>,
    /// Must be in the future
    pub active_to: Option<DateTime<Utc>>,
}

/// Help request response DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HelpRequestResponse {
    pub id: Uuid,
    pub beneficiary_id: i32,
    pub category_id: Option<i32>,
    pub description: String,
    pub location: LocationResponse,
    pub radius_km: f64,
    pub status: RequestStatus,
    pub assigned_volunteer_id: Option<i32>,
    pub active_to: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<HelpRequest> for HelpRequestResponse {
    fn from(request: HelpRequest) -> Self {
        Self {
            location: LocationResponse::new(request.location(), request.address_name),
            id: request.id,
            beneficiary_id: request.beneficiary_id,
            category_id: request.category_id,
            description: request.description,
            radius_km: request.radius_km,
            status: request.status,
            assigned_volunteer_id: request.assigned_volunteer_id,
            active_to: request.active_to,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

/// A submitted request a volunteer could take, with how far away it is
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AvailableRequest {
    pub request: HelpRequestResponse,
    pub distance_km: f64,
}

/// Completed request count for one volunteer
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VolunteerRating {
    pub volunteer_id: i32,
    pub firstname: String,
    pub lastname: Option<String>,
    pub completed: i64,
}

/// Query parameters for status-filtered request lists
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct StatusFilter {
    pub status: Option<RequestStatus>,
}

/// Which of their own requests a volunteer is listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VolunteerScope {
    /// Assigned or in progress
    #[default]
    Active,
    Finished,
}

impl VolunteerScope {
    pub fn statuses(&self) -> &'static [RequestStatus] {
        match self {
            VolunteerScope::Active => &[RequestStatus::Assigned, RequestStatus::InProgress],
            VolunteerScope::Finished => &[RequestStatus::Completed],
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct VolunteerScopeQuery {
    #[serde(default)]
    pub scope: VolunteerScope,
}
