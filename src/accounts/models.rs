use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::models::{Role, UserResponse};
use crate::geo::LocationInput;
use crate::validation::{validate_not_blank, validate_phone_number};

/// Volunteer profile update DTO; absent fields stay as they are
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateVolunteerProfile {
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub firstname: Option<String>,
    #[validate(length(max = 100))]
    pub lastname: Option<String>,
    #[validate(length(max = 100))]
    pub patronymic: Option<String>,
    #[validate(length(max = 64))]
    pub tg_id: Option<String>,
    #[validate]
    pub location: Option<LocationInput>,
    /// Replaces the subscribed categories when present
    pub category_ids: Option<Vec<i32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VolunteerProfile {
    #[serde(flatten)]
    pub user: UserResponse,
    pub category_ids: Vec<i32>,
}

/// Moderator-created moderator or developer account
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateStaffRequest {
    /// `moderator` or `developer`
    pub role: Role,
    #[validate(custom = "validate_phone_number")]
    pub phone_num: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub firstname: String,
    #[validate(length(max = 100))]
    pub lastname: Option<String>,
    #[validate(length(max = 100))]
    pub patronymic: Option<String>,
}
