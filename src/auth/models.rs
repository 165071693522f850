// Authentication data models and DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use validator::Validate;

use crate::geo::{GeoPoint, LocationInput, LocationResponse, ResolvedLocation};
use crate::validation::{validate_not_blank, validate_phone_number};

/// User role for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Volunteer,
    Beneficiary,
    Moderator,
    Developer,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Volunteer,
        Role::Beneficiary,
        Role::Moderator,
        Role::Developer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Volunteer => "volunteer",
            Role::Beneficiary => "beneficiary",
            Role::Moderator => "moderator",
            Role::Developer => "developer",
        }
    }

    /// Staff accounts are only created by a moderator
    pub fn is_self_registrable(&self) -> bool {
        matches!(self, Role::Volunteer | Role::Beneficiary)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown role '{}'", s))
    }
}

/// User database model
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub role: Role,
    pub phone_num: String,
    pub tg_id: Option<String>,
    pub firstname: String,
    pub lastname: Option<String>,
    pub patronymic: Option<String>,
    pub password_hash: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address_name: Option<String>,
    pub is_verified: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn location(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint::new(latitude, longitude)),
            _ => None,
        }
    }

    /// Volunteers that may be offered requests
    pub fn is_matchable_volunteer(&self) -> bool {
        self.role == Role::Volunteer && self.is_active && self.is_verified && self.location().is_some()
    }
}

/// User response model (excludes password_hash)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub role: Role,
    pub phone_num: String,
    pub tg_id: Option<String>,
    pub firstname: String,
    pub lastname: Option<String>,
    pub patronymic: Option<String>,
    pub location: Option<LocationResponse>,
    pub is_verified: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let location = user
            .location()
            .map(|point| LocationResponse::new(point, user.address_name.clone()));
        Self {
            id: user.id,
            role: user.role,
            phone_num: user.phone_num,
            tg_id: user.tg_id,
            firstname: user.firstname,
            lastname: user.lastname,
            patronymic: user.patronymic,
            location,
            is_verified: user.is_verified,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

/// Insert payload for the user store; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub role: Role,
    pub phone_num: String,
    pub tg_id: Option<String>,
    pub firstname: String,
    pub lastname: Option<String>,
    pub patronymic: Option<String>,
    pub password_hash: String,
    pub location: Option<ResolvedLocation>,
    pub is_verified: bool,
}

/// Partial profile update; `None` leaves a field unchanged. Role is not here.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub patronymic: Option<String>,
    pub tg_id: Option<String>,
    pub location: Option<ResolvedLocation>,
}

/// Registration request DTO
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct RegisterRequest {
    /// `volunteer` or `beneficiary`
    pub role: Role,
    #[schema(example = "380501234567")]
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
    #[validate(length(max = 64))]
    pub tg_id: Option<String>,
    /// Required for volunteers
    #[validate]
    pub location: Option<LocationInput>,
}

/// Login request DTO
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(custom = "validate_phone_number")]
    pub phone_num: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Token refresh request DTO
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Authentication response DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Always `bearer`
    pub token_type: String,
    pub user: UserResponse,
}

/// Caller identity resolved from a verified access token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i32,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: 1,
            role: Role::Volunteer,
            phone_num: "380501234567".into(),
            tg_id: None,
            firstname: "Olena".into(),
            lastname: None,
            patronymic: None,
            password_hash: "$argon2id$secret".into(),
            latitude: Some(50.45),
            longitude: Some(30.52),
            address_name: Some("Kyiv".into()),
            is_verified: true,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn role_round_trips_through_strings() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn only_volunteers_and_beneficiaries_self_register() {
        assert!(Role::Volunteer.is_self_registrable());
        assert!(Role::Beneficiary.is_self_registrable());
        assert!(!Role::Moderator.is_self_registrable());
        assert!(!Role::Developer.is_self_registrable());
    }

    #[test]
    fn user_response_never_contains_the_hash() {
        let json = serde_json::to_string(&UserResponse::from(sample_user())).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn unverified_volunteers_are_not_matchable() {
        let mut user = sample_user();
        assert!(user.is_matchable_volunteer());
        user.is_verified = false;
        assert!(!user.is_matchable_volunteer());
    }

    #[test]
    fn register_request_rejects_bad_phone() {
        let request = RegisterRequest {
            role: Role::Beneficiary,
            phone_num: "12345".into(),
            password: "long enough".into(),
            firstname: "Ivan".into(),
            lastname: None,
            patronymic: None,
            tg_id: None,
            location: None,
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("phone_num"));
    }
}
