// Authentication service: registration, login, token refresh

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::auth::error::AuthError;
use crate::auth::models::{
    AuthResponse, Identity, LoginRequest, NewUser, RegisterRequest, Role, User, UserResponse,
};
use crate::auth::password::PasswordService;
use crate::auth::repository::UserStore;
use crate::auth::token::TokenService;
use crate::db::StoreError;
use crate::geo::{resolve_location, Geocoder, LocationInput, ResolvedLocation};

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    geocoder: Arc<dyn Geocoder>,
    tokens: Arc<TokenService>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        geocoder: Arc<dyn Geocoder>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            users,
            geocoder,
            tokens,
        }
    }

    /// Registers a volunteer or beneficiary and signs them in.
    ///
    /// New accounts start unverified; a moderator verifies them later.
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AuthError> {
        if !request.role.is_self_registrable() {
            return Err(AuthError::RoleNotAllowed(request.role));
        }
        PasswordService::validate_password_strength(&request.password)?;

        if self.users.find_by_phone(&request.phone_num).await?.is_some() {
            return Err(StoreError::Duplicate("User with this phone number".into()).into());
        }

        let location = self
            .resolve_optional(request.location.as_ref())
            .await?;
        if request.role == Role::Volunteer && location.is_none() {
            return Err(AuthError::LocationRequired);
        }

        let password_hash = PasswordService::hash_password(&request.password)?;
        let user = self
            .users
            .create(NewUser {
                role: request.role,
                phone_num: request.phone_num,
                tg_id: request.tg_id,
                firstname: request.firstname.trim().to_string(),
                lastname: request.lastname,
                patronymic: request.patronymic,
                password_hash,
                location,
                is_verified: false,
            })
            .await?;

        info!("Registered {} user_id={}", user.role, user.id);
        self.sign_in(user)
    }

    /// Phone number and password to a token pair.
    ///
    /// An unknown phone and a wrong password fail the same way.
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        let user = match self.users.find_by_phone(&request.phone_num).await? {
            Some(user) => user,
            None => {
                debug!("Login attempt for unknown phone number");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !PasswordService::verify_password(&request.password, &user.password_hash)? {
            warn!("Failed login for user_id={}", user.id);
            return Err(AuthError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        info!("User {} logged in", user.id);
        self.sign_in(user)
    }

    /// Exchanges a refresh token for a fresh pair
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse, AuthError> {
        let identity = self.tokens.verify_refresh(refresh_token)?;
        let user = self
            .users
            .find_by_id(identity.user_id)
            .await?
            .ok_or(AuthError::UserNotFound(identity.user_id))?;
        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        debug!("Refreshed tokens for user_id={}", user.id);
        self.sign_in(user)
    }

    pub async fn me(&self, identity: Identity) -> Result<UserResponse, AuthError> {
        self.users
            .find_by_id(identity.user_id)
            .await?
            .map(UserResponse::from)
            .ok_or(AuthError::UserNotFound(identity.user_id))
    }

    async fn resolve_optional(
        &self,
        location: Option<&LocationInput>,
    ) -> Result<Option<ResolvedLocation>, AuthError> {
        match location.and_then(LocationInput::to_query) {
            Some(query) => Ok(Some(resolve_location(self.geocoder.as_ref(), &query).await?)),
            None => Ok(None),
        }
    }

    fn sign_in(&self, user: User) -> Result<AuthResponse, AuthError> {
        let (access_token, refresh_token) = self.tokens.issue_pair(user.id, user.role)?;
        Ok(AuthResponse {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            user: user.into(),
        })
    }
}
