// Profile upkeep and moderation of user accounts

use std::sync::Arc;
use tracing::info;

use crate::accounts::error::AccountError;
use crate::accounts::models::{CreateStaffRequest, UpdateVolunteerProfile, VolunteerProfile};
use crate::auth::models::{Identity, NewUser, ProfileUpdate, Role, User, UserResponse};
use crate::auth::password::PasswordService;
use crate::auth::repository::UserStore;
use crate::categories::CategoryService;
use crate::geo::{resolve_location, Geocoder, LocationInput};

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
    categories: CategoryService,
    geocoder: Arc<dyn Geocoder>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserStore>,
        categories: CategoryService,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        Self {
            users,
            categories,
            geocoder,
        }
    }

    pub async fn volunteer_profile(&self, volunteer: Identity) -> Result<VolunteerProfile, AccountError> {
        let user = self.user(volunteer.user_id).await?;
        let category_ids = self.categories.volunteer_categories(user.id).await?;
        Ok(VolunteerProfile {
            user: user.into(),
            category_ids,
        })
    }

    pub async fn update_volunteer_profile(
        &self,
        volunteer: Identity,
        update: UpdateVolunteerProfile,
    ) -> Result<VolunteerProfile, AccountError> {
        // Nothing is written unless every part of the update is acceptable
        if let Some(ids) = &update.category_ids {
            self.categories.require_all_active(ids).await?;
        }
        let location = match update.location.as_ref().and_then(LocationInput::to_query) {
            Some(query) => Some(resolve_location(self.geocoder.as_ref(), &query).await?),
            None => None,
        };

        let user = self
            .users
            .update_profile(
                volunteer.user_id,
                ProfileUpdate {
                    firstname: update.firstname.map(|name| name.trim().to_string()),
                    lastname: update.lastname,
                    patronymic: update.patronymic,
                    tg_id: update.tg_id,
                    location,
                },
            )
            .await?
            .ok_or(AccountError::NotFound(volunteer.user_id))?;

        let category_ids = match update.category_ids {
            Some(ids) => self.categories.set_volunteer_categories(user.id, &ids).await?,
            None => self.categories.volunteer_categories(user.id).await?,
        };

        info!("Volunteer {} updated their profile", user.id);
        Ok(VolunteerProfile {
            user: user.into(),
            category_ids,
        })
    }

    /// Soft-disables the caller's own account
    pub async fn disable_self(&self, identity: Identity) -> Result<UserResponse, AccountError> {
        self.disable(identity.user_id).await
    }

    pub async fn list_unverified(&self) -> Result<Vec<UserResponse>, AccountError> {
        Ok(self
            .users
            .list_unverified()
            .await?
            .into_iter()
            .map(UserResponse::from)
            .collect())
    }

    pub async fn verify(&self, user_id: i32) -> Result<UserResponse, AccountError> {
        let user = self
            .users
            .set_verified(user_id, true)
            .await?
            .ok_or(AccountError::NotFound(user_id))?;
        info!("User {} verified", user_id);
        Ok(user.into())
    }

    pub async fn disable(&self, user_id: i32) -> Result<UserResponse, AccountError> {
        let user = self
            .users
            .deactivate(user_id)
            .await?
            .ok_or(AccountError::NotFound(user_id))?;
        info!("User {} disabled", user_id);
        Ok(user.into())
    }

    /// Staff accounts are created verified
    pub async fn create_staff(&self, request: CreateStaffRequest) -> Result<UserResponse, AccountError> {
        if request.role.is_self_registrable() {
            return Err(AccountError::NotStaffRole(request.role));
        }
        PasswordService::validate_password_strength(&request.password)?;
        let password_hash = PasswordService::hash_password(&request.password)?;

        let user = self
            .users
            .create(NewUser {
                role: request.role,
                phone_num: request.phone_num,
                tg_id: None,
                firstname: request.firstname.trim().to_string(),
                lastname: request.lastname,
                patronymic: request.patronymic,
                password_hash,
                location: None,
                is_verified: true,
            })
            .await?;

        info!("Created {} account {}", user.role, user.id);
        Ok(user.into())
    }

    pub fn roles(&self) -> Vec<Role> {
        Role::ALL.to_vec()
    }

    async fn user(&self, id: i32) -> Result<User, AccountError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or(AccountError::NotFound(id))
    }
}
