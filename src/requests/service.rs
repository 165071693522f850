// Help request lifecycle manager

use chrono::Utc;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::models::{Identity, Role, User};
use crate::auth::repository::UserStore;
use crate::categories::CategoryService;
use crate::geo::{
    haversine_km, resolve_location, Candidate, GeoMatcher, Geocoder, LocationInput,
    ResolvedLocation,
};
use crate::requests::error::LifecycleError;
use crate::requests::models::{
    AvailableRequest, CreateHelpRequest, HelpRequest, NewHelpRequest, RequestEvent,
    RequestStatus, TransitionRecord, VolunteerRating, VolunteerScope,
};
use crate::requests::repository::RequestStore;
use crate::requests::status_machine::StatusMachine;
use crate::validation::is_valid_radius;

/// Assigned plus in-progress requests one volunteer may hold at once
pub const MAX_ACTIVE_ASSIGNMENTS: usize = 3;

/// Uncategorised requests and volunteers without subscriptions match anything
fn matches_subscriptions(subscriptions: &[i32], category_id: Option<i32>) -> bool {
    match category_id {
        Some(category_id) if !subscriptions.is_empty() => subscriptions.contains(&category_id),
        _ => true,
    }
}

#[derive(Clone)]
pub struct RequestService {
    requests: Arc<dyn RequestStore>,
    users: Arc<dyn UserStore>,
    categories: CategoryService,
    matcher: GeoMatcher,
    geocoder: Arc<dyn Geocoder>,
    default_radius_km: f64,
}

impl RequestService {
    pub fn new(
        requests: Arc<dyn RequestStore>,
        users: Arc<dyn UserStore>,
        categories: CategoryService,
        matcher: GeoMatcher,
        geocoder: Arc<dyn Geocoder>,
        default_radius_km: f64,
    ) -> Self {
        Self {
            requests,
            users,
            categories,
            matcher,
            geocoder,
            default_radius_km,
        }
    }

    /// Creates a `submitted` request for a verified beneficiary
    pub async fn submit(
        &self,
        beneficiary: Identity,
        request: CreateHelpRequest,
    ) -> Result<HelpRequest, LifecycleError> {
        let owner = self.active_user(beneficiary.user_id).await?;
        if !owner.is_verified {
            return Err(LifecycleError::NotAllowed(
                "Only verified beneficiaries can submit requests".to_string(),
            ));
        }

        if let Some(category_id) = request.category_id {
            self.categories.require_active(category_id).await?;
        }

        if let Some(active_to) = request.active_to {
            if active_to <= Utc::now() {
                return Err(LifecycleError::InvalidInput(
                    "active_to must be in the future".to_string(),
                ));
            }
        }

        let radius_km = request.radius_km.unwrap_or(self.default_radius_km);
        if !is_valid_radius(radius_km) {
            return Err(LifecycleError::InvalidInput(format!(
                "Invalid radius: {} km",
                radius_km
            )));
        }

        // Without an explicit location the profile location is used as is
        let location = match request.location.as_ref().and_then(LocationInput::to_query) {
            Some(query) => resolve_location(self.geocoder.as_ref(), &query).await?,
            None => match owner.location() {
                Some(point) => ResolvedLocation {
                    point,
                    address_name: owner.address_name.clone(),
                },
                None => {
                    return Err(LifecycleError::InvalidInput(
                        "A location is required".to_string(),
                    ))
                }
            },
        };

        let created = self
            .requests
            .insert(NewHelpRequest {
                beneficiary_id: owner.id,
                category_id: request.category_id,
                description: request.description.trim().to_string(),
                location,
                radius_km,
                active_to: request.active_to,
            })
            .await?;

        info!(
            "Help request {} submitted by beneficiary {}",
            created.id, owner.id
        );
        Ok(created)
    }

    pub async fn find(&self, id: Uuid) -> Result<HelpRequest, LifecycleError> {
        self.requests
            .find_by_id(id)
            .await?
            .ok_or(LifecycleError::NotFound(id))
    }

    /// A beneficiary's own request; other people's requests look missing
    pub async fn find_owned(&self, owner: Identity, id: Uuid) -> Result<HelpRequest, LifecycleError> {
        let request = self.find(id).await?;
        if request.beneficiary_id != owner.user_id {
            return Err(LifecycleError::NotFound(id));
        }
        Ok(request)
    }

    pub async fn accept(&self, volunteer: Identity, id: Uuid) -> Result<HelpRequest, LifecycleError> {
        self.apply(id, RequestEvent::Accept, volunteer).await
    }

    pub async fn start(&self, volunteer: Identity, id: Uuid) -> Result<HelpRequest, LifecycleError> {
        self.apply(id, RequestEvent::Start, volunteer).await
    }

    pub async fn finish(&self, actor: Identity, id: Uuid) -> Result<HelpRequest, LifecycleError> {
        self.apply(id, RequestEvent::Finish, actor).await
    }

    pub async fn cancel(&self, actor: Identity, id: Uuid) -> Result<HelpRequest, LifecycleError> {
        self.apply(id, RequestEvent::Cancel, actor).await
    }

    /// Checks the transition table and the actor, then writes with
    /// compare-and-set. Losing a race reports the state that won.
    async fn apply(
        &self,
        id: Uuid,
        event: RequestEvent,
        actor: Identity,
    ) -> Result<HelpRequest, LifecycleError> {
        let request = match actor.role {
            Role::Beneficiary => self.find_owned(actor, id).await?,
            _ => self.find(id).await?,
        };
        let transition = StatusMachine::plan(&request, event, actor)?;

        if event == RequestEvent::Accept {
            self.check_can_accept(actor, &request).await?;
        }

        match self.requests.apply_transition(transition.clone()).await? {
            Some(updated) => {
                info!(
                    "Help request {}: {} -> {} by user {}",
                    id, transition.from, transition.to, actor.user_id
                );
                Ok(updated)
            }
            None => {
                let current = self.find(id).await?;
                debug!(
                    "Lost transition race on {}: expected {}, found {}",
                    id, transition.from, current.status
                );
                Err(LifecycleError::IllegalTransition {
                    from: current.status,
                    event,
                })
            }
        }
    }

    /// Accept-time rules on top of the transition table: the volunteer has a
    /// free slot, the request is still open to them and they are in range
    async fn check_can_accept(
        &self,
        volunteer: Identity,
        request: &HelpRequest,
    ) -> Result<(), LifecycleError> {
        let active = self
            .requests
            .list_by_volunteer(volunteer.user_id, VolunteerScope::Active.statuses())
            .await?;
        if active.len() >= MAX_ACTIVE_ASSIGNMENTS {
            return Err(LifecycleError::NotAllowed(format!(
                "Volunteer already has {} requests in progress",
                MAX_ACTIVE_ASSIGNMENTS
            )));
        }

        if request.is_expired(Utc::now()) {
            return Err(LifecycleError::NotAllowed("Request has expired".to_string()));
        }

        let subscriptions = self.categories.volunteer_categories(volunteer.user_id).await?;
        if !matches_subscriptions(&subscriptions, request.category_id) {
            return Err(LifecycleError::NotAllowed(
                "Request is outside the volunteer's categories".to_string(),
            ));
        }

        if !self
            .matcher
            .is_candidate(volunteer.user_id, request.location(), request.radius_km)
            .await?
        {
            return Err(LifecycleError::NotAllowed(
                "Volunteer is not a candidate for this request".to_string(),
            ));
        }
        Ok(())
    }

    /// Volunteers in range of a request, for its owner or a moderator
    pub async fn candidates_for(
        &self,
        actor: Identity,
        id: Uuid,
    ) -> Result<Vec<Candidate>, LifecycleError> {
        let request = match actor.role {
            Role::Moderator => self.find(id).await?,
            _ => self.find_owned(actor, id).await?,
        };
        Ok(self
            .matcher
            .find_candidates_near(request.location(), request.radius_km)
            .await?)
    }

    /// Submitted, unexpired requests whose radius reaches the volunteer,
    /// limited to the volunteer's categories when they picked any
    pub async fn available_for(
        &self,
        volunteer: Identity,
    ) -> Result<Vec<AvailableRequest>, LifecycleError> {
        let user = self.active_user(volunteer.user_id).await?;
        if !user.is_verified {
            return Err(LifecycleError::NotAllowed(
                "Only verified volunteers can take requests".to_string(),
            ));
        }
        let home = user.location().ok_or_else(|| {
            LifecycleError::InvalidInput("Volunteer profile has no location".to_string())
        })?;
        let subscriptions = self.categories.volunteer_categories(user.id).await?;
        let now = Utc::now();

        let mut available: Vec<(f64, HelpRequest)> = self
            .requests
            .list_by_status(Some(RequestStatus::Submitted))
            .await?
            .into_iter()
            .filter(|request| !request.is_expired(now))
            .filter(|request| matches_subscriptions(&subscriptions, request.category_id))
            .filter_map(|request| {
                let distance = haversine_km(home, request.location());
                (distance <= request.radius_km).then_some((distance, request))
            })
            .collect();

        available.sort_by(|(da, a), (db, b)| {
            da.partial_cmp(db)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });

        Ok(available
            .into_iter()
            .map(|(distance_km, request)| AvailableRequest {
                request: request.into(),
                distance_km,
            })
            .collect())
    }

    pub async fn volunteer_requests(
        &self,
        volunteer: Identity,
        scope: VolunteerScope,
    ) -> Result<Vec<HelpRequest>, LifecycleError> {
        Ok(self
            .requests
            .list_by_volunteer(volunteer.user_id, scope.statuses())
            .await?)
    }

    pub async fn beneficiary_requests(
        &self,
        beneficiary: Identity,
        status: Option<RequestStatus>,
    ) -> Result<Vec<HelpRequest>, LifecycleError> {
        Ok(self
            .requests
            .list_by_beneficiary(beneficiary.user_id, status)
            .await?)
    }

    pub async fn list_all(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<HelpRequest>, LifecycleError> {
        Ok(self.requests.list_by_status(status).await?)
    }

    pub async fn history(&self, id: Uuid) -> Result<Vec<TransitionRecord>, LifecycleError> {
        self.find(id).await?;
        Ok(self.requests.transitions(id).await?)
    }

    /// Volunteers by completed requests, most first, ties by id
    pub async fn rating(&self) -> Result<Vec<VolunteerRating>, LifecycleError> {
        let counts = self.requests.completion_counts().await?;
        let ids: Vec<i32> = counts.iter().map(|(id, _)| *id).collect();
        let users: HashMap<i32, User> = self
            .users
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|user| (user.id, user))
            .collect();

        let mut rating: Vec<VolunteerRating> = counts
            .into_iter()
            .filter_map(|(id, completed)| {
                users.get(&id).map(|user| VolunteerRating {
                    volunteer_id: id,
                    firstname: user.firstname.clone(),
                    lastname: user.lastname.clone(),
                    completed,
                })
            })
            .collect();
        rating.sort_by(|a, b| {
            b.completed
                .cmp(&a.completed)
                .then_with(|| a.volunteer_id.cmp(&b.volunteer_id))
        });
        Ok(rating)
    }

    async fn active_user(&self, id: i32) -> Result<User, LifecycleError> {
        let user = self.users.find_by_id(id).await?.ok_or_else(|| {
            LifecycleError::NotAllowed(format!("User {} no longer exists", id))
        })?;
        if !user.is_active {
            return Err(LifecycleError::NotAllowed("Account is disabled".to_string()));
        }
        Ok(user)
    }
}
