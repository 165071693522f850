// In-memory stores and a canned geocoder for service and handler tests

use axum::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use crate::auth::models::{NewUser, ProfileUpdate, Role, User};
use crate::auth::password::PasswordService;
use crate::auth::repository::UserStore;
use crate::categories::models::Category;
use crate::categories::repository::CategoryStore;
use crate::db::{StoreError, StoreResult};
use crate::geo::{BoundingBox, GeoPoint, Geocoder, GeocodingError};
use crate::requests::models::{
    HelpRequest, NewHelpRequest, RequestStatus, Transition, TransitionRecord,
};
use crate::requests::repository::RequestStore;

// ----------------------------------------------------------------------------
// Fixtures
// ----------------------------------------------------------------------------

fn user(id: i32, role: Role, location: Option<GeoPoint>) -> User {
    let now = Utc::now();
    User {
        id,
        role,
        phone_num: format!("380{:09}", id),
        tg_id: None,
        firstname: format!("{} {}", role, id),
        lastname: None,
        patronymic: None,
        password_hash: "not-a-real-hash".to_string(),
        latitude: location.map(|point| point.latitude),
        longitude: location.map(|point| point.longitude),
        address_name: None,
        is_verified: true,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

/// Active, verified volunteer living at `point`
pub fn volunteer_at(id: i32, point: GeoPoint) -> User {
    user(id, Role::Volunteer, Some(point))
}

/// Active, verified beneficiary living at `point`
pub fn beneficiary_at(id: i32, point: GeoPoint) -> User {
    user(id, Role::Beneficiary, Some(point))
}

/// Active, verified account that can log in with `password`
pub fn account_with_password(id: i32, role: Role, phone_num: &str, password: &str) -> User {
    let mut account = user(id, role, None);
    account.phone_num = phone_num.to_string();
    account.password_hash =
        PasswordService::hash_password(password).expect("hashing a test password");
    account
}

// ----------------------------------------------------------------------------
// Users
// ----------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            users: Mutex::new(users),
        }
    }

    pub fn get(&self, id: i32) -> Option<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.id == id)
            .cloned()
    }

    fn update<F>(&self, id: i32, apply: F) -> Option<User>
    where
        F: FnOnce(&mut User),
    {
        let mut users = self.users.lock().unwrap();
        let user = users.iter_mut().find(|user| user.id == id)?;
        apply(user);
        user.updated_at = Utc::now();
        Some(user.clone())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, new_user: NewUser) -> StoreResult<User> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|user| user.phone_num == new_user.phone_num) {
            return Err(StoreError::Duplicate("User with this phone number".into()));
        }

        let id = users.iter().map(|user| user.id).max().unwrap_or(0) + 1;
        let now = Utc::now();
        let (latitude, longitude, address_name) = match new_user.location {
            Some(location) => (
                Some(location.point.latitude),
                Some(location.point.longitude),
                location.address_name,
            ),
            None => (None, None, None),
        };
        let created = User {
            id,
            role: new_user.role,
            phone_num: new_user.phone_num,
            tg_id: new_user.tg_id,
            firstname: new_user.firstname,
            lastname: new_user.lastname,
            patronymic: new_user.patronymic,
            password_hash: new_user.password_hash,
            latitude,
            longitude,
            address_name,
            is_verified: new_user.is_verified,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: i32) -> StoreResult<Option<User>> {
        Ok(self.get(id))
    }

    async fn find_by_phone(&self, phone_num: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.phone_num == phone_num)
            .cloned())
    }

    async fn find_by_ids(&self, ids: &[i32]) -> StoreResult<Vec<User>> {
        let mut found: Vec<User> = self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|user| ids.contains(&user.id))
            .cloned()
            .collect();
        found.sort_by_key(|user| user.id);
        Ok(found)
    }

    async fn update_profile(&self, id: i32, update: ProfileUpdate) -> StoreResult<Option<User>> {
        Ok(self.update(id, |user| {
            if let Some(firstname) = update.firstname {
                user.firstname = firstname;
            }
            if let Some(lastname) = update.lastname {
                user.lastname = Some(lastname);
            }
            if let Some(patronymic) = update.patronymic {
                user.patronymic = Some(patronymic);
            }
            if let Some(tg_id) = update.tg_id {
                user.tg_id = Some(tg_id);
            }
            if let Some(location) = update.location {
                user.latitude = Some(location.point.latitude);
                user.longitude = Some(location.point.longitude);
                user.address_name = location.address_name;
            }
        }))
    }

    async fn set_verified(&self, id: i32, verified: bool) -> StoreResult<Option<User>> {
        Ok(self.update(id, |user| user.is_verified = verified))
    }

    async fn deactivate(&self, id: i32) -> StoreResult<Option<User>> {
        Ok(self.update(id, |user| user.is_active = false))
    }

    async fn list_unverified(&self) -> StoreResult<Vec<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|user| !user.is_verified && user.is_active)
            .cloned()
            .collect())
    }

    async fn volunteers_within(&self, bbox: BoundingBox) -> StoreResult<Vec<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|user| user.role == Role::Volunteer && user.is_active && user.is_verified)
            .filter(|user| user.location().map_or(false, |point| bbox.contains(point)))
            .cloned()
            .collect())
    }
}

// ----------------------------------------------------------------------------
// Categories
// ----------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryCategoryStore {
    categories: Mutex<Vec<Category>>,
    subscriptions: Mutex<HashMap<i32, Vec<i32>>>,
}

#[async_trait]
impl CategoryStore for MemoryCategoryStore {
    async fn create(&self, name: &str, parent_id: Option<i32>) -> StoreResult<Category> {
        let mut categories = self.categories.lock().unwrap();
        let category = Category {
            id: categories.len() as i32 + 1,
            name: name.to_string(),
            parent_id,
            is_active: true,
        };
        categories.push(category.clone());
        Ok(category)
    }

    async fn find_by_id(&self, id: i32) -> StoreResult<Option<Category>> {
        Ok(self
            .categories
            .lock()
            .unwrap()
            .iter()
            .find(|category| category.id == id)
            .cloned())
    }

    async fn list(&self, include_inactive: bool) -> StoreResult<Vec<Category>> {
        Ok(self
            .categories
            .lock()
            .unwrap()
            .iter()
            .filter(|category| include_inactive || category.is_active)
            .cloned()
            .collect())
    }

    async fn deactivate(&self, id: i32) -> StoreResult<Option<Category>> {
        let mut categories = self.categories.lock().unwrap();
        Ok(categories
            .iter_mut()
            .find(|category| category.id == id)
            .map(|category| {
                category.is_active = false;
                category.clone()
            }))
    }

    async fn volunteer_categories(&self, user_id: i32) -> StoreResult<Vec<i32>> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_volunteer_categories(&self, user_id: i32, category_ids: &[i32]) -> StoreResult<()> {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(user_id, category_ids.to_vec());
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Help requests
// ----------------------------------------------------------------------------

#[derive(Default)]
struct RequestTables {
    requests: Vec<HelpRequest>,
    transitions: Vec<TransitionRecord>,
}

/// Request store whose compare-and-set runs under one lock
#[derive(Default)]
pub struct MemoryRequestStore {
    tables: Mutex<RequestTables>,
    yield_before_write: bool,
    write_attempts: AtomicUsize,
}

impl MemoryRequestStore {
    /// Hands control back to the runtime before every transition write, so
    /// joined callers read the same row before either of them writes
    pub fn yielding() -> Self {
        Self {
            yield_before_write: true,
            ..Self::default()
        }
    }

    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    fn select<F>(&self, predicate: F) -> Vec<HelpRequest>
    where
        F: Fn(&HelpRequest) -> bool,
    {
        // Newest first
        self.tables
            .lock()
            .unwrap()
            .requests
            .iter()
            .rev()
            .filter(|request| predicate(request))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RequestStore for MemoryRequestStore {
    async fn insert(&self, request: NewHelpRequest) -> StoreResult<HelpRequest> {
        let now = Utc::now();
        let inserted = HelpRequest {
            id: Uuid::new_v4(),
            beneficiary_id: request.beneficiary_id,
            category_id: request.category_id,
            description: request.description,
            latitude: request.location.point.latitude,
            longitude: request.location.point.longitude,
            address_name: request.location.address_name,
            radius_km: request.radius_km,
            status: RequestStatus::Submitted,
            assigned_volunteer_id: None,
            active_to: request.active_to,
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().unwrap().requests.push(inserted.clone());
        Ok(inserted)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<HelpRequest>> {
        Ok(self.select(|request| request.id == id).into_iter().next())
    }

    async fn list_by_beneficiary(
        &self,
        beneficiary_id: i32,
        status: Option<RequestStatus>,
    ) -> StoreResult<Vec<HelpRequest>> {
        Ok(self.select(|request| {
            request.beneficiary_id == beneficiary_id
                && status.map_or(true, |status| request.status == status)
        }))
    }

    async fn list_by_volunteer(
        &self,
        volunteer_id: i32,
        statuses: &[RequestStatus],
    ) -> StoreResult<Vec<HelpRequest>> {
        Ok(self.select(|request| {
            request.assigned_volunteer_id == Some(volunteer_id)
                && statuses.contains(&request.status)
        }))
    }

    async fn list_by_status(&self, status: Option<RequestStatus>) -> StoreResult<Vec<HelpRequest>> {
        Ok(self.select(|request| status.map_or(true, |status| request.status == status)))
    }

    async fn apply_transition(&self, transition: Transition) -> StoreResult<Option<HelpRequest>> {
        if self.yield_before_write {
            tokio::task::yield_now().await;
        }
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables.lock().unwrap();
        let Some(request) = tables
            .requests
            .iter_mut()
            .find(|request| request.id == transition.request_id && request.status == transition.from)
        else {
            return Ok(None);
        };

        let now = Utc::now();
        request.status = transition.to;
        request.assigned_volunteer_id = transition.assigned_volunteer_id;
        request.updated_at = now;
        let updated = request.clone();

        tables.transitions.push(TransitionRecord {
            request_id: transition.request_id,
            from_status: transition.from,
            to_status: transition.to,
            actor_id: transition.actor_id,
            created_at: now,
        });
        Ok(Some(updated))
    }

    async fn transitions(&self, request_id: Uuid) -> StoreResult<Vec<TransitionRecord>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .transitions
            .iter()
            .filter(|record| record.request_id == request_id)
            .cloned()
            .collect())
    }

    async fn completion_counts(&self) -> StoreResult<Vec<(i32, i64)>> {
        let mut counts: HashMap<i32, i64> = HashMap::new();
        for request in self.select(|request| request.status == RequestStatus::Completed) {
            if let Some(volunteer_id) = request.assigned_volunteer_id {
                *counts.entry(volunteer_id).or_default() += 1;
            }
        }
        let mut counts: Vec<(i32, i64)> = counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(counts)
    }
}

// ----------------------------------------------------------------------------
// Geocoding
// ----------------------------------------------------------------------------

/// Geocoder answering from a fixed address book.
///
/// Unknown addresses and points without a known address are `NotFound`.
/// `failing_first(n, err)` makes the next `n` calls fail with `err`.
#[derive(Default)]
pub struct StaticGeocoder {
    addresses: HashMap<String, GeoPoint>,
    failures: Mutex<(usize, Option<GeocodingError>)>,
    calls: AtomicUsize,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(mut self, address: &str, point: GeoPoint) -> Self {
        self.addresses.insert(address.to_string(), point);
        self
    }

    pub fn failing_first(self, count: usize, error: GeocodingError) -> Self {
        *self.failures.lock().unwrap() = (count, Some(error));
        self
    }

    /// Forward and reverse lookups attempted so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn injected_failure(&self) -> Option<GeocodingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut failures = self.failures.lock().unwrap();
        if failures.0 == 0 {
            return None;
        }
        failures.0 -= 1;
        failures.1.clone()
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeoPoint, GeocodingError> {
        if let Some(err) = self.injected_failure() {
            return Err(err);
        }
        self.addresses
            .get(address)
            .copied()
            .ok_or_else(|| GeocodingError::NotFound(address.to_string()))
    }

    async fn reverse(&self, point: GeoPoint) -> Result<String, GeocodingError> {
        if let Some(err) = self.injected_failure() {
            return Err(err);
        }
        self.addresses
            .iter()
            .find(|(_, known)| **known == point)
            .map(|(address, _)| address.clone())
            .ok_or_else(|| GeocodingError::NotFound(format!("{},{}", point.latitude, point.longitude)))
    }
}
