// Volunteer Hub backend: matches beneficiaries' help requests with nearby
// volunteers and tracks each request through its lifecycle

pub mod accounts;
pub mod auth;
pub mod categories;
pub mod config;
pub mod db;
pub mod error;
pub mod geo;
pub mod requests;
pub mod validation;

#[cfg(test)]
mod testing;

use axum::{
    http::HeaderValue,
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use accounts::handlers as account_handlers;
use accounts::AccountService;
use auth::handlers as auth_handlers;
use auth::models::Role;
use auth::{enforce, RequireRole, RoleGuard, TokenService, UserStore};
use categories::handlers as category_handlers;
use categories::{CategoryService, CategoryStore};
use geo::handlers as geo_handlers;
use geo::{GeoMatcher, Geocoder};
use requests::handlers as request_handlers;
use requests::{RequestService, RequestStore};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        auth::handlers::register_handler,
        auth::handlers::login_handler,
        auth::handlers::refresh_handler,
        auth::handlers::me_handler,
        accounts::handlers::volunteer_profile_handler,
        accounts::handlers::update_volunteer_profile_handler,
        accounts::handlers::disable_volunteer_handler,
        accounts::handlers::disable_beneficiary_handler,
        accounts::handlers::unverified_users_handler,
        accounts::handlers::verify_user_handler,
        accounts::handlers::disable_user_handler,
        accounts::handlers::create_staff_handler,
        accounts::handlers::list_roles_handler,
        categories::handlers::create_category_handler,
        categories::handlers::deactivate_category_handler,
        categories::handlers::list_categories_handler,
        geo::handlers::nearby_volunteers_handler,
        requests::handlers::submit_request_handler,
        requests::handlers::my_requests_handler,
        requests::handlers::my_request_handler,
        requests::handlers::request_candidates_handler,
        requests::handlers::beneficiary_cancel_handler,
        requests::handlers::available_requests_handler,
        requests::handlers::volunteer_requests_handler,
        requests::handlers::accept_request_handler,
        requests::handlers::start_request_handler,
        requests::handlers::volunteer_finish_handler,
        requests::handlers::rating_handler,
        requests::handlers::all_requests_handler,
        requests::handlers::request_history_handler,
        requests::handlers::moderator_candidates_handler,
        requests::handlers::moderator_cancel_handler,
        requests::handlers::moderator_finish_handler,
    ),
    components(
        schemas(
            auth::models::Role,
            auth::models::UserResponse,
            auth::models::RegisterRequest,
            auth::models::LoginRequest,
            auth::models::RefreshRequest,
            auth::models::AuthResponse,
            accounts::models::UpdateVolunteerProfile,
            accounts::models::VolunteerProfile,
            accounts::models::CreateStaffRequest,
            categories::models::Category,
            categories::models::CreateCategoryRequest,
            geo::GeoPoint,
            geo::LocationInput,
            geo::LocationResponse,
            geo::Candidate,
            requests::models::RequestStatus,
            requests::models::VolunteerScope,
            requests::models::CreateHelpRequest,
            requests::models::HelpRequestResponse,
            requests::models::AvailableRequest,
            requests::models::TransitionRecord,
            requests::models::VolunteerRating,
            error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and token refresh"),
        (name = "volunteer", description = "Volunteer profile and request handling"),
        (name = "beneficiary", description = "Help request submission and tracking"),
        (name = "moderator", description = "Moderation of users, categories and requests"),
        (name = "developers", description = "Reference data for integrators")
    ),
    info(
        title = "Volunteer Hub API",
        version = "1.0.0",
        description = "Matches help requests with nearby volunteers"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenService>,
    pub default_radius_km: f64,
    pub matcher: GeoMatcher,
    pub auth_service: auth::AuthService,
    pub account_service: AccountService,
    pub category_service: CategoryService,
    pub request_service: RequestService,
}

impl AppState {
    /// Wires the services on top of the given stores and geocoder
    pub fn new(
        tokens: Arc<TokenService>,
        default_radius_km: f64,
        users: Arc<dyn UserStore>,
        categories: Arc<dyn CategoryStore>,
        requests: Arc<dyn RequestStore>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        let matcher = GeoMatcher::new(users.clone(), geocoder.clone());
        let category_service = CategoryService::new(categories);

        Self {
            auth_service: auth::AuthService::new(users.clone(), geocoder.clone(), tokens.clone()),
            account_service: AccountService::new(
                users.clone(),
                category_service.clone(),
                geocoder.clone(),
            ),
            request_service: RequestService::new(
                requests,
                users,
                category_service.clone(),
                matcher.clone(),
                geocoder,
                default_radius_km,
            ),
            category_service,
            matcher,
            tokens,
            default_radius_km,
        }
    }

    fn guard(&self, required: RequireRole) -> RoleGuard {
        RoleGuard::new(self.tokens.clone(), required)
    }
}

const VOLUNTEER: &[Role] = &[Role::Volunteer];
const BENEFICIARY: &[Role] = &[Role::Beneficiary];
const MODERATOR: &[Role] = &[Role::Moderator];
const DEVELOPERS: &[Role] = &[Role::Developer, Role::Moderator];

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Builds the router. `cors_origins` of `None` allows any origin.
pub fn create_router(state: AppState, cors_origins: Option<&[String]>) -> Router {
    let guarded = |routes: Router<AppState>, required: RequireRole| {
        routes.route_layer(middleware::from_fn_with_state(state.guard(required), enforce))
    };

    let public = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth_handlers::register_handler))
        .route("/auth/login", post(auth_handlers::login_handler))
        .route("/auth/refresh", post(auth_handlers::refresh_handler));

    let authenticated = guarded(
        Router::new().route("/auth/me", get(auth_handlers::me_handler)),
        RequireRole::authenticated(),
    );

    let volunteer = guarded(
        Router::new()
            .route(
                "/volunteer/profile",
                get(account_handlers::volunteer_profile_handler)
                    .patch(account_handlers::update_volunteer_profile_handler)
                    .delete(account_handlers::disable_volunteer_handler),
            )
            .route("/volunteer/requests", get(request_handlers::volunteer_requests_handler))
            .route(
                "/volunteer/requests/available",
                get(request_handlers::available_requests_handler),
            )
            .route(
                "/volunteer/requests/:id/accept",
                post(request_handlers::accept_request_handler),
            )
            .route(
                "/volunteer/requests/:id/start",
                post(request_handlers::start_request_handler),
            )
            .route(
                "/volunteer/requests/:id/finish",
                post(request_handlers::volunteer_finish_handler),
            )
            .route("/volunteer/rating", get(request_handlers::rating_handler)),
        RequireRole::any_of(VOLUNTEER),
    );

    let beneficiary = guarded(
        Router::new()
            .route(
                "/beneficiary/profile",
                delete(account_handlers::disable_beneficiary_handler),
            )
            .route(
                "/beneficiary/requests",
                post(request_handlers::submit_request_handler)
                    .get(request_handlers::my_requests_handler),
            )
            .route("/beneficiary/requests/:id", get(request_handlers::my_request_handler))
            .route(
                "/beneficiary/requests/:id/candidates",
                get(request_handlers::request_candidates_handler),
            )
            .route(
                "/beneficiary/requests/:id/cancel",
                post(request_handlers::beneficiary_cancel_handler),
            ),
        RequireRole::any_of(BENEFICIARY),
    );

    let moderator = guarded(
        Router::new()
            .route(
                "/moderator/users/unverified",
                get(account_handlers::unverified_users_handler),
            )
            .route(
                "/moderator/users/:id/verify",
                post(account_handlers::verify_user_handler),
            )
            .route(
                "/moderator/users/:id/disable",
                post(account_handlers::disable_user_handler),
            )
            .route("/moderator/staff", post(account_handlers::create_staff_handler))
            .route(
                "/moderator/categories",
                post(category_handlers::create_category_handler),
            )
            .route(
                "/moderator/categories/:id",
                delete(category_handlers::deactivate_category_handler),
            )
            .route(
                "/moderator/volunteers/nearby",
                get(geo_handlers::nearby_volunteers_handler),
            )
            .route("/moderator/requests", get(request_handlers::all_requests_handler))
            .route(
                "/moderator/requests/:id/history",
                get(request_handlers::request_history_handler),
            )
            .route(
                "/moderator/requests/:id/candidates",
                get(request_handlers::moderator_candidates_handler),
            )
            .route(
                "/moderator/requests/:id/cancel",
                post(request_handlers::moderator_cancel_handler),
            )
            .route(
                "/moderator/requests/:id/finish",
                post(request_handlers::moderator_finish_handler),
            ),
        RequireRole::any_of(MODERATOR),
    );

    let developers = guarded(
        Router::new()
            .route("/developers/roles", get(account_handlers::list_roles_handler))
            .route(
                "/developers/categories",
                get(category_handlers::list_categories_handler),
            ),
        RequireRole::any_of(DEVELOPERS),
    );

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public)
        .merge(authenticated)
        .merge(volunteer)
        .merge(beneficiary)
        .merge(moderator)
        .merge(developers)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

fn cors_layer(origins: Option<&[String]>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origins {
        Some(origins) => {
            let allowed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                        None
                    }
                })
                .collect();
            layer.allow_origin(allowed)
        }
        None => {
            tracing::warn!("CORS_ALLOWED_ORIGINS not set; allowing any origin");
            layer.allow_origin(Any)
        }
    }
}
