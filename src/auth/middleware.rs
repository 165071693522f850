// Role guard for protected route groups

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::auth::error::AuthError;
use crate::auth::models::{Identity, Role};
use crate::auth::token::TokenService;
use crate::error::ApiError;

/// Which roles may pass a guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequireRole {
    /// Any verified token, whatever the role
    Authenticated,
    AnyOf(&'static [Role]),
}

impl RequireRole {
    pub const fn authenticated() -> Self {
        RequireRole::Authenticated
    }

    pub const fn any_of(roles: &'static [Role]) -> Self {
        RequireRole::AnyOf(roles)
    }

    pub fn allows(&self, role: Role) -> bool {
        match self {
            RequireRole::Authenticated => true,
            RequireRole::AnyOf(roles) => roles.contains(&role),
        }
    }
}

/// Extracts the credential from an `Authorization: Bearer <token>` header
pub fn bearer_token(header: Option<&HeaderValue>) -> Result<&str, AuthError> {
    let value = header
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MalformedHeader)
}

/// Resolves the caller's identity and checks it against the required roles
pub fn authorize(
    tokens: &TokenService,
    header: Option<&HeaderValue>,
    required: RequireRole,
) -> Result<Identity, AuthError> {
    let identity = tokens.verify(bearer_token(header)?)?;
    if !required.allows(identity.role) {
        return Err(AuthError::InsufficientPermissions {
            actual: identity.role,
        });
    }
    Ok(identity)
}

/// State for one guarded route group
#[derive(Clone)]
pub struct RoleGuard {
    tokens: Arc<TokenService>,
    required: RequireRole,
}

impl RoleGuard {
    pub fn new(tokens: Arc<TokenService>, required: RequireRole) -> Self {
        Self { tokens, required }
    }
}

/// Middleware function; use with `axum::middleware::from_fn_with_state`.
///
/// On success the caller's `Identity` is stored in the request extensions
/// for handlers to pick up.
pub async fn enforce(
    State(guard): State<RoleGuard>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let endpoint = request.uri().path().to_string();

    let identity = authorize(
        &guard.tokens,
        request.headers().get(header::AUTHORIZATION),
        guard.required,
    )
    .map_err(|err| err.into_guard_rejection(&endpoint))?;

    debug!(
        "Authorization successful: user_id={}, role={}, endpoint={}",
        identity.user_id, identity.role, endpoint
    );
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Only present behind a RoleGuard
        parts
            .extensions
            .get::<Identity>()
            .copied()
            .ok_or(AuthError::MissingToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, middleware, routing::get, Router};
    use axum_test::TestServer;

    const STAFF: &[Role] = &[Role::Developer, Role::Moderator];

    fn test_token_service() -> Arc<TokenService> {
        Arc::new(TokenService::new("test_secret_key_for_testing_purposes", 900, 604_800))
    }

    fn header(value: &str) -> HeaderValue {
        HeaderValue::from_str(value).unwrap()
    }

    async fn whoami(identity: Identity) -> String {
        format!("{}:{}", identity.user_id, identity.role)
    }

    fn guarded_server(tokens: Arc<TokenService>, required: RequireRole) -> TestServer {
        let app = Router::new()
            .route("/guarded", get(whoami))
            .layer(middleware::from_fn_with_state(
                RoleGuard::new(tokens, required),
                enforce,
            ));
        TestServer::new(app).unwrap()
    }

    #[test]
    fn bearer_prefix_is_required() {
        assert!(matches!(bearer_token(None), Err(AuthError::MissingToken)));
        for value in ["Basic dXNlcjpwYXNz", "token_without_bearer", "Bearer ", ""] {
            assert!(matches!(
                bearer_token(Some(&header(value))),
                Err(AuthError::MalformedHeader)
            ));
        }
        assert_eq!(bearer_token(Some(&header("Bearer abc"))).unwrap(), "abc");
    }

    #[test]
    fn role_sets() {
        assert!(RequireRole::authenticated().allows(Role::Beneficiary));
        assert!(RequireRole::any_of(STAFF).allows(Role::Moderator));
        assert!(!RequireRole::any_of(STAFF).allows(Role::Volunteer));
    }

    #[test]
    fn authorize_checks_role_membership() {
        let tokens = test_token_service();
        let token = tokens.issue(3, Role::Volunteer).unwrap();
        let value = header(&format!("Bearer {}", token));

        let identity = authorize(&tokens, Some(&value), RequireRole::any_of(&[Role::Volunteer])).unwrap();
        assert_eq!(identity, Identity { user_id: 3, role: Role::Volunteer });

        assert!(matches!(
            authorize(&tokens, Some(&value), RequireRole::any_of(STAFF)),
            Err(AuthError::InsufficientPermissions { actual: Role::Volunteer })
        ));
    }

    #[tokio::test]
    async fn guard_passes_identity_to_handler() {
        let tokens = test_token_service();
        let token = tokens.issue(42, Role::Developer).unwrap();
        let server = guarded_server(tokens, RequireRole::any_of(STAFF));

        let response = server
            .get("/guarded")
            .add_header(header::AUTHORIZATION, header(&format!("Bearer {}", token)))
            .await;

        response.assert_status_ok();
        response.assert_text("42:developer");
    }

    #[tokio::test]
    async fn missing_token_is_401() {
        let server = guarded_server(test_token_service(), RequireRole::authenticated());
        let response = server.get("/guarded").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error_code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn token_from_another_key_is_401() {
        let foreign = TokenService::new("another_secret", 900, 604_800);
        let token = foreign.issue(1, Role::Moderator).unwrap();
        let server = guarded_server(test_token_service(), RequireRole::authenticated());

        let response = server
            .get("/guarded")
            .add_header(header::AUTHORIZATION, header(&format!("Bearer {}", token)))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_token_does_not_open_the_guard() {
        let tokens = test_token_service();
        let (_, refresh) = tokens.issue_pair(1, Role::Moderator).unwrap();
        let server = guarded_server(tokens, RequireRole::authenticated());

        let response = server
            .get("/guarded")
            .add_header(header::AUTHORIZATION, header(&format!("Bearer {}", refresh)))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_role_is_403() {
        let tokens = test_token_service();
        let token = tokens.issue(1, Role::Beneficiary).unwrap();
        let server = guarded_server(tokens, RequireRole::any_of(STAFF));

        let response = server
            .get("/guarded")
            .add_header(header::AUTHORIZATION, header(&format!("Bearer {}", token)))
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error_code"], "FORBIDDEN");
        assert_eq!(body["message"], "Insufficient permissions");
    }
}
