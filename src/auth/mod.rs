// Authentication module
// JWT-based authentication with phone/password registration, login, token
// refresh and role-based route guards

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;
pub mod token;

pub use error::AuthError;
pub use handlers::{login_handler, me_handler, refresh_handler, register_handler};
pub use middleware::{authorize, enforce, RequireRole, RoleGuard};
pub use models::{
    AuthResponse, Identity, LoginRequest, NewUser, ProfileUpdate, RefreshRequest,
    RegisterRequest, Role, User, UserResponse,
};
pub use password::PasswordService;
pub use repository::{UserRepository, UserStore};
pub use service::AuthService;
pub use token::TokenService;
