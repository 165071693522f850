// Account management: volunteer profiles, self-disable and moderation

pub mod error;
pub mod handlers;
pub mod models;
pub mod service;

pub use error::AccountError;
pub use models::{CreateStaffRequest, UpdateVolunteerProfile, VolunteerProfile};
pub use service::AccountService;
