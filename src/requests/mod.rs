// Help requests: submission, matching and the status lifecycle

pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod status_machine;

pub use error::LifecycleError;
pub use models::{
    AvailableRequest, CreateHelpRequest, HelpRequest, HelpRequestResponse, NewHelpRequest,
    RequestEvent, RequestStatus, Transition, TransitionRecord, VolunteerRating, VolunteerScope,
};
pub use repository::{RequestRepository, RequestStore};
pub use service::RequestService;
pub use status_machine::StatusMachine;
