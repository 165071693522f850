// Category catalogue maintained by moderators

pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

pub use error::CategoryError;
pub use models::{Category, CreateCategoryRequest};
pub use repository::{CategoryRepository, CategoryStore};
pub use service::CategoryService;
