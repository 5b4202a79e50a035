pub mod account_service;
pub mod error;
pub mod resource_service;
pub mod uniqueness;

pub use account_service::{AccountService, LoginResponse};
pub use error::ServiceError;
pub use resource_service::ResourceService;
pub use uniqueness::{check_unique, Conflict};
