pub mod handlers;
pub mod interval;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use services::AvailabilityService;
