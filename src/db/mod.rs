pub mod error;
pub mod models;
pub mod repositories;

pub use error::StoreError;
pub use models::*;
pub use repositories::{NotificationRepository, ReportRepository};
