pub mod notifications;
pub mod reports;
