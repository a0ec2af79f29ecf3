pub mod handlers;
pub mod routes;
pub mod service;

pub use routes::report_routes;
pub use service::{spawn_delivery_retry, AllowedTransitions, ReportService};
