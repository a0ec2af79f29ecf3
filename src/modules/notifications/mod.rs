pub mod emitter;
pub mod handlers;
pub mod routes;

pub use emitter::BroadcastNotifier;
pub use routes::notification_routes;
