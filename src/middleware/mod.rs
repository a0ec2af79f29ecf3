pub mod actor;
pub mod tracing;

pub use actor::{ACTOR_ID_HEADER, ACTOR_PERMISSIONS_HEADER};
pub use self::tracing::observability_middleware;
