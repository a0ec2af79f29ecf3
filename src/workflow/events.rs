use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use super::ReportStatus;

/// Emitted once per committed transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEvent {
    pub report_id: Uuid,
    pub from_status: ReportStatus,
    pub to_status: ReportStatus,
    pub actor_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("Notification rejected: {0}")]
    Invalid(String),

    #[error("Failed to persist notification: {0}")]
    Persistence(String),

    #[error("Failed to encode notification: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Turns report events into notifications.
///
/// Called after the transition has been committed. A failure here never undoes the
/// transition; the caller records it for retry.
pub trait NotificationEmitter: Send + Sync {
    fn emit(&self, event: &ReportEvent) -> Result<(), EmitError>;
}
