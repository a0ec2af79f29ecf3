use thiserror::Error;
use uuid::Uuid;

use crate::workflow::ReportStatus;

#[derive(Error, Debug, PartialEq)]
pub enum StoreError {
    #[error("Report {0} not found")]
    ReportNotFound(Uuid),

    #[error("Notification {0} not found")]
    NotificationNotFound(Uuid),

    #[error("Report cannot be edited while {0}")]
    NotEditable(ReportStatus),

    #[error("Store lock poisoned")]
    LockPoisoned,
}
