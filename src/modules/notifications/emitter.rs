use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use validator::Validate;

use crate::db::models::{NewNotification, NotificationType};
use crate::db::{NotificationRepository, ReportRepository};
use crate::fluent_args;
use crate::i18n::{Localizer, SupportedLanguage};
use crate::workflow::{EmitError, NotificationEmitter, ReportEvent, ReportStatus};

/// Stores a notification for every report event and pushes it to websocket clients.
pub struct BroadcastNotifier {
    notifications: Arc<NotificationRepository>,
    reports: Arc<ReportRepository>,
    localizer: Arc<Localizer>,
    language: SupportedLanguage,
    ws_tx: Arc<Mutex<broadcast::Sender<String>>>,
}

impl BroadcastNotifier {
    pub fn new(
        notifications: Arc<NotificationRepository>,
        reports: Arc<ReportRepository>,
        localizer: Arc<Localizer>,
        language: SupportedLanguage,
        ws_tx: Arc<Mutex<broadcast::Sender<String>>>,
    ) -> Self {
        Self {
            notifications,
            reports,
            localizer,
            language,
            ws_tx,
        }
    }

    fn status_label(&self, status: ReportStatus) -> String {
        self.localizer
            .text(&self.language, &format!("status-{}", status.as_canonical()), None)
    }
}

pub fn notification_type_for(status: ReportStatus) -> NotificationType {
    match status {
        ReportStatus::Approved => NotificationType::Success,
        ReportStatus::Rejected => NotificationType::Error,
        ReportStatus::RevisionRequested => NotificationType::Warning,
        _ => NotificationType::Info,
    }
}

impl NotificationEmitter for BroadcastNotifier {
    fn emit(&self, event: &ReportEvent) -> Result<(), EmitError> {
        let report_title = self
            .reports
            .get(event.report_id)
            .map(|report| report.fields.title)
            .unwrap_or_else(|_| event.report_id.to_string());

        let title = self.localizer.text(
            &self.language,
            &format!("notification-title-{}", event.to_status.as_canonical()),
            None,
        );
        let from = self.status_label(event.from_status);
        let to = self.status_label(event.to_status);
        let args = fluent_args![
            "title" => report_title.as_str(),
            "from" => from.as_str(),
            "to" => to.as_str(),
        ];
        let message = self
            .localizer
            .text(&self.language, "report-status-changed", Some(&args));

        let new_notification = NewNotification {
            title,
            message,
            notification_type: notification_type_for(event.to_status),
            link: Some(format!("/reports/{}", event.report_id)),
            payload: Some(serde_json::to_value(event)?),
        };
        new_notification
            .validate()
            .map_err(|errors| EmitError::Invalid(errors.to_string()))?;

        let notification = self
            .notifications
            .create(new_notification)
            .map_err(|err| EmitError::Persistence(err.to_string()))?;

        let pushed = serde_json::to_string(&notification)?;
        let tx = self
            .ws_tx
            .lock()
            .map_err(|_| EmitError::Persistence("websocket channel lock poisoned".to_string()))?
            .clone();
        if tx.send(pushed).is_err() {
            // Nobody is connected; the stored notification is still listed over HTTP.
            tracing::debug!(notification_id = %notification.id, "No websocket subscribers");
        }

        tracing::info!(
            notification_id = %notification.id,
            report_id = %event.report_id,
            to_status = %event.to_status,
            "Notification emitted"
        );
        Ok(())
    }
}
