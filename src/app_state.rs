use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use crate::config;
use crate::db::{NotificationRepository, ReportRepository};
use crate::i18n::Localizer;
use crate::modules::notifications::BroadcastNotifier;
use crate::modules::reports::ReportService;

#[derive(Clone)]
pub struct AppState {
    pub env: config::Config,
    pub ws_tx: Arc<Mutex<broadcast::Sender<String>>>,
    pub localizer: Arc<Localizer>,
    pub reports: Arc<ReportService>,
    pub notifications: Arc<NotificationRepository>,
}

impl AppState {
    /// Wires the in-memory stores, the websocket channel and the notifier together.
    pub fn new(env: config::Config, localizer: Arc<Localizer>) -> Self {
        let (tx, _rx) = broadcast::channel(env.notifications.channel_capacity.max(1));
        let ws_tx = Arc::new(Mutex::new(tx));

        let report_store = Arc::new(ReportRepository::new());
        let notifications = Arc::new(NotificationRepository::new());
        let notifier = BroadcastNotifier::new(
            notifications.clone(),
            report_store.clone(),
            localizer.clone(),
            env.app.language,
            ws_tx.clone(),
        );
        let reports = Arc::new(
            ReportService::new(report_store, Arc::new(notifier), env.uploads.clone())
                .with_failed_delivery_capacity(env.notifications.failed_delivery_capacity),
        );

        Self {
            env,
            ws_tx,
            localizer,
            reports,
            notifications,
        }
    }
}
