use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::db::models::{Attachment, GeotaggedPhoto, Report, ReportFields, UpdateReport, UploadedFile};
use crate::db::{ReportRepository, StoreError};
use crate::error::{AppError, AppResult};
use crate::workflow::permissions::{ATTACHMENTS_UPLOAD, REPORTS_CREATE, REPORTS_READ, REPORTS_UPDATE};
use crate::workflow::{
    allowed_targets, check_upload, extract_geotag_within, request_transition_to, Actor,
    required_permission, NotificationEmitter, ReportEvent, ReportStatus,
};

/// Report operations for the HTTP layer.
///
/// Every write goes through `ReportRepository::mutate`, so reads, checks and the
/// commit for one report happen under that report's lock. Events are handed to the
/// emitter after the lock is released.
pub struct ReportService {
    reports: Arc<ReportRepository>,
    emitter: Arc<dyn NotificationEmitter>,
    uploads: UploadConfig,
    failed_deliveries: Mutex<VecDeque<ReportEvent>>,
    failed_delivery_capacity: usize,
}

const DEFAULT_FAILED_DELIVERY_CAPACITY: usize = 1000;

/// The statuses an actor may request next, read from one snapshot of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowedTransitions {
    pub current_status: ReportStatus,
    pub allowed: Vec<ReportStatus>,
}

impl ReportService {
    pub fn new(
        reports: Arc<ReportRepository>,
        emitter: Arc<dyn NotificationEmitter>,
        uploads: UploadConfig,
    ) -> Self {
        Self {
            reports,
            emitter,
            uploads,
            failed_deliveries: Mutex::new(VecDeque::new()),
            failed_delivery_capacity: DEFAULT_FAILED_DELIVERY_CAPACITY,
        }
    }

    pub fn with_failed_delivery_capacity(mut self, capacity: usize) -> Self {
        self.failed_delivery_capacity = capacity;
        self
    }

    pub fn create_report(&self, actor: &Actor, fields: ReportFields) -> AppResult<Report> {
        require(actor, REPORTS_CREATE)?;

        let report = self
            .reports
            .insert(Report::new_draft(fields, actor.id, OffsetDateTime::now_utc()))?;
        info!(report_id = %report.id, actor_id = %actor.id, "Report created");
        Ok(report)
    }

    pub fn get_report(&self, actor: &Actor, report_id: Uuid) -> AppResult<Report> {
        require(actor, REPORTS_READ)?;
        Ok(self.reports.get(report_id)?)
    }

    pub fn list_reports(&self, actor: &Actor) -> AppResult<Vec<Report>> {
        require(actor, REPORTS_READ)?;
        Ok(self.reports.list()?)
    }

    /// Field edits are only accepted while the report is a draft or sent back for revision.
    pub fn update_report(&self, actor: &Actor, report_id: Uuid, changes: UpdateReport) -> AppResult<Report> {
        require(actor, REPORTS_UPDATE)?;

        let report = self.reports.mutate(report_id, |current| {
            ensure_editable(current)?;
            let mut updated = current.clone();
            changes.apply_to(&mut updated.fields);
            updated.touch(actor.id, OffsetDateTime::now_utc());
            Ok::<_, AppError>((updated.clone(), updated))
        })?;

        info!(report_id = %report.id, version = report.version, "Report updated");
        Ok(report)
    }

    /// Statuses `actor` could move the report to right now, ignoring field completeness.
    pub fn allowed_transitions(&self, actor: &Actor, report_id: Uuid) -> AppResult<AllowedTransitions> {
        require(actor, REPORTS_READ)?;
        let current_status = self.reports.get(report_id)?.status();

        let allowed = allowed_targets(current_status)
            .into_iter()
            .filter(|target| {
                required_permission(current_status, *target)
                    .is_some_and(|required| actor.can(required))
            })
            .collect();

        Ok(AllowedTransitions {
            current_status,
            allowed,
        })
    }

    /// Runs the state machine against the stored report and commits the result.
    ///
    /// A rejected request leaves the stored report as it was. Once committed, the
    /// transition stands even if the notification cannot be delivered.
    pub fn transition(
        &self,
        actor: &Actor,
        report_id: Uuid,
        raw_target: &str,
        comment: Option<String>,
    ) -> AppResult<Report> {
        let outcome = self.reports.mutate(report_id, |current| {
            let transition = request_transition_to(current, actor, raw_target, comment)?;
            Ok::<_, AppError>((transition.report.clone(), transition))
        });

        let transition = match outcome {
            Ok(transition) => transition,
            Err(AppError::Transition(rejection)) => {
                warn!(
                    report_id = %report_id,
                    actor_id = %actor.id,
                    target = raw_target,
                    reason = %rejection,
                    "Transition rejected"
                );
                return Err(rejection.into());
            }
            Err(other) => return Err(other),
        };

        info!(
            report_id = %report_id,
            actor_id = %actor.id,
            from = %transition.event.from_status,
            to = %transition.event.to_status,
            version = transition.report.version,
            "Transition committed"
        );

        self.deliver(transition.event);
        Ok(transition.report)
    }

    /// Validates the photo, extracts its geotag and attaches it to the report.
    ///
    /// Extraction runs without holding the report lock. Editability is checked
    /// again at commit time.
    pub async fn upload_photo(
        &self,
        actor: &Actor,
        report_id: Uuid,
        file: UploadedFile,
        caption: Option<String>,
    ) -> AppResult<GeotaggedPhoto> {
        require(actor, ATTACHMENTS_UPLOAD)?;
        ensure_editable(&self.reports.get(report_id)?)?;
        check_upload(&file, &self.uploads.photo_policy())?;

        let geotag = extract_geotag_within(file.bytes, self.uploads.geotag_extraction_timeout).await;
        if geotag.is_none() {
            warn!(report_id = %report_id, file_name = %file.file_name, "Photo has no usable geotag");
        }

        let file_ref = Uuid::now_v7();
        let photo = GeotaggedPhoto {
            id: Uuid::now_v7(),
            file_ref,
            url: self.public_url(file_ref),
            thumbnail_url: None,
            geotag,
            uploaded_at: OffsetDateTime::now_utc(),
            caption: caption
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty()),
        };

        self.reports.mutate(report_id, |current| {
            ensure_editable(current)?;
            let mut updated = current.clone();
            updated.photos.push(photo.clone());
            updated.touch(actor.id, photo.uploaded_at);
            Ok::<_, AppError>((updated, ()))
        })?;

        info!(report_id = %report_id, photo_id = %photo.id, located = photo.geotag.is_some(), "Photo attached");
        Ok(photo)
    }

    pub fn upload_document(&self, actor: &Actor, report_id: Uuid, file: UploadedFile) -> AppResult<Attachment> {
        require(actor, ATTACHMENTS_UPLOAD)?;
        check_upload(&file, &self.uploads.document_policy())?;

        let file_ref = Uuid::now_v7();
        let attachment = Attachment {
            id: file_ref,
            file_size: file.size(),
            file_name: file.file_name,
            file_type: file.content_type,
            url: self.public_url(file_ref),
            uploaded_by: actor.id,
            uploaded_at: OffsetDateTime::now_utc(),
        };

        self.reports.mutate(report_id, |current| {
            ensure_editable(current)?;
            let mut updated = current.clone();
            updated.attachments.push(attachment.clone());
            updated.touch(actor.id, attachment.uploaded_at);
            Ok::<_, AppError>((updated, ()))
        })?;

        info!(report_id = %report_id, attachment_id = %attachment.id, "Document attached");
        Ok(attachment)
    }

    /// Events whose notification could not be delivered, oldest first.
    pub fn failed_deliveries(&self) -> Vec<ReportEvent> {
        self.failed_deliveries
            .lock()
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn pending_deliveries(&self) -> usize {
        self.failed_deliveries.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    /// Hands every queued event to the emitter again. Returns how many went through.
    pub fn retry_failed_deliveries(&self) -> usize {
        let pending = match self.failed_deliveries.lock() {
            Ok(mut queue) => std::mem::take(&mut *queue),
            Err(_) => return 0,
        };

        let total = pending.len();
        let mut delivered = 0;
        for event in pending {
            if self.deliver(event) {
                delivered += 1;
            }
        }

        if total > 0 {
            info!(delivered, still_failing = total - delivered, "Retried failed deliveries");
        }
        delivered
    }

    fn deliver(&self, event: ReportEvent) -> bool {
        match self.emitter.emit(&event) {
            Ok(()) => true,
            Err(err) => {
                error!(
                    report_id = %event.report_id,
                    to_status = %event.to_status,
                    error = %err,
                    "Failed to emit report event"
                );
                if let Ok(mut queue) = self.failed_deliveries.lock() {
                    queue.push_back(event);
                    while queue.len() > self.failed_delivery_capacity {
                        if let Some(dropped) = queue.pop_front() {
                            warn!(
                                report_id = %dropped.report_id,
                                to_status = %dropped.to_status,
                                capacity = self.failed_delivery_capacity,
                                "Failed-delivery queue full, dropping oldest event"
                            );
                        }
                    }
                }
                false
            }
        }
    }

    fn public_url(&self, file_ref: Uuid) -> String {
        format!("{}/{}", self.uploads.public_base_url.trim_end_matches('/'), file_ref)
    }
}

/// Re-sends undelivered notifications every `every` until the runtime shuts down.
pub fn spawn_delivery_retry(service: Arc<ReportService>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if service.pending_deliveries() > 0 {
                service.retry_failed_deliveries();
            }
        }
    })
}

fn require(actor: &Actor, permission: &str) -> AppResult<()> {
    if actor.can(permission) {
        Ok(())
    } else {
        Err(AppError::missing_permission(permission))
    }
}

fn ensure_editable(report: &Report) -> Result<(), StoreError> {
    if report.status().is_editable() {
        Ok(())
    } else {
        Err(StoreError::NotEditable(report.status()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::workflow::attachments::tests::{jpeg_with_gps, jpeg_without_gps};
    use crate::workflow::{EmitError, Role, TransitionError};
    use std::sync::atomic::{AtomicBool, Ordering};
    use time::macros::date;

    #[derive(Default)]
    struct RecordingEmitter {
        events: Mutex<Vec<ReportEvent>>,
    }

    impl NotificationEmitter for RecordingEmitter {
        fn emit(&self, event: &ReportEvent) -> Result<(), EmitError> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    /// Fails every delivery until switched online.
    #[derive(Default)]
    struct SwitchedEmitter {
        online: AtomicBool,
        delivered: Mutex<Vec<ReportEvent>>,
    }

    impl NotificationEmitter for SwitchedEmitter {
        fn emit(&self, event: &ReportEvent) -> Result<(), EmitError> {
            if !self.online.load(Ordering::SeqCst) {
                return Err(EmitError::Persistence("notification store offline".to_string()));
            }
            self.delivered.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    fn offline_service(capacity: usize) -> (ReportService, Arc<SwitchedEmitter>) {
        let emitter = Arc::new(SwitchedEmitter::default());
        let service = ReportService::new(
            Arc::new(ReportRepository::new()),
            emitter.clone(),
            Config::default().uploads,
        )
        .with_failed_delivery_capacity(capacity);
        (service, emitter)
    }

    fn service() -> (ReportService, Arc<RecordingEmitter>) {
        let emitter = Arc::new(RecordingEmitter::default());
        let service = ReportService::new(
            Arc::new(ReportRepository::new()),
            emitter.clone(),
            Config::default().uploads,
        );
        (service, emitter)
    }

    fn manager() -> Actor {
        Actor::new(Uuid::new_v4(), Role::ReportManager.permissions())
    }

    fn surveyor() -> Actor {
        Actor::new(Uuid::new_v4(), Role::QualitySurveyor.permissions())
    }

    fn complete_fields() -> ReportFields {
        ReportFields {
            title: "Scaffold inspection".to_string(),
            client_id: Some(Uuid::new_v4()),
            visit_date: Some(date!(2026 - 03 - 14)),
            site_address: "7 Harbour Road".to_string(),
            description: None,
        }
    }

    fn photo(bytes: Vec<u8>) -> UploadedFile {
        UploadedFile {
            file_name: "site.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            bytes,
        }
    }

    #[test]
    fn test_transition_emits_after_commit() {
        let (service, emitter) = service();
        let author = manager();
        let report = service.create_report(&author, complete_fields()).unwrap();

        let submitted = service
            .transition(&author, report.id, "pending_qs_review", Some("  ready  ".to_string()))
            .unwrap();

        assert_eq!(submitted.status(), ReportStatus::PendingQsReview);
        assert_eq!(submitted.audit_trail()[0].comment.as_deref(), Some("ready"));
        let events = emitter.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].to_status, ReportStatus::PendingQsReview);
    }

    #[test]
    fn test_rejected_transition_emits_nothing() {
        let (service, emitter) = service();
        let author = manager();
        let report = service.create_report(&author, ReportFields::default()).unwrap();

        let err = service
            .transition(&author, report.id, "PendingQsReview", None)
            .unwrap_err();

        assert!(matches!(err, AppError::Transition(TransitionError::Validation(_))));
        assert!(emitter.events.lock().unwrap().is_empty());
        assert_eq!(service.get_report(&author, report.id).unwrap(), report);
    }

    #[test]
    fn test_update_blocked_outside_editable_states() {
        let (service, _) = service();
        let author = manager();
        let report = service.create_report(&author, complete_fields()).unwrap();
        service
            .transition(&author, report.id, "PendingQsReview", None)
            .unwrap();

        let err = service
            .update_report(
                &author,
                report.id,
                UpdateReport {
                    title: Some("Late edit".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Store(StoreError::NotEditable(ReportStatus::PendingQsReview))
        ));
    }

    #[test]
    fn test_update_bumps_version() {
        let (service, _) = service();
        let author = manager();
        let report = service.create_report(&author, ReportFields::default()).unwrap();

        let updated = service
            .update_report(
                &author,
                report.id,
                UpdateReport {
                    site_address: Some("12 Quay Street".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.fields.site_address, "12 Quay Street");
        assert_eq!(updated.version, report.version + 1);
    }

    #[test]
    fn test_allowed_transitions_respect_permissions() {
        let (service, _) = service();
        let author = manager();
        let report = service.create_report(&author, complete_fields()).unwrap();
        service
            .transition(&author, report.id, "PendingQsReview", None)
            .unwrap();

        let for_author = service.allowed_transitions(&author, report.id).unwrap();
        assert_eq!(for_author.current_status, ReportStatus::PendingQsReview);
        assert!(for_author.allowed.is_empty());
        assert_eq!(
            service.allowed_transitions(&surveyor(), report.id).unwrap(),
            AllowedTransitions {
                current_status: ReportStatus::PendingQsReview,
                allowed: vec![ReportStatus::UnderReview, ReportStatus::RevisionRequested],
            }
        );
    }

    #[test]
    fn test_create_requires_permission() {
        let (service, _) = service();
        let err = service.create_report(&surveyor(), complete_fields()).unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_upload_photo_with_geotag() {
        let (service, _) = service();
        let author = manager();
        let report = service.create_report(&author, complete_fields()).unwrap();

        let bytes = jpeg_with_gps([41, 0, 36], b'N', [28, 58, 48], b'E', None);
        let photo = service
            .upload_photo(&author, report.id, photo(bytes), Some("North gate".to_string()))
            .await
            .unwrap();

        let geotag = photo.geotag.clone().expect("geotag");
        assert!((geotag.latitude() - 41.01).abs() < 1e-9);
        assert!((geotag.longitude() - 28.98).abs() < 1e-9);
        assert_eq!(photo.caption.as_deref(), Some("North gate"));
        assert_eq!(photo.url, format!("/files/{}", photo.file_ref));

        let stored = service.get_report(&author, report.id).unwrap();
        assert_eq!(stored.photos, vec![photo]);
    }

    #[tokio::test]
    async fn test_upload_photo_without_geotag_is_kept() {
        let (service, _) = service();
        let author = manager();
        let report = service.create_report(&author, complete_fields()).unwrap();

        let photo = service
            .upload_photo(&author, report.id, photo(jpeg_without_gps()), None)
            .await
            .unwrap();

        assert!(photo.geotag.is_none());
        assert_eq!(service.get_report(&author, report.id).unwrap().photos.len(), 1);
    }

    #[tokio::test]
    async fn test_upload_photo_rejects_documents() {
        let (service, _) = service();
        let author = manager();
        let report = service.create_report(&author, complete_fields()).unwrap();

        let file = UploadedFile {
            file_name: "notes.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            bytes: vec![0; 16],
        };
        let err = service.upload_photo(&author, report.id, file, None).await.unwrap_err();
        assert!(matches!(err, AppError::Upload(_)));
    }

    #[test]
    fn test_upload_document_while_editable() {
        let (service, _) = service();
        let author = manager();
        let report = service.create_report(&author, complete_fields()).unwrap();

        let file = UploadedFile {
            file_name: "permit.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            bytes: vec![0; 2048],
        };
        let attachment = service.upload_document(&author, report.id, file).unwrap();

        assert_eq!(attachment.file_size, 2048);
        assert_eq!(attachment.uploaded_by, author.id);
        assert_eq!(service.get_report(&author, report.id).unwrap().attachments.len(), 1);
    }

    #[test]
    fn test_failed_delivery_queue_drops_oldest_beyond_capacity() {
        let (service, _) = offline_service(3);
        let author = manager();

        let submitted: Vec<Uuid> = (0..5)
            .map(|_| {
                let report = service.create_report(&author, complete_fields()).unwrap();
                service
                    .transition(&author, report.id, "PendingQsReview", None)
                    .unwrap();
                report.id
            })
            .collect();

        assert_eq!(service.pending_deliveries(), 3);
        let queued: Vec<Uuid> = service
            .failed_deliveries()
            .into_iter()
            .map(|event| event.report_id)
            .collect();
        assert_eq!(queued, submitted[2..].to_vec());
    }

    #[tokio::test]
    async fn test_delivery_retry_task_drains_queue() {
        let (service, emitter) = offline_service(10);
        let service = Arc::new(service);
        let author = manager();
        let report = service.create_report(&author, complete_fields()).unwrap();
        service
            .transition(&author, report.id, "PendingQsReview", None)
            .unwrap();
        assert_eq!(service.pending_deliveries(), 1);

        emitter.online.store(true, Ordering::SeqCst);
        let retry = spawn_delivery_retry(service.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(200)).await;
        retry.abort();

        assert_eq!(service.pending_deliveries(), 0);
        let delivered = emitter.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].report_id, report.id);
    }
}
