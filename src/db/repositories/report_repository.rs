use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

use crate::db::error::StoreError;
use crate::db::models::Report;

/// In-memory report store.
///
/// Each report sits behind its own mutex, so read-modify-write sequences on one
/// report are serialized while different reports proceed independently.
#[derive(Default)]
pub struct ReportRepository {
    reports: RwLock<HashMap<Uuid, Arc<Mutex<Report>>>>,
}

impl ReportRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, report: Report) -> Result<Report, StoreError> {
        let mut reports = self.reports.write().map_err(|_| StoreError::LockPoisoned)?;
        reports.insert(report.id, Arc::new(Mutex::new(report.clone())));
        Ok(report)
    }

    pub fn get(&self, report_id: Uuid) -> Result<Report, StoreError> {
        let slot = self.slot(report_id)?;
        let report = slot.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(report.clone())
    }

    /// All reports, most recently modified first.
    pub fn list(&self) -> Result<Vec<Report>, StoreError> {
        let slots: Vec<_> = {
            let reports = self.reports.read().map_err(|_| StoreError::LockPoisoned)?;
            reports.values().cloned().collect()
        };

        let mut listed = Vec::with_capacity(slots.len());
        for slot in slots {
            listed.push(slot.lock().map_err(|_| StoreError::LockPoisoned)?.clone());
        }
        listed.sort_by(|a, b| b.last_modified_at.cmp(&a.last_modified_at));
        Ok(listed)
    }

    /// Runs `change` while holding the report's lock.
    ///
    /// `change` receives the current value and returns a replacement. The replacement
    /// is stored only when `change` succeeds; on error the stored report is untouched.
    pub fn mutate<T, E, F>(&self, report_id: Uuid, change: F) -> Result<T, E>
    where
        F: FnOnce(&Report) -> Result<(Report, T), E>,
        E: From<StoreError>,
    {
        let slot = self.slot(report_id)?;
        let mut current = slot.lock().map_err(|_| StoreError::LockPoisoned)?;
        let (updated, output) = change(&*current)?;
        *current = updated;
        Ok(output)
    }

    fn slot(&self, report_id: Uuid) -> Result<Arc<Mutex<Report>>, StoreError> {
        let reports = self.reports.read().map_err(|_| StoreError::LockPoisoned)?;
        reports
            .get(&report_id)
            .cloned()
            .ok_or(StoreError::ReportNotFound(report_id))
    }
}
