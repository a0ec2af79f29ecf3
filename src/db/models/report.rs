use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{Attachment, GeotaggedPhoto};
use crate::workflow::ReportStatus;

/// The editable content of a report.
///
/// Presence rules are declared here; `workflow::validation` turns the result into the
/// field map handed back to clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReportFields {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    #[validate(required)]
    pub client_id: Option<Uuid>,
    #[validate(required)]
    pub visit_date: Option<Date>,
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub site_address: String,
    #[serde(default)]
    pub description: Option<String>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Partial edit. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReport {
    pub title: Option<String>,
    pub client_id: Option<Uuid>,
    pub visit_date: Option<Date>,
    pub site_address: Option<String>,
    pub description: Option<String>,
}

impl UpdateReport {
    pub fn apply_to(self, fields: &mut ReportFields) {
        if let Some(title) = self.title {
            fields.title = title;
        }
        if let Some(client_id) = self.client_id {
            fields.client_id = Some(client_id);
        }
        if let Some(visit_date) = self.visit_date {
            fields.visit_date = Some(visit_date);
        }
        if let Some(site_address) = self.site_address {
            fields.site_address = site_address;
        }
        if let Some(description) = self.description {
            fields.description = Some(description);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub from_status: ReportStatus,
    pub to_status: ReportStatus,
    pub actor_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub comment: Option<String>,
}

/// A site-inspection report.
///
/// `status` and `audit_trail` have no setters. They only move through
/// `Report::record_transition`, which the state machine calls on a clone it owns.
/// Reports are built server-side only, so there is no `Deserialize` impl.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: ReportFields,
    status: ReportStatus,
    pub attachments: Vec<Attachment>,
    pub photos: Vec<GeotaggedPhoto>,
    pub created_by: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub last_modified_by: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub last_modified_at: OffsetDateTime,
    audit_trail: Vec<AuditEntry>,
    pub version: u64,
}

impl Report {
    /// New reports always start in `draft`.
    pub(crate) fn new_draft(fields: ReportFields, created_by: Uuid, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::now_v7(),
            fields,
            status: ReportStatus::Draft,
            attachments: Vec::new(),
            photos: Vec::new(),
            created_by,
            created_at: now,
            last_modified_by: created_by,
            last_modified_at: now,
            audit_trail: Vec::new(),
            version: 1,
        }
    }

    pub fn status(&self) -> ReportStatus {
        self.status
    }

    pub fn audit_trail(&self) -> &[AuditEntry] {
        &self.audit_trail
    }

    pub(crate) fn touch(&mut self, actor_id: Uuid, now: OffsetDateTime) {
        self.last_modified_by = actor_id;
        self.last_modified_at = now;
        self.version += 1;
    }

    pub(crate) fn record_transition(&mut self, entry: AuditEntry) {
        self.status = entry.to_status;
        let (actor_id, timestamp) = (entry.actor_id, entry.timestamp);
        self.audit_trail.push(entry);
        self.touch(actor_id, timestamp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_draft_starts_clean() {
        let author = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();
        let report = Report::new_draft(ReportFields::default(), author, now);

        assert_eq!(report.status(), ReportStatus::Draft);
        assert!(report.audit_trail().is_empty());
        assert_eq!(report.created_by, author);
        assert_eq!(report.last_modified_by, author);
        assert_eq!(report.version, 1);
    }

    #[test]
    fn test_update_keeps_absent_fields() {
        let client_id = Uuid::new_v4();
        let mut fields = ReportFields {
            title: "Roof inspection".to_string(),
            client_id: Some(client_id),
            site_address: "1 Main St".to_string(),
            ..Default::default()
        };

        UpdateReport {
            title: Some("Roof and gutter inspection".to_string()),
            ..Default::default()
        }
        .apply_to(&mut fields);

        assert_eq!(fields.title, "Roof and gutter inspection");
        assert_eq!(fields.client_id, Some(client_id));
        assert_eq!(fields.site_address, "1 Main St");
    }

    #[test]
    fn test_serializes_status_in_wire_form() {
        let report = Report::new_draft(
            ReportFields::default(),
            Uuid::new_v4(),
            OffsetDateTime::now_utc(),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "Draft");
        assert!(json.get("auditTrail").is_some());
        assert!(json.get("siteAddress").is_some());
    }
}
