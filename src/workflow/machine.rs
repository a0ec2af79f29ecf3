use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use super::permissions::{
    self, PermissionSet, REPORTS_APPROVE, REPORTS_ARCHIVE, REPORTS_REJECT, REPORTS_REVIEW,
    REPORTS_SUBMIT,
};
use super::validation::{validate_report_fields, FieldErrors};
use super::{ReportEvent, ReportStatus};
use crate::db::models::{AuditEntry, Report};

use ReportStatus::*;

/// Every legal edge and the permission it requires. Pairs not listed are illegal.
const TRANSITIONS: &[(ReportStatus, ReportStatus, &str)] = &[
    (Draft, PendingQsReview, REPORTS_SUBMIT),
    (Draft, Archived, REPORTS_ARCHIVE),
    (PendingQsReview, UnderReview, REPORTS_REVIEW),
    (PendingQsReview, RevisionRequested, REPORTS_REVIEW),
    (UnderReview, RevisionRequested, REPORTS_REVIEW),
    (UnderReview, SiteVisitScheduled, REPORTS_REVIEW),
    (UnderReview, Approved, REPORTS_APPROVE),
    (UnderReview, Rejected, REPORTS_REJECT),
    (SiteVisitScheduled, UnderReview, REPORTS_REVIEW),
    (RevisionRequested, PendingQsReview, REPORTS_SUBMIT),
    (RevisionRequested, Archived, REPORTS_ARCHIVE),
];

/// Whoever is asking for a change, as established by the host's auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub permissions: PermissionSet,
}

impl Actor {
    pub fn new(id: Uuid, permissions: PermissionSet) -> Self {
        Self { id, permissions }
    }

    pub fn can(&self, token: &str) -> bool {
        permissions::has(&self.permissions, token)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Report failed validation on {} field(s)", .0.len())]
    Validation(FieldErrors),

    #[error("Actor {actor_id} lacks permission {required}")]
    Unauthorized {
        actor_id: Uuid,
        required: &'static str,
    },

    #[error("Cannot move a report from {from} to {to}")]
    IllegalTransition {
        from: ReportStatus,
        to: ReportStatus,
    },

    #[error("Unknown report status: {0}")]
    UnknownStatus(String),
}

/// A transition that has been decided but not yet stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub report: Report,
    pub event: ReportEvent,
}

pub fn required_permission(from: ReportStatus, to: ReportStatus) -> Option<&'static str> {
    TRANSITIONS
        .iter()
        .find(|(edge_from, edge_to, _)| *edge_from == from && *edge_to == to)
        .map(|(_, _, permission)| *permission)
}

pub fn allowed_targets(from: ReportStatus) -> Vec<ReportStatus> {
    TRANSITIONS
        .iter()
        .filter(|(edge_from, _, _)| *edge_from == from)
        .map(|(_, edge_to, _)| *edge_to)
        .collect()
}

/// Only `draft` may be entered with incomplete fields, and no edge leads there.
fn requires_complete_fields(target: ReportStatus) -> bool {
    target != Draft
}

/// Decides whether `actor` may move `report` to `target` and, if so, builds the
/// updated report and its event.
///
/// Checks run cheapest first: edge legality, then permission, then field
/// completeness. `report` itself is never modified.
pub fn request_transition(
    report: &Report,
    actor: &Actor,
    target: ReportStatus,
    comment: Option<String>,
) -> Result<Transition, TransitionError> {
    let from = report.status();

    let required = required_permission(from, target)
        .ok_or(TransitionError::IllegalTransition { from, to: target })?;

    if !actor.can(required) {
        return Err(TransitionError::Unauthorized {
            actor_id: actor.id,
            required,
        });
    }

    if requires_complete_fields(target) {
        let outcome = validate_report_fields(&report.fields);
        if !outcome.is_valid {
            return Err(TransitionError::Validation(outcome.errors));
        }
    }

    let now = OffsetDateTime::now_utc();
    let comment = comment
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty());

    let mut updated = report.clone();
    updated.record_transition(AuditEntry {
        from_status: from,
        to_status: target,
        actor_id: actor.id,
        timestamp: now,
        comment,
    });

    let event = ReportEvent {
        report_id: updated.id,
        from_status: from,
        to_status: target,
        actor_id: actor.id,
        timestamp: now,
    };

    Ok(Transition {
        report: updated,
        event,
    })
}

/// Same as [`request_transition`], for a target in either string representation.
pub fn request_transition_to(
    report: &Report,
    actor: &Actor,
    raw_target: &str,
    comment: Option<String>,
) -> Result<Transition, TransitionError> {
    let target = ReportStatus::parse(raw_target)
        .ok_or_else(|| TransitionError::UnknownStatus(raw_target.to_string()))?;
    request_transition(report, actor, target, comment)
}
