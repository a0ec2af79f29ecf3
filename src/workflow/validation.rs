use serde::Serialize;
use std::collections::BTreeMap;
use validator::Validate;

use crate::db::models::ReportFields;

/// Field name (camelCase, as clients send it) to a human-readable message.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub errors: FieldErrors,
}

/// Checks that a report is complete enough to leave `draft`.
///
/// Every failing field is reported in a single pass.
pub fn validate_report_fields(fields: &ReportFields) -> ValidationOutcome {
    let mut errors = FieldErrors::new();

    if let Err(validation_errors) = fields.validate() {
        for field in validation_errors.field_errors().keys() {
            let field: &str = field;
            let (wire_name, message) = describe(field);
            errors.insert(wire_name.to_string(), message.to_string());
        }
    }

    ValidationOutcome {
        is_valid: errors.is_empty(),
        errors,
    }
}

fn describe(field: &str) -> (&str, &'static str) {
    match field {
        "title" => ("title", "Title is required"),
        "client_id" => ("clientId", "Client is required"),
        "visit_date" => ("visitDate", "Visit date is required"),
        "site_address" => ("siteAddress", "Site address is required"),
        other => (other, "Invalid value"),
    }
}
