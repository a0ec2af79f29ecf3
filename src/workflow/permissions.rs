use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const REPORTS_CREATE: &str = "reports.create";
pub const REPORTS_READ: &str = "reports.read";
pub const REPORTS_UPDATE: &str = "reports.update";
pub const REPORTS_SUBMIT: &str = "reports.submit";
pub const REPORTS_REVIEW: &str = "reports.review";
pub const REPORTS_APPROVE: &str = "reports.approve";
pub const REPORTS_REJECT: &str = "reports.reject";
pub const REPORTS_ARCHIVE: &str = "reports.archive";
pub const ATTACHMENTS_UPLOAD: &str = "attachments.upload";
pub const ATTACHMENTS_READ: &str = "attachments.read";
pub const NOTIFICATIONS_READ: &str = "notifications.read";
pub const NOTIFICATIONS_UPDATE: &str = "notifications.update";

const CATALOGUE: &[&str] = &[
    REPORTS_CREATE,
    REPORTS_READ,
    REPORTS_UPDATE,
    REPORTS_SUBMIT,
    REPORTS_REVIEW,
    REPORTS_APPROVE,
    REPORTS_REJECT,
    REPORTS_ARCHIVE,
    ATTACHMENTS_UPLOAD,
    ATTACHMENTS_READ,
    NOTIFICATIONS_READ,
    NOTIFICATIONS_UPDATE,
];

static REGISTRY: Lazy<PermissionRegistry> = Lazy::new(|| PermissionRegistry::from_tokens(CATALOGUE));

/// Process-wide catalogue of capability tokens, keyed resource -> action -> token.
#[derive(Debug, Serialize)]
pub struct PermissionRegistry {
    resources: BTreeMap<&'static str, BTreeMap<&'static str, &'static str>>,
}

impl PermissionRegistry {
    fn from_tokens(tokens: &[&'static str]) -> Self {
        let mut resources: BTreeMap<&'static str, BTreeMap<&'static str, &'static str>> =
            BTreeMap::new();
        for token in tokens {
            if let Some((resource, action)) = token.split_once('.') {
                resources.entry(resource).or_default().insert(action, *token);
            }
        }
        Self { resources }
    }

    pub fn resources(&self) -> &BTreeMap<&'static str, BTreeMap<&'static str, &'static str>> {
        &self.resources
    }

    pub fn contains(&self, token: &str) -> bool {
        self.resources
            .values()
            .any(|actions| actions.values().any(|known| *known == token))
    }

    pub fn all_tokens(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resources.values().flat_map(|actions| actions.values().copied())
    }
}

pub fn registry() -> &'static PermissionRegistry {
    &REGISTRY
}

/// Exact-match membership. No wildcards and no hierarchy.
pub fn has(actor_permissions: &PermissionSet, required: &str) -> bool {
    actor_permissions.contains(required)
}

/// The tokens an actor holds. Duplicates collapse and order is irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Parses the comma-separated form the host puts in request headers.
    pub fn from_header_value(value: &str) -> Self {
        value
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .collect()
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Report manager: authors and submits reports.
    ReportManager,
    /// Quality surveyor: reviews and decides.
    QualitySurveyor,
    Admin,
}

impl Role {
    pub fn all() -> &'static [Role] {
        &[Role::ReportManager, Role::QualitySurveyor, Role::Admin]
    }

    pub fn permissions(&self) -> PermissionSet {
        match self {
            Role::ReportManager => [
                REPORTS_CREATE,
                REPORTS_READ,
                REPORTS_UPDATE,
                REPORTS_SUBMIT,
                REPORTS_ARCHIVE,
                ATTACHMENTS_UPLOAD,
                ATTACHMENTS_READ,
                NOTIFICATIONS_READ,
                NOTIFICATIONS_UPDATE,
            ]
            .into_iter()
            .collect(),
            Role::QualitySurveyor => [
                REPORTS_READ,
                REPORTS_REVIEW,
                REPORTS_APPROVE,
                REPORTS_REJECT,
                ATTACHMENTS_READ,
                NOTIFICATIONS_READ,
                NOTIFICATIONS_UPDATE,
            ]
            .into_iter()
            .collect(),
            Role::Admin => registry().all_tokens().collect(),
        }
    }
}
