use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display};
use std::str::FromStr;

/// Lifecycle state of a report.
///
/// Internally every status is one of these variants. Strings only appear at the
/// codec boundary (`to_wire`, `to_canonical`) and in serde, which always writes the
/// PascalCase wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReportStatus {
    Draft,
    PendingQsReview,
    UnderReview,
    RevisionRequested,
    SiteVisitScheduled,
    Approved,
    Rejected,
    Archived,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 8] = [
        ReportStatus::Draft,
        ReportStatus::PendingQsReview,
        ReportStatus::UnderReview,
        ReportStatus::RevisionRequested,
        ReportStatus::SiteVisitScheduled,
        ReportStatus::Approved,
        ReportStatus::Rejected,
        ReportStatus::Archived,
    ];

    pub fn as_canonical(&self) -> &'static str {
        match self {
            ReportStatus::Draft => "draft",
            ReportStatus::PendingQsReview => "pending_qs_review",
            ReportStatus::UnderReview => "under_review",
            ReportStatus::RevisionRequested => "revision_requested",
            ReportStatus::SiteVisitScheduled => "site_visit_scheduled",
            ReportStatus::Approved => "approved",
            ReportStatus::Rejected => "rejected",
            ReportStatus::Archived => "archived",
        }
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            ReportStatus::Draft => "Draft",
            ReportStatus::PendingQsReview => "PendingQsReview",
            ReportStatus::UnderReview => "UnderReview",
            ReportStatus::RevisionRequested => "RevisionRequested",
            ReportStatus::SiteVisitScheduled => "SiteVisitScheduled",
            ReportStatus::Approved => "Approved",
            ReportStatus::Rejected => "Rejected",
            ReportStatus::Archived => "Archived",
        }
    }

    /// Accepts either representation in any ASCII case.
    ///
    /// Returns `None` for anything outside the closed set, which is the validity
    /// check callers of the lenient codec are expected to run.
    pub fn parse(value: &str) -> Option<Self> {
        let canonical = to_canonical(value);
        Self::ALL
            .into_iter()
            .find(|status| status.as_canonical() == canonical)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReportStatus::Approved | ReportStatus::Rejected | ReportStatus::Archived
        )
    }

    /// Fields may only be edited and files attached while the author holds the report.
    pub fn is_editable(&self) -> bool {
        matches!(self, ReportStatus::Draft | ReportStatus::RevisionRequested)
    }
}

/// Maps a canonical token to its wire form. Unrecognized input comes back unchanged.
pub fn to_wire(canonical: &str) -> String {
    ReportStatus::ALL
        .into_iter()
        .find(|status| status.as_canonical().eq_ignore_ascii_case(canonical))
        .map(|status| status.as_wire().to_string())
        .unwrap_or_else(|| canonical.to_string())
}

/// Maps a wire token to its canonical form. Unrecognized input comes back lowercased,
/// so the result is not guaranteed to be a member of the closed set.
pub fn to_canonical(wire: &str) -> String {
    ReportStatus::ALL
        .into_iter()
        .find(|status| status.as_wire().eq_ignore_ascii_case(wire))
        .map(|status| status.as_canonical().to_string())
        .unwrap_or_else(|| wire.to_lowercase())
}

/// True when both inputs denote the same status, whatever representation each uses.
pub fn status_equals(actual: &str, expected: &str) -> bool {
    actual == expected || to_canonical(actual) == to_canonical(expected)
}

impl Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_canonical())
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Unknown report status: {}", s))
    }
}

impl Serialize for ReportStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for ReportStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_for_every_status() {
        for status in ReportStatus::ALL {
            let canonical = status.as_canonical();
            assert_eq!(to_canonical(&to_wire(canonical)), canonical);
        }
    }

    #[test]
    fn test_wire_forms() {
        assert_eq!(to_wire("draft"), "Draft");
        assert_eq!(to_wire("pending_qs_review"), "PendingQsReview");
        assert_eq!(to_wire("site_visit_scheduled"), "SiteVisitScheduled");
        assert_eq!(to_canonical("RevisionRequested"), "revision_requested");
    }

    #[test]
    fn test_unrecognized_input_passes_through() {
        assert_eq!(to_wire("bogus"), "bogus");
        assert_eq!(to_canonical("bogus"), "bogus");
        assert_eq!(to_wire(""), "");
        assert_eq!(to_canonical(""), "");
        assert_eq!(to_canonical("BoGuS"), "bogus");
    }

    #[test]
    fn test_status_equals_across_representations() {
        assert!(status_equals("PendingQsReview", "pending_qs_review"));
        assert!(status_equals("pending_qs_review", "pending_qs_review"));
        assert!(status_equals("PENDINGQSREVIEW", "PendingQsReview"));
        assert!(status_equals("Approved", "APPROVED"));
        assert!(!status_equals("Approved", "rejected"));
    }

    #[test]
    fn test_parse_requires_closed_set() {
        assert_eq!(ReportStatus::parse("UnderReview"), Some(ReportStatus::UnderReview));
        assert_eq!(ReportStatus::parse("under_review"), Some(ReportStatus::UnderReview));
        assert_eq!(ReportStatus::parse("bogus"), None);
        assert!("bogus".parse::<ReportStatus>().is_err());
    }

    #[test]
    fn test_serde_uses_wire_form() {
        let json = serde_json::to_string(&ReportStatus::PendingQsReview).unwrap();
        assert_eq!(json, "\"PendingQsReview\"");

        let parsed: ReportStatus = serde_json::from_str("\"site_visit_scheduled\"").unwrap();
        assert_eq!(parsed, ReportStatus::SiteVisitScheduled);

        assert!(serde_json::from_str::<ReportStatus>("\"Pending\"").is_err());
    }

    #[test]
    fn test_terminal_states() {
        let terminal: Vec<_> = ReportStatus::ALL
            .into_iter()
            .filter(ReportStatus::is_terminal)
            .collect();
        assert_eq!(
            terminal,
            vec![ReportStatus::Approved, ReportStatus::Rejected, ReportStatus::Archived]
        );
    }
}
