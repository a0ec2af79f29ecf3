use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// GPS location captured with a photo.
///
/// Only constructible through [`Geotag::new`], so an existing value always carries
/// both coordinates within range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Geotag {
    latitude: f64,
    longitude: f64,
    altitude: Option<f64>,
    accuracy: Option<f64>,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
}

impl Geotag {
    pub fn new(
        latitude: f64,
        longitude: f64,
        altitude: Option<f64>,
        accuracy: Option<f64>,
        timestamp: OffsetDateTime,
    ) -> Option<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return None;
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        Some(Self {
            latitude,
            longitude,
            altitude: altitude.filter(|value| value.is_finite()),
            accuracy: accuracy.filter(|value| value.is_finite() && *value >= 0.0),
            timestamp,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn altitude(&self) -> Option<f64> {
        self.altitude
    }

    pub fn accuracy(&self) -> Option<f64> {
        self.accuracy
    }

    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }
}

/// Photo evidence owned by a single report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeotaggedPhoto {
    pub id: Uuid,
    pub file_ref: Uuid,
    pub url: String,
    pub thumbnail_url: Option<String>,
    /// `None` when the upload carried no usable location.
    pub geotag: Option<Geotag>,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
    pub caption: Option<String>,
}

/// Non-photo evidence such as signed forms or PDFs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: Uuid,
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    pub url: String,
    pub uploaded_by: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
}

/// A file as received from the client, before any policy check.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}
