use exif::{In, Reader, Tag, Value};
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};

use crate::db::models::{Geotag, UploadedFile};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Size ceiling and MIME allow-list applied to one kind of upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_size_mb: u64,
    pub allowed_types: Vec<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadRejection {
    #[error("File exceeds the {max_size_mb} MB limit")]
    TooLarge { max_size_mb: u64 },

    #[error("File type {0} is not allowed")]
    UnsupportedType(String),
}

/// Inclusive: a file of exactly `max_size_mb` passes.
pub fn validate_file_size(file: &UploadedFile, max_size_mb: u64) -> bool {
    file.size() <= max_size_mb.saturating_mul(BYTES_PER_MB)
}

/// Accepts on the first pattern that matches, either exactly, as a `type/*` prefix,
/// or as `*/*` which admits any type.
pub fn validate_file_type(file: &UploadedFile, allowed_types: &[String]) -> bool {
    let mime = essence(&file.content_type);
    allowed_types.iter().any(|pattern| {
        let pattern = pattern.trim().to_ascii_lowercase();
        if pattern == "*/*" {
            return true;
        }
        match pattern.strip_suffix("/*") {
            Some(major) => mime
                .split_once('/')
                .is_some_and(|(file_major, _)| file_major == major),
            None => mime == pattern,
        }
    })
}

pub fn check_upload(file: &UploadedFile, policy: &UploadPolicy) -> Result<(), UploadRejection> {
    if !validate_file_size(file, policy.max_size_mb) {
        return Err(UploadRejection::TooLarge {
            max_size_mb: policy.max_size_mb,
        });
    }
    if !validate_file_type(file, &policy.allowed_types) {
        return Err(UploadRejection::UnsupportedType(file.content_type.clone()));
    }
    Ok(())
}

// "image/jpeg; name=x.jpg" -> "image/jpeg"
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Reads the GPS position embedded in a photo's EXIF block.
///
/// Returns `None` when there is no metadata, when latitude or longitude is missing,
/// or when anything fails to parse. A photo without a usable position is still a
/// valid upload, so no error is ever surfaced from here.
pub fn extract_geotag(bytes: &[u8]) -> Option<Geotag> {
    let exif = Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;

    let latitude = coordinate(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, b'S')?;
    let longitude = coordinate(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, b'W')?;

    let altitude = rational_at(&exif, Tag::GPSAltitude, 0).map(|meters| {
        match exif.get_field(Tag::GPSAltitudeRef, In::PRIMARY).map(|f| &f.value) {
            Some(Value::Byte(flags)) if flags.first() == Some(&1) => -meters,
            _ => meters,
        }
    });
    let accuracy = rational_at(&exif, Tag::GPSDOP, 0);

    let timestamp = gps_timestamp(&exif)
        .or_else(|| original_timestamp(&exif))
        .unwrap_or_else(OffsetDateTime::now_utc);

    Geotag::new(latitude, longitude, altitude, accuracy, timestamp)
}

/// Runs [`extract_geotag`] on the blocking pool, giving up after `timeout`.
///
/// A stalled or panicking read degrades to `None` like any other extraction failure.
pub async fn extract_geotag_within(bytes: Vec<u8>, timeout: Duration) -> Option<Geotag> {
    run_bounded(timeout, move || extract_geotag(&bytes)).await
}

async fn run_bounded<F>(timeout: Duration, extract: F) -> Option<Geotag>
where
    F: FnOnce() -> Option<Geotag> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(extract);
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(geotag)) => geotag,
        Ok(Err(join_error)) => {
            tracing::warn!(error = %join_error, "Geotag extraction task failed");
            None
        }
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Geotag extraction timed out");
            None
        }
    }
}

fn coordinate(exif: &exif::Exif, value_tag: Tag, ref_tag: Tag, negative_ref: u8) -> Option<f64> {
    let field = exif.get_field(value_tag, In::PRIMARY)?;
    let parts = match &field.value {
        Value::Rational(parts) if !parts.is_empty() => parts,
        _ => return None,
    };

    let mut degrees = 0.0;
    for (part, divisor) in parts.iter().zip([1.0, 60.0, 3600.0]) {
        degrees += part.to_f64() / divisor;
    }

    let negative = match exif.get_field(ref_tag, In::PRIMARY).map(|f| &f.value) {
        Some(Value::Ascii(values)) => values
            .first()
            .and_then(|value| value.first())
            .is_some_and(|letter| letter.to_ascii_uppercase() == negative_ref),
        _ => false,
    };

    let signed = if negative { -degrees } else { degrees };
    signed.is_finite().then_some(signed)
}

fn rational_at(exif: &exif::Exif, tag: Tag, index: usize) -> Option<f64> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Rational(values) => values
            .get(index)
            .map(|value| value.to_f64())
            .filter(|value| value.is_finite()),
        _ => None,
    }
}

fn first_ascii(exif: &exif::Exif, tag: Tag) -> Option<String> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Ascii(values) => values
            .first()
            .map(|value| String::from_utf8_lossy(value).trim_end_matches('\0').to_string()),
        _ => None,
    }
}

// GPSDateStamp ("YYYY:MM:DD") plus GPSTimeStamp (h, m, s rationals) are always UTC.
fn gps_timestamp(exif: &exif::Exif) -> Option<OffsetDateTime> {
    let date = parse_exif_date(&first_ascii(exif, Tag::GPSDateStamp)?)?;
    let hour = rational_at(exif, Tag::GPSTimeStamp, 0)?;
    let minute = rational_at(exif, Tag::GPSTimeStamp, 1)?;
    let second = rational_at(exif, Tag::GPSTimeStamp, 2)?;
    let time = Time::from_hms(hour as u8, minute as u8, second as u8).ok()?;
    Some(PrimitiveDateTime::new(date, time).assume_utc())
}

// DateTimeOriginal carries no zone; it is read as UTC.
fn original_timestamp(exif: &exif::Exif) -> Option<OffsetDateTime> {
    let raw = first_ascii(exif, Tag::DateTimeOriginal)?;
    let parsed = exif::DateTime::from_ascii(raw.as_bytes()).ok()?;
    let date = Date::from_calendar_date(
        i32::from(parsed.year),
        Month::try_from(parsed.month).ok()?,
        parsed.day,
    )
    .ok()?;
    let time = Time::from_hms(parsed.hour, parsed.minute, parsed.second).ok()?;
    Some(PrimitiveDateTime::new(date, time).assume_utc())
}

fn parse_exif_date(raw: &str) -> Option<Date> {
    let mut parts = raw.trim().splitn(3, ':');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u8 = parts.next()?.parse().ok()?;
    let day: u8 = parts.next()?.parse().ok()?;
    Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()
}
