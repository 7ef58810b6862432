use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

use crate::CodecError;

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parses the `datetime` field of a stored reading.
///
/// RFC 3339 strings carry their own offset; naive wall-clock strings are
/// taken to be in `offset`.
pub fn parse_timestamp(raw: &str, offset: &FixedOffset) -> Result<DateTime<Utc>, CodecError> {
    let raw = raw.trim();

    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Ok(time.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .and_then(|naive| offset.from_local_datetime(&naive).single())
        .map(|time| time.with_timezone(&Utc))
        .ok_or_else(|| CodecError::InvalidTimestamp(raw.to_string()))
}
