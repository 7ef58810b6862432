use chrono::FixedOffset;
use serde::Deserialize;
use serde_json::Value;
use waterwise_types::Reading;

use crate::{CodecError, parse_timestamp};

/// Record layout written by the field controller under each push key.
#[derive(Debug, Deserialize)]
struct StoredReading {
    datetime: String,
    level: f64,
}

#[derive(Debug, Default)]
pub struct DecodedSnapshot {
    pub readings: Vec<Reading>,
    /// Keys of records that could not be decoded, with the reason.
    pub rejected: Vec<(String, CodecError)>,
}

pub fn decode_record(value: &Value, offset: &FixedOffset) -> Result<Reading, CodecError> {
    let stored = StoredReading::deserialize(value)?;
    let time = parse_timestamp(&stored.datetime, offset)?;

    if !stored.level.is_finite() || stored.level.abs() > f64::from(i32::MAX) {
        return Err(CodecError::LevelOutOfRange(stored.level));
    }

    Ok(Reading::new(time, stored.level.round() as i32))
}

/// Decodes the value stored under the readings path.
///
/// `null` means nothing has been recorded yet and yields `Ok(None)`. Keys
/// that look like array indices may come back as a JSON array with holes;
/// holes are skipped.
pub fn decode_snapshot(value: &Value, offset: &FixedOffset) -> Result<Option<DecodedSnapshot>, CodecError> {
    let entries: Vec<(String, &Value)> = match value {
        Value::Null => return Ok(None),
        Value::Object(map) => map.iter().map(|(key, value)| (key.clone(), value)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter(|(_, value)| !value.is_null())
            .map(|(index, value)| (index.to_string(), value))
            .collect(),
        Value::Bool(_) => return Err(CodecError::UnexpectedShape("boolean")),
        Value::Number(_) => return Err(CodecError::UnexpectedShape("number")),
        Value::String(_) => return Err(CodecError::UnexpectedShape("string")),
    };

    let mut snapshot = DecodedSnapshot::default();
    for (key, value) in entries {
        match decode_record(value, offset) {
            Ok(reading) => snapshot.readings.push(reading),
            Err(error) => snapshot.rejected.push((key, error)),
        }
    }

    Ok(Some(snapshot))
}
