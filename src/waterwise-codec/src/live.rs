use std::str::FromStr;

use waterwise_types::PumpStatus;

use crate::CodecError;

/// Topic names the field controller publishes on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topics {
    pub moisture: String,
    pub pump: String,
}

impl Topics {
    pub const DEFAULT_MOISTURE: &'static str = "smart/watering/moisture";
    pub const DEFAULT_PUMP: &'static str = "smart/watering/relay";
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            moisture: Self::DEFAULT_MOISTURE.to_string(),
            pump: Self::DEFAULT_PUMP.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveMessage {
    Moisture(i32),
    Pump(PumpStatus),
}

impl LiveMessage {
    /// Decodes a publish. Topics other than the two configured ones yield
    /// `Ok(None)`.
    pub fn decode(topics: &Topics, topic: &str, payload: &[u8]) -> Result<Option<Self>, CodecError> {
        if topic != topics.moisture && topic != topics.pump {
            return Ok(None);
        }

        let text = std::str::from_utf8(payload)
            .map_err(|_| CodecError::InvalidUtf8)?
            .trim();

        if topic == topics.moisture {
            parse_level(text).map(|level| Some(Self::Moisture(level)))
        } else {
            let status = PumpStatus::from_str(text)
                .unwrap_or_else(|_| PumpStatus::Other(text.to_string()));
            Ok(Some(Self::Pump(status)))
        }
    }
}

/// Decimal integer percentage; fractional payloads are truncated toward zero.
fn parse_level(text: &str) -> Result<i32, CodecError> {
    if let Ok(level) = text.parse::<i32>() {
        return Ok(level);
    }

    match text.parse::<f64>() {
        Ok(value) if value.is_finite() && value.abs() < f64::from(i32::MAX) => Ok(value.trunc() as i32),
        _ => Err(CodecError::InvalidMoisture(text.to_string())),
    }
}
