use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,
    #[error("invalid moisture level: {0:?}")]
    InvalidMoisture(String),
    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),
    #[error("level out of range: {0}")]
    LevelOutOfRange(f64),
    #[error("expected an object or null, found {0}")]
    UnexpectedShape(&'static str),
    #[error("event stream line too long: {0} bytes pending")]
    LineTooLong(usize),
    #[error("unknown stream event: {0:?}")]
    UnknownEvent(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
