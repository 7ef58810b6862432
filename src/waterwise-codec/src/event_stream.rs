use serde_json::Value;

use crate::CodecError;

/// One dispatched `text/event-stream` event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerSentEvent {
    pub event: String,
    pub data: String,
}

/// Incremental `text/event-stream` line decoder.
///
/// Chunks may split lines (and UTF-8 sequences) anywhere; only complete lines
/// are interpreted. A pending line longer than the limit is an error.
#[derive(Debug)]
pub struct EventStreamDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already known to hold no newline.
    scanned: usize,
    max_line: usize,
    event: Option<String>,
    data: Vec<String>,
}

impl Default for EventStreamDecoder {
    fn default() -> Self {
        Self::with_max_line(Self::MAX_LINE)
    }
}

impl EventStreamDecoder {
    /// A `put` of the whole readings path arrives as a single data line.
    pub const MAX_LINE: usize = 16 * 1024 * 1024;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            max_line,
            event: None,
            data: Vec::new(),
        }
    }

    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<ServerSentEvent>, CodecError> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(offset) = self.buffer[from..].iter().position(|b| *b == b'\n') {
            let end = from + offset;
            let text = String::from_utf8_lossy(&self.buffer[start..end]).into_owned();
            let line = text.strip_suffix('\r').unwrap_or(&text);

            if let Some(event) = self.process_line(line) {
                events.push(event);
            }

            start = end + 1;
            from = start;
        }

        self.buffer.drain(..start);
        self.scanned = self.buffer.len();

        if self.buffer.len() > self.max_line {
            let pending = self.buffer.len();
            self.buffer.clear();
            self.scanned = 0;
            self.event = None;
            self.data.clear();
            return Err(CodecError::LineTooLong(pending));
        }

        Ok(events)
    }

    fn process_line(&mut self, line: &str) -> Option<ServerSentEvent> {
        if line.is_empty() {
            return self.dispatch();
        }

        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }

        None
    }

    fn dispatch(&mut self) -> Option<ServerSentEvent> {
        let event = self.event.take();
        let data = std::mem::take(&mut self.data);

        if event.is_none() && data.is_empty() {
            return None;
        }

        Some(ServerSentEvent {
            event: event.unwrap_or_else(|| "message".to_string()),
            data: data.join("\n"),
        })
    }
}

#[derive(Debug, Deserialize)]
struct PathData {
    path: String,
    data: Value,
}

/// Change notifications sent by the realtime store on a streaming read.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Put { path: String, data: Value },
    Patch { path: String, data: Value },
    KeepAlive,
    Cancel(String),
    AuthRevoked(String),
}

impl TryFrom<ServerSentEvent> for StoreEvent {
    type Error = CodecError;

    fn try_from(sse: ServerSentEvent) -> Result<Self, Self::Error> {
        match sse.event.as_str() {
            "put" => {
                let PathData { path, data } = serde_json::from_str(&sse.data)?;
                Ok(Self::Put { path, data })
            }
            "patch" => {
                let PathData { path, data } = serde_json::from_str(&sse.data)?;
                Ok(Self::Patch { path, data })
            }
            "keep-alive" => Ok(Self::KeepAlive),
            "cancel" => Ok(Self::Cancel(sse.data)),
            "auth_revoked" => Ok(Self::AuthRevoked(sse.data)),
            _ => Err(CodecError::UnknownEvent(sse.event)),
        }
    }
}
