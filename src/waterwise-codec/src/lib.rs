#[macro_use]
extern crate serde;

mod error;
pub use error::CodecError;

mod live;
pub use live::{LiveMessage, Topics};

mod timestamp;
pub use timestamp::parse_timestamp;

mod snapshot;
pub use snapshot::{DecodedSnapshot, decode_record, decode_snapshot};

mod event_stream;
pub use event_stream::{EventStreamDecoder, ServerSentEvent, StoreEvent};

mod tree;
pub use tree::SnapshotTree;
