mod sources;
mod streaming;

pub use sources::{QuerySources, SourceEvent, SourceRef};
pub use streaming::{
    ListenerId, PendingStreamsIndex, QuadPatternStopHandle, QuadPatternStream, StreamingStore,
    StreamingStoreOptions,
};
