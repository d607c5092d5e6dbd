mod pending;
mod store;
mod stream;

pub use pending::{ListenerId, PendingStreamsIndex};
pub use store::{StreamingStore, StreamingStoreOptions};
pub use stream::{QuadPatternStopHandle, QuadPatternStream};
