mod blank_node_mode;
mod cancel;
pub mod error;
mod hash;
mod metadata;
mod quad_source;
mod stream;

pub use blank_node_mode::BlankNodeMatchingMode;
pub use cancel::{CancelHandles, Cancelable};
pub use hash::{BindingsHasher, FxBindingsHasher};
pub use metadata::{
    BindingsMetadata, Cardinality, MetadataHandle, MetadataValidationState, MetadataVariable,
};
pub use quad_source::{DeltaQuadResult, DeltaQuadStream, QuadSource};
pub use stream::{BindingsResult, BindingsStream, QueryOperationResult};
