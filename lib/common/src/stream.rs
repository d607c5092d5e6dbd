use crate::error::QueryEvaluationError;
use crate::{CancelHandles, Cancelable, MetadataHandle};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use rdf_delta_model::Bindings;
use std::fmt::{Debug, Formatter};
use std::pin::Pin;
use std::task::{Context, Poll};

/// A single item of a [BindingsStream].
pub type BindingsResult = Result<Bindings, QueryEvaluationError>;

/// A stream of tagged solutions.
///
/// Besides the solutions, the stream carries the cancel handles of all resources that feed it.
pub struct BindingsStream {
    inner: BoxStream<'static, BindingsResult>,
    cancel_handles: CancelHandles,
}

impl BindingsStream {
    /// Creates a new [BindingsStream].
    pub fn new(
        stream: impl Stream<Item = BindingsResult> + Send + 'static,
        cancel_handles: CancelHandles,
    ) -> Self {
        Self {
            inner: stream.boxed(),
            cancel_handles,
        }
    }

    /// Creates a stream that emits the given solutions and ends.
    pub fn from_bindings(bindings: Vec<Bindings>) -> Self {
        Self::new(
            futures::stream::iter(bindings.into_iter().map(Ok)),
            CancelHandles::new(),
        )
    }

    /// Returns the cancel handles of this stream and all its inputs.
    pub fn cancel_handles(&self) -> &CancelHandles {
        &self.cancel_handles
    }

    /// Stops this stream and all its inputs.
    pub fn cancel(&self) {
        self.cancel_handles.cancel();
    }
}

impl Stream for BindingsStream {
    type Item = BindingsResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl Debug for BindingsStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingsStream")
            .field("cancel_handles", &self.cancel_handles)
            .finish_non_exhaustive()
    }
}

/// The result of setting up an operator: its output stream and its metadata.
#[derive(Debug)]
pub struct QueryOperationResult {
    pub stream: BindingsStream,
    pub metadata: MetadataHandle,
}

impl QueryOperationResult {
    /// Creates a new [QueryOperationResult].
    pub fn new(stream: BindingsStream, metadata: MetadataHandle) -> Self {
        Self { stream, metadata }
    }
}
