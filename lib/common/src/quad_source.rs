use crate::error::QueryEvaluationError;
use crate::{CancelHandles, Cancelable};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use rdf_delta_model::{DeltaQuad, QuadPattern};
use std::pin::Pin;
use std::task::{Context, Poll};

/// A single item of a [DeltaQuadStream].
pub type DeltaQuadResult = Result<DeltaQuad, QueryEvaluationError>;

/// A source of quads that can be matched against patterns.
///
/// The returned streams first emit the quads that currently match the pattern and then keep
/// emitting matching changes until the source ends or the stream is cancelled.
pub trait QuadSource: Send + Sync {
    /// Returns a live stream of all quads that match `pattern`.
    fn match_pattern(&self, pattern: QuadPattern)
        -> Result<DeltaQuadStream, QueryEvaluationError>;
}

/// A live stream of tagged quads.
pub struct DeltaQuadStream {
    inner: BoxStream<'static, DeltaQuadResult>,
    cancel_handles: CancelHandles,
    /// The number of quads that were replayed from the current state of the source.
    snapshot_len: usize,
}

impl DeltaQuadStream {
    /// Creates a new [DeltaQuadStream].
    pub fn new(
        stream: impl Stream<Item = DeltaQuadResult> + Send + 'static,
        cancel_handles: CancelHandles,
        snapshot_len: usize,
    ) -> Self {
        Self {
            inner: stream.boxed(),
            cancel_handles,
            snapshot_len,
        }
    }

    /// Returns the cancel handles of this stream.
    pub fn cancel_handles(&self) -> &CancelHandles {
        &self.cancel_handles
    }

    /// Returns the number of quads that are replayed before live changes arrive.
    pub fn snapshot_len(&self) -> usize {
        self.snapshot_len
    }

    /// Stops this stream and releases the listeners it holds.
    pub fn cancel(&self) {
        self.cancel_handles.cancel();
    }
}

impl Stream for DeltaQuadStream {
    type Item = DeltaQuadResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}
