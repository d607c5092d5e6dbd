use crate::streaming::pending::ListenerId;
use crate::streaming::store::StreamingStore;
use futures::channel::mpsc::UnboundedReceiver;
use futures::{Stream, StreamExt};
use rdf_delta_common::Cancelable;
use rdf_delta_model::{DeltaQuad, QuadPattern};
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

/// A live stream of the quads that match a pattern.
///
/// The stream first replays the matching quads of the store and then emits every matching change.
/// Dropping the stream unregisters it from the store.
pub struct QuadPatternStream {
    /// Quads that were stored when the stream was created.
    snapshot: VecDeque<DeltaQuad>,
    /// Receives changes. [None] if the store had already ended.
    live: Option<UnboundedReceiver<DeltaQuad>>,
    snapshot_len: usize,
    stop_handle: QuadPatternStopHandle,
}

impl QuadPatternStream {
    pub(crate) fn new(
        snapshot: VecDeque<DeltaQuad>,
        live: Option<UnboundedReceiver<DeltaQuad>>,
        stop_handle: QuadPatternStopHandle,
    ) -> Self {
        Self {
            snapshot_len: snapshot.len(),
            snapshot,
            live,
            stop_handle,
        }
    }

    /// Returns a handle that stops this stream.
    ///
    /// Stopping unregisters the stream from the store. Changes that were already received are
    /// still emitted before the stream ends.
    pub fn stop_handle(&self) -> QuadPatternStopHandle {
        self.stop_handle.clone()
    }

    /// Stops this stream. See [Self::stop_handle].
    pub fn stop(&self) {
        self.stop_handle.stop();
    }

    /// Returns the number of quads that are replayed from the store.
    pub fn snapshot_len(&self) -> usize {
        self.snapshot_len
    }
}

impl Stream for QuadPatternStream {
    type Item = DeltaQuad;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(quad) = self.snapshot.pop_front() {
            return Poll::Ready(Some(quad));
        }

        match &mut self.live {
            Some(live) => live.poll_next_unpin(cx),
            None => Poll::Ready(None),
        }
    }
}

impl Drop for QuadPatternStream {
    fn drop(&mut self) {
        self.stop_handle.stop();
    }
}

/// Stops a [QuadPatternStream].
#[derive(Clone)]
pub struct QuadPatternStopHandle(Arc<Mutex<Option<Registration>>>);

struct Registration {
    store: StreamingStore,
    pattern: QuadPattern,
    id: ListenerId,
}

impl QuadPatternStopHandle {
    pub(crate) fn new(store: StreamingStore, pattern: QuadPattern, id: ListenerId) -> Self {
        Self(Arc::new(Mutex::new(Some(Registration { store, pattern, id }))))
    }

    /// A handle for a stream that is not registered in a store.
    pub(crate) fn detached() -> Self {
        Self(Arc::new(Mutex::new(None)))
    }

    /// Unregisters the stream from its store. Has no effect if already stopped.
    pub fn stop(&self) {
        let registration = self.0.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(registration) = registration {
            registration
                .store
                .unregister(&registration.pattern, registration.id);
        }
    }

    /// Returns whether the stream is no longer registered.
    pub fn is_stopped(&self) -> bool {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).is_none()
    }
}

impl Cancelable for QuadPatternStopHandle {
    fn cancel(&self) {
        self.stop();
    }
}
