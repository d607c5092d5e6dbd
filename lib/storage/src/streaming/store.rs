use crate::streaming::pending::{ListenerId, PendingStreamsIndex};
use crate::streaming::stream::{QuadPatternStopHandle, QuadPatternStream};
use futures::channel::mpsc::unbounded;
use futures::{Stream, StreamExt};
use rdf_delta_common::error::{QueryEvaluationError, StorageError};
use rdf_delta_common::{CancelHandles, DeltaQuadStream, QuadSource};
use rdf_delta_model::{DeltaQuad, GraphName, NamedNode, Quad, QuadPattern, Subject, Term};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::fmt::{Debug, Formatter};
use std::pin::pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

/// Options of a [StreamingStore].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamingStoreOptions {
    /// Ends the store once the last open pattern stream is closed.
    pub end_on_last_listener_close: bool,
}

impl StreamingStoreOptions {
    #[must_use]
    pub fn with_end_on_last_listener_close(mut self, value: bool) -> Self {
        self.end_on_last_listener_close = value;
        self
    }
}

impl Default for StreamingStoreOptions {
    fn default() -> Self {
        Self {
            end_on_last_listener_close: true,
        }
    }
}

/// A mutable quad store whose pattern streams stay open and receive future changes.
///
/// Every quad is stored with its multiplicity. Importing the same quad twice stores two copies
/// that must be removed separately.
/// Removing a quad that is not stored is neither applied nor dispatched to any pattern stream.
///
/// # Consistency
///
/// All mutations, snapshot reads and listener registrations happen under a single lock. Hence, a
/// pattern stream observes exactly the quads stored when it was created followed by every later
/// change, in the order in which the changes were applied.
///
/// ```
/// use futures::StreamExt;
/// use rdf_delta_model::{DeltaQuad, GraphName, NamedNode, Quad, QuadPattern};
/// use rdf_delta_storage::StreamingStore;
///
/// # tokio_test::block_on(async {
/// let ex = NamedNode::new("http://example.com")?;
/// let quad = Quad::new(ex.clone(), ex.clone(), ex.clone(), GraphName::DefaultGraph);
///
/// let store = StreamingStore::new();
/// let mut stream = store.watch_pattern(QuadPattern::any());
///
/// store.add_quad(quad.clone())?;
/// store.remove_quad(quad.clone())?;
/// store.end();
///
/// assert_eq!(stream.next().await, Some(DeltaQuad::addition(quad.clone())));
/// assert_eq!(stream.next().await, Some(DeltaQuad::deletion(quad)));
/// assert_eq!(stream.next().await, None);
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// # }).unwrap();
/// ```
#[derive(Clone)]
pub struct StreamingStore {
    state: Arc<Mutex<StoreState>>,
}

struct StoreState {
    /// The multiplicity of each stored quad.
    quads: FxHashMap<Quad, usize>,
    /// The open pattern streams.
    pending: PendingStreamsIndex,
    /// Changes received while halted.
    buffer: Vec<DeltaQuad>,
    ended: bool,
    halted: bool,
    options: StreamingStoreOptions,
}

impl StreamingStore {
    /// Creates an empty store with the default options.
    pub fn new() -> Self {
        Self::new_with_options(StreamingStoreOptions::default())
    }

    /// Creates an empty store.
    pub fn new_with_options(options: StreamingStoreOptions) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState {
                quads: FxHashMap::default(),
                pending: PendingStreamsIndex::new(),
                buffer: Vec::new(),
                ended: false,
                halted: false,
                options,
            })),
        }
    }

    /// Imports the given quads. Untagged quads are additions.
    ///
    /// Fails if the store has already ended.
    pub fn import(
        &self,
        quads: impl IntoIterator<Item = impl Into<DeltaQuad>>,
    ) -> Result<(), StorageError> {
        let mut state = self.lock();
        if state.ended {
            return Err(StorageError::ImportAfterEnd);
        }
        for quad in quads {
            state.submit(quad.into().with_default_diff(true));
        }
        Ok(())
    }

    /// Removes the given quads. Untagged quads are removals, while quads that are explicitly tagged
    /// as additions are still added.
    ///
    /// Removing a quad that is not stored has no effect. Fails if the store has already ended.
    pub fn remove(
        &self,
        quads: impl IntoIterator<Item = impl Into<DeltaQuad>>,
    ) -> Result<(), StorageError> {
        let mut state = self.lock();
        if state.ended {
            return Err(StorageError::RemoveAfterEnd);
        }
        for quad in quads {
            state.submit(quad.into().with_default_diff(false));
        }
        Ok(())
    }

    /// Imports all quads of `quads`. See [Self::import].
    pub async fn import_stream(
        &self,
        quads: impl Stream<Item = DeltaQuad>,
    ) -> Result<(), StorageError> {
        let mut quads = pin!(quads);
        while let Some(quad) = quads.next().await {
            self.import([quad])?;
        }
        Ok(())
    }

    /// Removes all quads of `quads`. See [Self::remove].
    pub async fn remove_stream(
        &self,
        quads: impl Stream<Item = DeltaQuad>,
    ) -> Result<(), StorageError> {
        let mut quads = pin!(quads);
        while let Some(quad) = quads.next().await {
            self.remove([quad])?;
        }
        Ok(())
    }

    /// Adds a single quad.
    pub fn add_quad(&self, quad: Quad) -> Result<(), StorageError> {
        self.import([DeltaQuad::addition(quad)])
    }

    /// Removes a single copy of a quad.
    pub fn remove_quad(&self, quad: Quad) -> Result<(), StorageError> {
        self.remove([DeltaQuad::deletion(quad)])
    }

    /// Returns a stream of all quads that match the given components. See [Self::watch_pattern].
    pub fn match_quads(
        &self,
        subject: Option<Subject>,
        predicate: Option<NamedNode>,
        object: Option<Term>,
        graph_name: Option<GraphName>,
    ) -> QuadPatternStream {
        self.watch_pattern(QuadPattern::new(subject, predicate, object, graph_name))
    }

    /// Returns a stream that first replays all stored quads matching `pattern` and then emits
    /// every matching change until the store ends or the stream is stopped.
    ///
    /// If the store has already ended, the stream ends after the replay.
    pub fn watch_pattern(&self, pattern: QuadPattern) -> QuadPatternStream {
        let mut state = self.lock();
        let snapshot = state
            .quads
            .iter()
            .filter(|(quad, _)| pattern.matches(quad))
            .flat_map(|(quad, count)| {
                std::iter::repeat_with(|| DeltaQuad::addition(quad.clone())).take(*count)
            })
            .collect::<VecDeque<_>>();

        if state.ended {
            return QuadPatternStream::new(snapshot, None, QuadPatternStopHandle::detached());
        }

        let (sender, receiver) = unbounded();
        let id = state.pending.add_pattern_listener(pattern.clone(), sender);
        debug!(%pattern, id, "Registered pattern listener");
        let stop_handle = QuadPatternStopHandle::new(self.clone(), pattern, id);
        QuadPatternStream::new(snapshot, Some(receiver), stop_handle)
    }

    /// Ends the store. All open pattern streams end and future imports or removals fail.
    ///
    /// Changes that were buffered by [Self::halt] are applied first.
    pub fn end(&self) {
        self.lock().end();
    }

    /// Buffers all changes until [Self::resume] is called.
    pub fn halt(&self) {
        debug!("Halting store");
        self.lock().halted = true;
    }

    /// Applies all buffered changes in their original order.
    pub fn resume(&self) {
        let mut state = self.lock();
        debug!(buffered = state.buffer.len(), "Resuming store");
        state.flush();
    }

    /// Returns whether [Self::end] was called.
    pub fn has_ended(&self) -> bool {
        self.lock().ended
    }

    /// Returns whether changes are currently buffered.
    pub fn is_halted(&self) -> bool {
        self.lock().halted
    }

    /// Returns the number of stored quads, counting each copy.
    pub fn len(&self) -> usize {
        self.lock().quads.values().sum()
    }

    /// Returns whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().quads.is_empty()
    }

    /// Returns whether at least one copy of `quad` is stored.
    pub fn contains(&self, quad: &Quad) -> bool {
        self.lock().quads.contains_key(quad)
    }

    /// Returns a copy of all stored quads, repeating quads with multiple copies.
    pub fn quads(&self) -> Vec<Quad> {
        self.lock()
            .quads
            .iter()
            .flat_map(|(quad, count)| std::iter::repeat(quad.clone()).take(*count))
            .collect()
    }

    /// Returns the number of open pattern streams.
    pub fn listener_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Removes a listener. Ends the store if it was the last one and the store is configured to
    /// do so.
    pub(crate) fn unregister(&self, pattern: &QuadPattern, id: ListenerId) {
        let mut state = self.lock();
        if !state.pending.remove_pattern_listener(pattern, id) {
            return;
        }
        debug!(%pattern, id, "Removed pattern listener");

        if state.pending.is_empty() && state.options.end_on_last_listener_close && !state.ended {
            debug!("Last pattern listener closed");
            state.end();
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for StreamingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for StreamingStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("StreamingStore")
            .field("quads", &state.quads.len())
            .field("listeners", &state.pending.len())
            .field("ended", &state.ended)
            .field("halted", &state.halted)
            .finish()
    }
}

impl QuadSource for StreamingStore {
    fn match_pattern(
        &self,
        pattern: QuadPattern,
    ) -> Result<DeltaQuadStream, QueryEvaluationError> {
        let stream = self.watch_pattern(pattern);
        let cancel_handles = CancelHandles::single(Arc::new(stream.stop_handle()));
        let snapshot_len = stream.snapshot_len();
        Ok(DeltaQuadStream::new(
            stream.map(Ok),
            cancel_handles,
            snapshot_len,
        ))
    }
}

impl StoreState {
    fn submit(&mut self, quad: DeltaQuad) {
        if self.halted {
            self.buffer.push(quad);
        } else {
            self.apply(quad);
        }
    }

    /// Forwards `quad` to all matching listeners and applies it to the index.
    fn apply(&mut self, quad: DeltaQuad) {
        if quad.is_addition() {
            self.pending.dispatch(&quad);
            *self.quads.entry(quad.quad).or_insert(0) += 1;
            return;
        }

        let Some(count) = self.quads.get_mut(&quad.quad) else {
            trace!(quad = %quad.quad, "Ignoring the removal of a quad that is not stored");
            return;
        };
        *count -= 1;
        if *count == 0 {
            self.quads.remove(&quad.quad);
        }
        self.pending.dispatch(&quad);
    }

    fn flush(&mut self) {
        self.halted = false;
        for quad in std::mem::take(&mut self.buffer) {
            self.apply(quad);
        }
    }

    fn end(&mut self) {
        if self.ended {
            return;
        }
        self.flush();
        self.ended = true;
        debug!(listeners = self.pending.len(), "Ending store");
        self.pending.close_all();
    }
}
