use crate::streaming::{QuadPatternStopHandle, QuadPatternStream, StreamingStore};
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::{Stream, StreamExt};
use rdf_delta_common::error::QueryEvaluationError;
use rdf_delta_common::{CancelHandles, Cancelable, DeltaQuadResult, DeltaQuadStream, QuadSource};
use rdf_delta_model::{DeltaQuad, Quad, QuadPattern};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::fmt::{Debug, Formatter};
use std::pin::{pin, Pin};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tracing::{debug, warn};

/// A named query source backed by a [StreamingStore].
///
/// Two references are considered equal if they have the same name.
#[derive(Clone)]
pub struct SourceRef {
    name: Arc<str>,
    store: StreamingStore,
}

impl SourceRef {
    /// Creates a new [SourceRef].
    pub fn new(name: impl Into<Arc<str>>, store: StreamingStore) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }

    /// Returns the name of the source.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the store that holds the quads of the source.
    pub fn store(&self) -> &StreamingStore {
        &self.store
    }
}

impl PartialEq for SourceRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for SourceRef {}

impl Debug for SourceRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SourceRef").field(&self.name).finish()
    }
}

/// Announces that a source joins or leaves the set of query sources.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceEvent {
    pub source: SourceRef,
    pub is_addition: bool,
}

impl SourceEvent {
    /// A source joins the query.
    pub fn added(source: SourceRef) -> Self {
        Self {
            source,
            is_addition: true,
        }
    }

    /// A source leaves the query.
    pub fn removed(source: SourceRef) -> Self {
        Self {
            source,
            is_addition: false,
        }
    }
}

/// A dynamic union of query sources.
///
/// Pattern streams of the union contain the quads of every source that is currently part of the
/// union. Adding a source replays its matching quads into all open streams. Removing a source
/// stops its pattern streams and retracts every quad the union emitted on its behalf.
///
/// The same source may be added multiple times. Every addition contributes its own copies of the
/// quads and is undone by one removal.
#[derive(Clone, Default)]
pub struct QuerySources {
    state: Arc<Mutex<SourcesState>>,
}

#[derive(Default)]
struct SourcesState {
    next_entry: u64,
    entries: Vec<(u64, SourceRef)>,
    subscribers: Vec<UnboundedSender<SourceMessage>>,
    closed: bool,
}

enum SourceMessage {
    Added(u64, SourceRef),
    Removed(u64),
    Failed(String),
}

impl QuerySources {
    /// Creates an empty union.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a union of the given sources.
    pub fn with_sources(sources: impl IntoIterator<Item = SourceRef>) -> Self {
        let result = Self::new();
        for source in sources {
            result.add_source(source);
        }
        result
    }

    /// Adds a source to the union.
    pub fn add_source(&self, source: SourceRef) {
        let mut state = self.lock();
        let entry = state.next_entry;
        state.next_entry += 1;
        debug!(source = source.name(), entry, "Adding query source");
        state.entries.push((entry, source.clone()));
        state.broadcast(|| SourceMessage::Added(entry, source.clone()));
    }

    /// Removes one addition of `source` from the union.
    ///
    /// Removing a source that is not part of the union is an error that is also reported on all
    /// open streams.
    pub fn remove_source(&self, source: &SourceRef) -> Result<(), QueryEvaluationError> {
        let mut state = self.lock();
        let Some(position) = state.entries.iter().position(|(_, other)| other == source) else {
            let message = format!("Deleted source {} has not been added", source.name());
            warn!("{message}");
            state.broadcast(|| SourceMessage::Failed(message.clone()));
            return Err(QueryEvaluationError::Source(message));
        };

        let (entry, _) = state.entries.remove(position);
        debug!(source = source.name(), entry, "Removing query source");
        state.broadcast(|| SourceMessage::Removed(entry));
        Ok(())
    }

    /// Applies a single [SourceEvent].
    pub fn apply(&self, event: SourceEvent) -> Result<(), QueryEvaluationError> {
        if event.is_addition {
            self.add_source(event.source);
            Ok(())
        } else {
            self.remove_source(&event.source)
        }
    }

    /// Applies all events of a source discovery stream and closes the union once the stream ends.
    pub async fn watch(
        &self,
        events: impl Stream<Item = SourceEvent>,
    ) -> Result<(), QueryEvaluationError> {
        let mut events = pin!(events);
        while let Some(event) = events.next().await {
            self.apply(event)?;
        }
        self.close();
        Ok(())
    }

    /// Declares that no further sources will be added or removed. Pattern streams end once all
    /// their sources have ended.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.subscribers.clear();
    }

    /// Returns the sources that are currently part of the union.
    pub fn sources(&self) -> Vec<SourceRef> {
        self.lock()
            .entries
            .iter()
            .map(|(_, source)| source.clone())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, SourcesState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Debug for QuerySources {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuerySources")
            .field("sources", &self.sources())
            .finish()
    }
}

impl QuadSource for QuerySources {
    fn match_pattern(
        &self,
        pattern: QuadPattern,
    ) -> Result<DeltaQuadStream, QueryEvaluationError> {
        let mut state = self.lock();
        let cancel = Arc::new(UnionCancelHandle::default());

        let mut members = Vec::with_capacity(state.entries.len());
        for (entry, source) in &state.entries {
            let stream = source.store().watch_pattern(pattern.clone());
            cancel.track(stream.stop_handle());
            members.push(UnionMember::new(*entry, stream));
        }
        let snapshot_len = members.iter().map(|m| m.stream.snapshot_len()).sum();

        let control = if state.closed {
            None
        } else {
            let (sender, receiver) = unbounded();
            state.subscribers.push(sender);
            Some(receiver)
        };

        let stream = SourceUnionStream {
            pattern,
            control,
            members,
            pending: VecDeque::new(),
            next_member: 0,
            cancel: Arc::clone(&cancel),
        };
        Ok(DeltaQuadStream::new(
            stream,
            CancelHandles::single(cancel),
            snapshot_len,
        ))
    }
}

impl SourcesState {
    fn broadcast(&mut self, message: impl Fn() -> SourceMessage) {
        self.subscribers
            .retain(|subscriber| subscriber.unbounded_send(message()).is_ok());
    }
}

/// Stops all pattern streams of a union.
#[derive(Default)]
struct UnionCancelHandle {
    cancelled: AtomicBool,
    members: Mutex<Vec<QuadPatternStopHandle>>,
}

impl UnionCancelHandle {
    fn track(&self, handle: QuadPatternStopHandle) {
        self.members
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Cancelable for UnionCancelHandle {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        let members =
            std::mem::take(&mut *self.members.lock().unwrap_or_else(PoisonError::into_inner));
        for member in members {
            member.stop();
        }
    }
}

/// The pattern stream of a single source within the union.
struct UnionMember {
    entry: u64,
    stream: QuadPatternStream,
    /// The multiplicity of each quad that the union emitted for this member.
    live: FxHashMap<Quad, usize>,
    done: bool,
}

impl UnionMember {
    fn new(entry: u64, stream: QuadPatternStream) -> Self {
        Self {
            entry,
            stream,
            live: FxHashMap::default(),
            done: false,
        }
    }

    fn track(&mut self, quad: &DeltaQuad) {
        if quad.is_addition() {
            *self.live.entry(quad.quad.clone()).or_insert(0) += 1;
        } else if let Some(count) = self.live.get_mut(&quad.quad) {
            *count -= 1;
            if *count == 0 {
                self.live.remove(&quad.quad);
            }
        }
    }
}

struct SourceUnionStream {
    pattern: QuadPattern,
    /// Receives source changes. [None] once the union is closed.
    control: Option<UnboundedReceiver<SourceMessage>>,
    members: Vec<UnionMember>,
    /// Retractions and errors that must be emitted before anything else.
    pending: VecDeque<DeltaQuadResult>,
    /// The member that is polled first, such that no member starves the others.
    next_member: usize,
    cancel: Arc<UnionCancelHandle>,
}

impl SourceUnionStream {
    fn handle_message(&mut self, message: SourceMessage) {
        match message {
            SourceMessage::Added(entry, source) => {
                let stream = source.store().watch_pattern(self.pattern.clone());
                self.cancel.track(stream.stop_handle());
                self.members.push(UnionMember::new(entry, stream));
            }
            SourceMessage::Removed(entry) => {
                let Some(position) = self.members.iter().position(|m| m.entry == entry) else {
                    return;
                };
                let member = self.members.remove(position);
                member.stream.stop();
                for (quad, count) in member.live {
                    for _ in 0..count {
                        self.pending.push_back(Ok(DeltaQuad::deletion(quad.clone())));
                    }
                }
            }
            SourceMessage::Failed(message) => self
                .pending
                .push_back(Err(QueryEvaluationError::Source(message))),
        }
    }
}

impl Stream for SourceUnionStream {
    type Item = DeltaQuadResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.cancel.is_cancelled() {
            this.members.clear();
            this.control = None;
            return Poll::Ready(None);
        }

        loop {
            if let Some(item) = this.pending.pop_front() {
                return Poll::Ready(Some(item));
            }

            if let Some(control) = &mut this.control {
                match control.poll_next_unpin(cx) {
                    Poll::Ready(Some(message)) => {
                        this.handle_message(message);
                        continue;
                    }
                    Poll::Ready(None) => {
                        this.control = None;
                        continue;
                    }
                    Poll::Pending => {}
                }
            }

            let count = this.members.len();
            for offset in 0..count {
                let idx = (this.next_member + offset) % count;
                let member = &mut this.members[idx];
                if member.done {
                    continue;
                }
                match member.stream.poll_next_unpin(cx) {
                    Poll::Ready(Some(quad)) => {
                        member.track(&quad);
                        this.next_member = idx + 1;
                        return Poll::Ready(Some(Ok(quad)));
                    }
                    Poll::Ready(None) => member.done = true,
                    Poll::Pending => {}
                }
            }

            if this.control.is_none() && this.members.iter().all(|m| m.done) {
                return Poll::Ready(None);
            }
            return Poll::Pending;
        }
    }
}
