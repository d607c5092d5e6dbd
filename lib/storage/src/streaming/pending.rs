use futures::channel::mpsc::UnboundedSender;
use rdf_delta_model::{DeltaQuad, QuadPattern};
use rustc_hash::FxHashMap;

/// Identifies a listener in the [PendingStreamsIndex].
pub type ListenerId = u64;

/// Keeps track of all open pattern streams of a store.
///
/// Listeners are grouped by their pattern. Dispatching a quad looks up all sixteen patterns that
/// could match it instead of testing every listener.
#[derive(Debug, Default)]
pub struct PendingStreamsIndex {
    next_id: ListenerId,
    listeners: FxHashMap<QuadPattern, Vec<(ListenerId, UnboundedSender<DeltaQuad>)>>,
    len: usize,
}

impl PendingStreamsIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `sender` for all future quads that match `pattern`.
    pub fn add_pattern_listener(
        &mut self,
        pattern: QuadPattern,
        sender: UnboundedSender<DeltaQuad>,
    ) -> ListenerId {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.entry(pattern).or_default().push((id, sender));
        self.len += 1;
        id
    }

    /// Removes a listener. Dropping the sender closes the corresponding stream.
    ///
    /// Returns `false` if the listener was not registered.
    pub fn remove_pattern_listener(&mut self, pattern: &QuadPattern, id: ListenerId) -> bool {
        let Some(listeners) = self.listeners.get_mut(pattern) else {
            return false;
        };
        let Some(position) = listeners.iter().position(|(other, _)| *other == id) else {
            return false;
        };

        listeners.remove(position);
        if listeners.is_empty() {
            self.listeners.remove(pattern);
        }
        self.len -= 1;
        true
    }

    /// Forwards `quad` to every listener whose pattern matches. Returns the number of receivers.
    pub fn dispatch(&self, quad: &DeltaQuad) -> usize {
        let mut receivers = 0;
        for pattern in QuadPattern::all_matching(&quad.quad) {
            let Some(listeners) = self.listeners.get(&pattern) else {
                continue;
            };
            for (_, sender) in listeners {
                // A failing send means that the stream was dropped and will unregister itself.
                if sender.unbounded_send(quad.clone()).is_ok() {
                    receivers += 1;
                }
            }
        }
        receivers
    }

    /// Removes all listeners, which closes their streams.
    pub fn close_all(&mut self) {
        self.listeners.clear();
        self.len = 0;
    }

    /// Returns the number of registered listeners.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns whether no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
