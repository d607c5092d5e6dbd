use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// A capability to stop a running stream early.
///
/// Streams that hold on to external resources (e.g., listeners of a store) expose this capability.
/// Combinators that wrap such streams forward the capability of all their inputs, such that
/// cancelling the top-most stream releases every resource of the query.
pub trait Cancelable: Send + Sync {
    /// Stops the stream. Calling this multiple times has no further effect.
    fn cancel(&self);
}

/// The cancel capabilities of a stream and all of its inputs.
#[derive(Clone, Default)]
pub struct CancelHandles(Vec<Arc<dyn Cancelable>>);

impl CancelHandles {
    /// Creates an empty set of handles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set of handles with a single element.
    pub fn single(handle: Arc<dyn Cancelable>) -> Self {
        Self(vec![handle])
    }

    /// Adds a handle.
    pub fn push(&mut self, handle: Arc<dyn Cancelable>) {
        self.0.push(handle);
    }

    /// Combines the handles of two streams.
    #[must_use]
    pub fn merge(mut self, other: &CancelHandles) -> Self {
        self.0.extend(other.0.iter().cloned());
        self
    }

    /// Returns the number of handles.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether there are no handles.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Cancelable for CancelHandles {
    fn cancel(&self) {
        for handle in &self.0 {
            handle.cancel();
        }
    }
}

impl Debug for CancelHandles {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelHandles")
            .field("len", &self.0.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl Cancelable for Counter {
        fn cancel(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn merged_handles_cancel_all_inputs() {
        let lhs = Arc::new(Counter::default());
        let rhs = Arc::new(Counter::default());

        let handles = CancelHandles::single(Arc::clone(&lhs) as Arc<dyn Cancelable>)
            .merge(&CancelHandles::single(Arc::clone(&rhs) as Arc<dyn Cancelable>));
        handles.cancel();

        assert_eq!(handles.len(), 2);
        assert_eq!(lhs.0.load(Ordering::SeqCst), 1);
        assert_eq!(rhs.0.load(Ordering::SeqCst), 1);
    }
}
