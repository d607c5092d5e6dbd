use futures::{Stream, StreamExt};
use rdf_delta_common::error::QueryEvaluationError;
use rdf_delta_common::{BindingsMetadata, BindingsStream, MetadataHandle, QueryOperationResult};
use rdf_delta_model::{Bindings, Variable};
use std::fmt::{Debug, Formatter};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// A stream over the changes to the solutions of a query.
///
/// Every item is a solution tagged as an addition or a deletion. Applying all items in order
/// yields the current solution multiset. Dropping the stream releases all listeners that the
/// query registered on its sources.
pub struct QuerySolutionStream {
    /// The variables of the query, in the order of the projection.
    variables: Arc<[Variable]>,
    metadata: MetadataHandle,
    inner: BindingsStream,
}

impl QuerySolutionStream {
    /// Creates a new [QuerySolutionStream] from the output of the root operator.
    pub fn new(variables: Arc<[Variable]>, result: QueryOperationResult) -> Self {
        Self {
            variables,
            metadata: result.metadata,
            inner: result.stream,
        }
    }

    /// The variables used in the solutions.
    #[inline]
    pub fn variables(&self) -> &[Variable] {
        self.variables.as_ref()
    }

    /// Returns the current metadata of the root operator.
    pub fn metadata(&self) -> BindingsMetadata {
        self.metadata.current()
    }

    /// Stops all pattern streams that feed this query. The stream ends once the pending changes
    /// have been processed.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Returns the underlying [BindingsStream].
    pub fn into_bindings_stream(self) -> BindingsStream {
        self.inner
    }
}

impl Stream for QuerySolutionStream {
    type Item = Result<Bindings, QueryEvaluationError>;

    #[inline]
    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl Debug for QuerySolutionStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuerySolutionStream")
            .field("variables", &self.variables)
            .finish_non_exhaustive()
    }
}
