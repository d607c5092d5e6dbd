use crate::metadata::derived;
use futures::Stream;
use rdf_delta_common::{
    BindingsResult, BindingsStream, CancelHandles, Cardinality, MetadataVariable,
    QueryOperationResult,
};
use rdf_delta_model::{Bindings, GroundTerm, Term, Variable};
use std::fmt::{Debug, Formatter};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Emits the rows of an inline data block (`VALUES`) as additions and ends.
pub struct ValuesStream {
    rows: std::vec::IntoIter<Bindings>,
}

impl ValuesStream {
    /// Creates the stream for `rows`. A [None] entry leaves its variable unbound.
    pub fn create(
        variables: &[Variable],
        rows: &[Vec<Option<GroundTerm>>],
    ) -> QueryOperationResult {
        let rows = rows
            .iter()
            .map(|row| {
                variables
                    .iter()
                    .zip(row)
                    .filter_map(|(variable, term)| {
                        term.as_ref()
                            .map(|term| (variable.clone(), ground_term(term)))
                    })
                    .collect::<Bindings>()
            })
            .collect::<Vec<_>>();

        let metadata_variables = variables
            .iter()
            .map(|variable| {
                if rows.iter().all(|row| row.contains(variable.as_str())) {
                    MetadataVariable::bound(variable.clone())
                } else {
                    MetadataVariable::maybe_undef(variable.clone())
                }
            })
            .collect();
        let metadata = derived(Cardinality::Exact(rows.len()), metadata_variables);

        let stream = Self {
            rows: rows.into_iter(),
        };
        QueryOperationResult::new(BindingsStream::new(stream, CancelHandles::new()), metadata)
    }
}

fn ground_term(term: &GroundTerm) -> Term {
    match term {
        GroundTerm::NamedNode(node) => node.clone().into(),
        GroundTerm::Literal(literal) => literal.clone().into(),
    }
}

impl Stream for ValuesStream {
    type Item = BindingsResult;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.rows.next().map(Ok))
    }
}

impl Debug for ValuesStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValuesStream")
            .field("remaining", &self.rows.len())
            .finish()
    }
}
