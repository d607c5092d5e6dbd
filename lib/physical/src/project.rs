use crate::metadata::derived;
use futures::{Stream, StreamExt};
use rdf_delta_common::{BindingsResult, BindingsStream, MetadataVariable, QueryOperationResult};
use rdf_delta_model::Variable;
use std::fmt::{Debug, Formatter};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Restricts every solution to a list of variables.
///
/// Projection keeps duplicates, so the deletion of a solution retracts exactly one copy of its
/// projection.
pub struct ProjectStream {
    input: BindingsStream,
    variables: Vec<Variable>,
}

impl ProjectStream {
    /// Projects `input` to `variables`. Variables that the input does not bind are unbound in
    /// every output solution.
    pub fn create(input: QueryOperationResult, variables: Vec<Variable>) -> QueryOperationResult {
        let input_metadata = input.metadata.current();
        let output_variables = variables
            .iter()
            .map(|variable| match input_metadata.variable(variable) {
                Some(metadata) => metadata.clone(),
                None => MetadataVariable::maybe_undef(variable.clone()),
            })
            .collect();
        let metadata = derived(input_metadata.cardinality, output_variables);
        let cancel_handles = input.stream.cancel_handles().clone();

        let stream = Self {
            input: input.stream,
            variables,
        };
        QueryOperationResult::new(BindingsStream::new(stream, cancel_handles), metadata)
    }
}

impl Stream for ProjectStream {
    type Item = BindingsResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        this.input
            .poll_next_unpin(cx)
            .map_ok(|bindings| bindings.project(&this.variables))
    }
}

impl Debug for ProjectStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectStream")
            .field("variables", &self.variables)
            .finish_non_exhaustive()
    }
}
