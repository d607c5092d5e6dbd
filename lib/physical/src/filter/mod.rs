mod exists;

use crate::metadata::{at_most, derived};
use futures::{ready, Stream, StreamExt};
use rdf_delta_common::{BindingsResult, BindingsStream, QueryOperationResult};
use rdf_delta_functions::{ExpressionError, ExpressionEvaluator};
use std::fmt::{Debug, Formatter};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::warn;

pub use exists::ExistsFilterStream;

/// Passes on the solutions for which an expression evaluates to `true`.
///
/// The expression is evaluated again for a deletion. As the evaluation is deterministic, a
/// deletion passes exactly if the retracted addition has passed.
///
/// Expected expression errors exclude the solution. Fatal errors end the stream.
pub struct FilterStream {
    input: BindingsStream,
    expression: Arc<dyn ExpressionEvaluator>,
    finished: bool,
}

impl FilterStream {
    /// Filters `input` with `expression`.
    pub fn create(
        input: QueryOperationResult,
        expression: Arc<dyn ExpressionEvaluator>,
    ) -> QueryOperationResult {
        let input_metadata = input.metadata.current();
        let metadata = derived(
            at_most(input_metadata.cardinality),
            input_metadata.variables,
        );
        let cancel_handles = input.stream.cancel_handles().clone();

        let stream = Self {
            input: input.stream,
            expression,
            finished: false,
        };
        QueryOperationResult::new(BindingsStream::new(stream, cancel_handles), metadata)
    }
}

impl Stream for FilterStream {
    type Item = BindingsResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if this.finished {
                return Poll::Ready(None);
            }

            let bindings = match ready!(this.input.poll_next_unpin(cx)) {
                None => {
                    this.finished = true;
                    return Poll::Ready(None);
                }
                Some(Err(error)) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(error)));
                }
                Some(Ok(bindings)) => bindings,
            };

            match this.expression.evaluate_ebv(&bindings) {
                Ok(true) => return Poll::Ready(Some(Ok(bindings))),
                Ok(false) => {}
                Err(ExpressionError::Expected(_)) => {
                    warn!(%bindings, expression = ?this.expression, "Filter expression failed");
                }
                Err(ExpressionError::Fatal(error)) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(error)));
                }
            }
        }
    }
}

impl Debug for FilterStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterStream")
            .field("expression", &self.expression)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{add, del, render, static_input, var};
    use futures::executor::block_on;
    use futures::TryStreamExt;
    use rdf_delta_functions::SparqlExpressionEvaluator;
    use rdf_delta_model::{Bindings, Literal};
    use spargebra::algebra::{Expression, GraphPattern};

    fn filter(expression: &Expression, items: Vec<Bindings>) -> QueryOperationResult {
        let evaluator = SparqlExpressionEvaluator::try_new(expression).unwrap();
        FilterStream::create(static_input(&["a"], items), Arc::new(evaluator))
    }

    #[test]
    fn passes_additions_and_deletions_alike() {
        let expression = Expression::Equal(
            Box::new(Expression::Variable(var("a"))),
            Box::new(Expression::Literal(Literal::new_simple_literal("1"))),
        );
        let result = filter(
            &expression,
            vec![add(&[("a", "1")]), add(&[("a", "2")]), del(&[("a", "1")]), del(&[("a", "2")])],
        );

        let result = block_on(result.stream.try_collect::<Vec<_>>()).unwrap();
        insta::assert_snapshot!(render(&result), @r#"
        + ?a="1"
        - ?a="1"
        "#);
    }

    #[test]
    fn expression_errors_exclude_solutions() {
        // ?b is never bound.
        let expression = Expression::Bound(var("b"));
        let expression = Expression::Or(
            Box::new(Expression::Variable(var("b"))),
            Box::new(Expression::Not(Box::new(expression))),
        );
        let result = filter(&expression, vec![add(&[("a", "1")])]);
        assert_eq!(block_on(result.stream.try_collect::<Vec<_>>()).unwrap().len(), 1);

        let expression = Expression::Variable(var("b"));
        let result = filter(&expression, vec![add(&[("a", "1")])]);
        assert!(block_on(result.stream.try_collect::<Vec<_>>()).unwrap().is_empty());
    }

    #[test]
    fn fatal_errors_end_the_stream() {
        let expression = Expression::Or(
            Box::new(Expression::Variable(var("b"))),
            Box::new(Expression::Exists(Box::new(GraphPattern::Bgp {
                patterns: Vec::new(),
            }))),
        );
        let result = filter(&expression, vec![add(&[("a", "1")]), add(&[("a", "2")])]);

        let error = block_on(result.stream.try_collect::<Vec<_>>()).unwrap_err();
        insta::assert_snapshot!(
            error,
            @"An internal error that likely indicates towards a bug in RDF Delta: EXISTS must be evaluated by a filter operator"
        );
    }
}
