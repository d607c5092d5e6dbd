use crate::metadata::{derived, join_variables};
use futures::{ready, Stream, StreamExt};
use rdf_delta_common::{BindingsResult, BindingsStream, MetadataVariable, QueryOperationResult};
use rdf_delta_functions::{ExpressionError, ExpressionEvaluator};
use rdf_delta_model::Variable;
use std::fmt::{Debug, Formatter};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::trace;

/// Binds the value of an expression to a new variable (`BIND`).
///
/// If the expression fails with an expected error, the variable stays unbound. As with the filter,
/// the deletion of a solution evaluates to the same value as its addition.
pub struct ExtendStream {
    input: BindingsStream,
    variable: Variable,
    expression: Arc<dyn ExpressionEvaluator>,
    finished: bool,
}

impl ExtendStream {
    /// Extends every solution of `input` with `variable`.
    pub fn create(
        input: QueryOperationResult,
        variable: Variable,
        expression: Arc<dyn ExpressionEvaluator>,
    ) -> QueryOperationResult {
        let input_metadata = input.metadata.current();
        let variables = join_variables(
            &input_metadata.variables,
            &[MetadataVariable::maybe_undef(variable.clone())],
        );
        let metadata = derived(input_metadata.cardinality, variables);
        let cancel_handles = input.stream.cancel_handles().clone();

        let stream = Self {
            input: input.stream,
            variable,
            expression,
            finished: false,
        };
        QueryOperationResult::new(BindingsStream::new(stream, cancel_handles), metadata)
    }
}

impl Stream for ExtendStream {
    type Item = BindingsResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
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

        match this.expression.evaluate(&bindings) {
            Ok(term) => Poll::Ready(Some(Ok(bindings.set(this.variable.clone(), term)))),
            Err(ExpressionError::Expected(_)) => {
                trace!(%bindings, variable = %this.variable, "Leaving variable unbound");
                Poll::Ready(Some(Ok(bindings)))
            }
            Err(ExpressionError::Fatal(error)) => {
                this.finished = true;
                Poll::Ready(Some(Err(error)))
            }
        }
    }
}

impl Debug for ExtendStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtendStream")
            .field("variable", &self.variable)
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
    use spargebra::algebra::{Expression, Function};

    fn extend(input: QueryOperationResult, expression: &Expression) -> QueryOperationResult {
        let expression = SparqlExpressionEvaluator::try_new(expression).unwrap();
        ExtendStream::create(input, var("l"), Arc::new(expression))
    }

    #[test]
    fn binds_expression_values() {
        let input = static_input(&["a"], vec![add(&[("a", "ab")]), del(&[("a", "ab")])]);
        let expression = Expression::FunctionCall(
            Function::StrLen,
            vec![Expression::Variable(var("a"))],
        );

        let result = extend(input, &expression);
        assert!(result.metadata.current().can_be_undef(&var("l")));
        let result = block_on(result.stream.try_collect::<Vec<_>>()).unwrap();
        insta::assert_snapshot!(render(&result), @r#"
        + ?a="ab" ?l="2"^^<http://www.w3.org/2001/XMLSchema#integer>
        - ?a="ab" ?l="2"^^<http://www.w3.org/2001/XMLSchema#integer>
        "#);
    }

    #[test]
    fn expression_errors_leave_the_variable_unbound() {
        let input = static_input(&["a"], vec![add(&[("a", "ab")])]);
        let expression = Expression::FunctionCall(
            Function::StrLen,
            vec![Expression::Variable(var("missing"))],
        );

        let result = block_on(extend(input, &expression).stream.try_collect::<Vec<_>>()).unwrap();
        insta::assert_snapshot!(render(&result), @r#"+ ?a="ab""#);
    }
}
