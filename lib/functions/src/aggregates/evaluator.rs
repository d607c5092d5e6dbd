use crate::aggregates::count::count_term;
use crate::aggregates::multiset::Multiset;
use crate::aggregates::{AggregateErrorMode, Aggregator};
use crate::expression::ExpressionEvaluator;
use crate::{ExpressionError, ExpressionResult};
use rdf_delta_common::error::QueryEvaluationError;
use rdf_delta_model::{Bindings, Term};
use std::sync::Arc;
use tracing::warn;

/// The change of an aggregate after a batch of solutions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AggregateResult {
    /// The value has not changed since the last call.
    Unchanged,
    /// The value has changed. [None] if the aggregate became unbound.
    Changed(Option<Term>),
    /// The aggregate entered its error state. Reported only once.
    Error,
}

/// Maintains one aggregate of one group.
///
/// Solutions are fed in with [AggregateEvaluator::put_bindings]. Their addition flag decides
/// whether the value of the expression is added to or retracted from the aggregate.
///
/// ```
/// # use rdf_delta_functions::{create_aggregator, AggregateErrorMode, AggregateResult};
/// # use rdf_delta_model::{Bindings, Literal, Term};
/// # use spargebra::algebra::AggregateExpression;
/// let mut count = create_aggregator(
///     &AggregateExpression::CountSolutions { distinct: false },
///     AggregateErrorMode::Lenient,
/// )?;
///
/// count.put_bindings(&Bindings::empty())?;
/// count.put_bindings(&Bindings::empty())?;
/// assert_eq!(count.result(), AggregateResult::Changed(Some(Literal::from(2).into())));
///
/// count.put_bindings(&Bindings::empty().with_addition(false))?;
/// assert_eq!(count.result(), AggregateResult::Changed(Some(Literal::from(1).into())));
/// assert_eq!(count.result(), AggregateResult::Unchanged);
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Debug)]
pub struct AggregateEvaluator {
    input: Input,
    mode: AggregateErrorMode,
    state: State,
    /// The last value returned by [AggregateEvaluator::result].
    last_result: Option<Term>,
}

#[derive(Debug)]
enum Input {
    Expression {
        expression: Arc<dyn ExpressionEvaluator>,
        /// Tracks the multiplicity of each value for `DISTINCT` aggregates.
        distinct: Option<Multiset<Term>>,
        aggregator: Box<dyn Aggregator>,
    },
    /// `COUNT(*)`
    Wildcard {
        solutions: Multiset<Bindings>,
        distinct: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Active,
    Errored { reported: bool },
}

impl AggregateEvaluator {
    pub(crate) fn new(
        expression: Arc<dyn ExpressionEvaluator>,
        aggregator: Box<dyn Aggregator>,
        distinct: bool,
        mode: AggregateErrorMode,
    ) -> Self {
        Self {
            input: Input::Expression {
                expression,
                distinct: distinct.then(Multiset::default),
                aggregator,
            },
            mode,
            state: State::Active,
            last_result: None,
        }
    }

    pub(crate) fn wildcard_count(distinct: bool, mode: AggregateErrorMode) -> Self {
        Self {
            input: Input::Wildcard {
                solutions: Multiset::default(),
                distinct,
            },
            mode,
            state: State::Active,
            last_result: None,
        }
    }

    /// Adds or retracts a solution.
    ///
    /// Expected errors move the aggregate into its error state in lenient mode and fail in strict
    /// mode. Contract violations always fail. Once in the error state, all solutions are ignored.
    pub fn put_bindings(&mut self, bindings: &Bindings) -> Result<(), QueryEvaluationError> {
        if self.is_errored() {
            return Ok(());
        }

        match self.input.put_bindings(bindings) {
            Ok(()) => Ok(()),
            Err(ExpressionError::Expected(_)) => match self.mode {
                AggregateErrorMode::Lenient => {
                    warn!(aggregate = self.name(), %bindings, "Aggregate entered its error state");
                    self.state = State::Errored { reported: false };
                    Ok(())
                }
                AggregateErrorMode::Strict => Err(QueryEvaluationError::Expression(format!(
                    "The {} aggregate could not process {bindings}",
                    self.name()
                ))),
            },
            Err(ExpressionError::Fatal(error)) => Err(error),
        }
    }

    /// Returns how the aggregate has changed since the last call.
    pub fn result(&mut self) -> AggregateResult {
        match self.state {
            State::Errored { reported: true } => return AggregateResult::Unchanged,
            State::Errored { reported: false } => {
                self.state = State::Errored { reported: true };
                self.last_result = None;
                return AggregateResult::Error;
            }
            State::Active => {}
        }

        let Ok(current) = self.input.current() else {
            self.state = State::Errored { reported: true };
            self.last_result = None;
            return AggregateResult::Error;
        };
        if current == self.last_result {
            return AggregateResult::Unchanged;
        }
        self.last_result.clone_from(&current);
        AggregateResult::Changed(current)
    }

    /// The value of the aggregate over zero solutions.
    ///
    /// Fails in strict mode if the aggregate has no such value.
    pub fn empty_value(&self) -> Result<Option<Term>, QueryEvaluationError> {
        let value = self.empty_value_term();
        if value.is_none() && self.mode == AggregateErrorMode::Strict {
            return Err(QueryEvaluationError::EmptyAggregate);
        }
        Ok(value)
    }

    /// The value of the aggregate over zero solutions, if it has one.
    pub fn empty_value_term(&self) -> Option<Term> {
        match &self.input {
            Input::Expression { aggregator, .. } => aggregator.empty_value_term(),
            Input::Wildcard { .. } => Some(count_term(0)),
        }
    }

    /// Returns whether the aggregate is in its error state.
    pub fn is_errored(&self) -> bool {
        matches!(self.state, State::Errored { .. })
    }

    fn name(&self) -> &'static str {
        match &self.input {
            Input::Expression { aggregator, .. } => aggregator.name(),
            Input::Wildcard { .. } => "count",
        }
    }
}

impl Input {
    fn put_bindings(&mut self, bindings: &Bindings) -> ExpressionResult<()> {
        match self {
            Input::Wildcard { solutions, .. } => {
                if bindings.is_addition() {
                    solutions.insert(bindings);
                } else {
                    solutions.remove("count", bindings)?;
                }
                Ok(())
            }
            Input::Expression {
                expression,
                distinct,
                aggregator,
            } => {
                let term = expression.evaluate(bindings)?;
                match (distinct, bindings.is_addition()) {
                    (None, true) => aggregator.put_term(&term),
                    (None, false) => aggregator.remove_term(&term),
                    (Some(distinct), true) => {
                        if distinct.insert(&term) {
                            aggregator.put_term(&term)?;
                        }
                        Ok(())
                    }
                    (Some(distinct), false) => {
                        if distinct.remove(aggregator.name(), &term)? {
                            aggregator.remove_term(&term)?;
                        }
                        Ok(())
                    }
                }
            }
        }
    }

    fn current(&self) -> Result<Option<Term>, ExpressionError> {
        match self {
            Input::Wildcard {
                solutions,
                distinct: true,
            } => Ok(Some(count_term(solutions.distinct_len()))),
            Input::Wildcard {
                solutions,
                distinct: false,
            } => Ok(Some(count_term(solutions.len()))),
            Input::Expression { aggregator, .. } => Ok(aggregator.current()?),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{create_aggregator, AggregateErrorMode, AggregateEvaluator, AggregateResult};
    use rdf_delta_common::error::{ContractViolation, QueryEvaluationError};
    use rdf_delta_model::{Bindings, Literal, Term, Variable};
    use spargebra::algebra::{AggregateExpression, AggregateFunction, Expression};

    fn aggregate(function: AggregateFunction, distinct: bool) -> AggregateEvaluator {
        aggregate_with_mode(function, distinct, AggregateErrorMode::Lenient)
    }

    fn aggregate_with_mode(
        function: AggregateFunction,
        distinct: bool,
        mode: AggregateErrorMode,
    ) -> AggregateEvaluator {
        create_aggregator(
            &AggregateExpression::FunctionCall {
                name: function,
                expr: Expression::Variable(Variable::new_unchecked("x")),
                distinct,
            },
            mode,
        )
        .unwrap()
    }

    fn x(value: impl Into<Literal>, is_addition: bool) -> Bindings {
        Bindings::from_iter([(Variable::new_unchecked("x"), Term::from(value.into()))])
            .with_addition(is_addition)
    }

    fn int(value: i64) -> Term {
        Literal::from(value).into()
    }

    fn run(
        evaluator: &mut AggregateEvaluator,
        input: &[Bindings],
    ) -> Result<AggregateResult, QueryEvaluationError> {
        for bindings in input {
            evaluator.put_bindings(bindings)?;
        }
        Ok(evaluator.result())
    }

    #[test]
    fn count_without_deletions() {
        let mut count = aggregate(AggregateFunction::Count, false);
        let input = [x(1, true), x(2, true), x(3, true), x(4, true)];
        assert_eq!(
            run(&mut count, &input).unwrap(),
            AggregateResult::Changed(Some(int(4)))
        );
    }

    #[test]
    fn distinct_count_ignores_repeated_terms() {
        let mut count = aggregate(AggregateFunction::Count, true);
        for bindings in [x(1, true), x(2, true), x(1, true)] {
            count.put_bindings(&bindings).unwrap();
        }
        assert_eq!(count.input.current().unwrap(), Some(int(2)));
        assert_eq!(count.result(), AggregateResult::Changed(Some(int(2))));

        assert_eq!(
            run(&mut count, &[x(1, true)]).unwrap(),
            AggregateResult::Unchanged
        );
    }

    #[test]
    fn count_with_deletions() {
        let mut count = aggregate(AggregateFunction::Count, false);
        let input = [
            x(1, true),
            x(2, true),
            x(3, true),
            x(3, false),
            x(4, true),
            x(4, false),
        ];
        assert_eq!(
            run(&mut count, &input).unwrap(),
            AggregateResult::Changed(Some(int(2)))
        );
    }

    #[test]
    fn count_deletion_on_empty_aggregator_fails() {
        let mut count = aggregate(AggregateFunction::Count, false);
        let error = run(&mut count, &[x(2, false)]).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Cannot remove term \"2\"^^<http://www.w3.org/2001/XMLSchema#integer> from empty count aggregator"
        );
    }

    #[test]
    fn count_deletion_of_unknown_term_fails() {
        let mut count = aggregate(AggregateFunction::Count, false);
        let error = run(&mut count, &[x(1, true), x(3, true), x(2, false)]).unwrap_err();
        assert!(matches!(
            error,
            QueryEvaluationError::ContractViolation(ContractViolation::RemoveUnknownTerm { .. })
        ));
        assert_eq!(
            error.to_string(),
            "Cannot remove term \"2\"^^<http://www.w3.org/2001/XMLSchema#integer> that was not added to count aggregator"
        );
    }

    #[test]
    fn count_of_everything_deleted_is_the_empty_value() {
        let mut count = aggregate(AggregateFunction::Count, false);
        run(&mut count, &[x(1, true), x(2, true)]).unwrap();
        let result = run(&mut count, &[x(1, false), x(2, false)]).unwrap();
        assert_eq!(result, AggregateResult::Changed(count.empty_value_term()));
        assert_eq!(count.empty_value_term(), Some(int(0)));
    }

    #[test]
    fn distinct_count_tracks_multiplicities() {
        let mut count = aggregate(AggregateFunction::Count, true);
        let mut with_y = x(1, true).set(Variable::new_unchecked("y"), int(1));
        let input = [
            x(1, true),
            x(2, true),
            x(1, true),
            x(1, false),
            with_y.clone(),
        ];
        assert_eq!(
            run(&mut count, &input).unwrap(),
            AggregateResult::Changed(Some(int(2)))
        );

        with_y = with_y.with_addition(false);
        let result = run(&mut count, &[x(1, false), with_y]).unwrap();
        assert_eq!(result, AggregateResult::Changed(Some(int(1))));
    }

    #[test]
    fn wildcard_count() {
        let mut count = create_aggregator(
            &AggregateExpression::CountSolutions { distinct: true },
            AggregateErrorMode::Lenient,
        )
        .unwrap();
        let result = run(&mut count, &[x(1, true), x(1, true), x(2, true)]).unwrap();
        assert_eq!(result, AggregateResult::Changed(Some(int(2))));

        let result = run(&mut count, &[x(1, false)]).unwrap();
        assert_eq!(result, AggregateResult::Unchanged);
    }

    #[test]
    fn results_are_only_reported_on_change() {
        let mut max = aggregate(AggregateFunction::Max, false);
        assert_eq!(max.result(), AggregateResult::Unchanged);

        assert_eq!(
            run(&mut max, &[x(3, true)]).unwrap(),
            AggregateResult::Changed(Some(int(3)))
        );
        assert_eq!(
            run(&mut max, &[x(1, true)]).unwrap(),
            AggregateResult::Unchanged
        );
        assert_eq!(
            run(&mut max, &[x(3, false)]).unwrap(),
            AggregateResult::Changed(Some(int(1)))
        );
        assert_eq!(
            run(&mut max, &[x(1, false)]).unwrap(),
            AggregateResult::Changed(None)
        );
    }

    #[test]
    fn lenient_errors_are_reported_once() {
        let mut sum = aggregate(AggregateFunction::Sum, false);
        let result = run(&mut sum, &[x(1, true), x("a", true)]).unwrap();
        assert_eq!(result, AggregateResult::Error);
        assert!(sum.is_errored());

        assert_eq!(
            run(&mut sum, &[x(2, true)]).unwrap(),
            AggregateResult::Unchanged
        );
    }

    #[test]
    fn strict_errors_fail() {
        let mut sum =
            aggregate_with_mode(AggregateFunction::Sum, false, AggregateErrorMode::Strict);
        assert!(matches!(
            run(&mut sum, &[x("a", true)]),
            Err(QueryEvaluationError::Expression(_))
        ));
    }

    #[test]
    fn unbound_values_are_errors() {
        let mut avg = aggregate(AggregateFunction::Avg, false);
        avg.put_bindings(&Bindings::empty()).unwrap();
        assert_eq!(avg.result(), AggregateResult::Error);
    }

    #[test]
    fn empty_value_in_strict_mode() {
        let min = aggregate_with_mode(AggregateFunction::Min, false, AggregateErrorMode::Strict);
        assert!(matches!(
            min.empty_value(),
            Err(QueryEvaluationError::EmptyAggregate)
        ));

        let min = aggregate(AggregateFunction::Min, false);
        assert_eq!(min.empty_value().unwrap(), None);

        let sum = aggregate_with_mode(AggregateFunction::Sum, false, AggregateErrorMode::Strict);
        assert_eq!(sum.empty_value().unwrap(), Some(int(0)));
    }

    #[test]
    fn custom_aggregates_are_not_implemented() {
        let result = create_aggregator(
            &AggregateExpression::FunctionCall {
                name: AggregateFunction::Custom(rdf_delta_model::NamedNode::new_unchecked(
                    "http://example.com/agg",
                )),
                expr: Expression::Variable(Variable::new_unchecked("x")),
                distinct: false,
            },
            AggregateErrorMode::Lenient,
        );
        assert!(matches!(result, Err(QueryEvaluationError::NotImplemented(_))));
    }
}
