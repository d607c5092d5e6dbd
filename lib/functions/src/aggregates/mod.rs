mod avg;
mod count;
mod evaluator;
mod group_concat;
mod max;
mod min;
mod multiset;
mod ordered;
mod sample;
mod sum;

use crate::expression::{ExpressionEvaluator, SparqlExpressionEvaluator};
use crate::ExpressionResult;
use avg::AvgAggregator;
use count::CountAggregator;
use group_concat::GroupConcatAggregator;
use max::MaxAggregator;
use min::MinAggregator;
use rdf_delta_common::error::QueryEvaluationError;
use rdf_delta_model::{Term, ThinResult};
use sample::SampleAggregator;
use spargebra::algebra::{AggregateExpression, AggregateFunction};
use std::fmt::Debug;
use std::sync::Arc;
use sum::SumAggregator;

pub use evaluator::{AggregateEvaluator, AggregateResult};

/// An incrementally maintained aggregate over the values of a single group.
///
/// Values are added with [Aggregator::put_term] and retracted with [Aggregator::remove_term].
/// Retracting a value that was never added violates the contract with the upstream operator.
pub trait Aggregator: Debug + Send + Sync {
    /// The name that is used in error messages.
    fn name(&self) -> &'static str;

    /// Adds a value. Values of the wrong type are expected errors.
    fn put_term(&mut self, term: &Term) -> ExpressionResult<()>;

    /// Retracts a previously added value.
    fn remove_term(&mut self, term: &Term) -> ExpressionResult<()>;

    /// Returns the aggregate over the current values. [None] if the aggregate is unbound.
    fn current(&self) -> ThinResult<Option<Term>>;

    /// The value of the aggregate over zero values, if it has one.
    fn empty_value_term(&self) -> Option<Term> {
        None
    }
}

/// Controls what happens if the expression of an aggregate fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AggregateErrorMode {
    /// The aggregate becomes unbound for the affected group.
    #[default]
    Lenient,
    /// The query fails.
    Strict,
}

/// Creates [AggregateEvaluator]s for a SPARQL [AggregateExpression]. Each group of a query uses
/// its own evaluator.
#[derive(Clone, Debug)]
pub struct AggregatorFactory {
    function: AggregateKind,
    input: Option<Arc<dyn ExpressionEvaluator>>,
    distinct: bool,
    mode: AggregateErrorMode,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum AggregateKind {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    Sample,
    GroupConcat(Option<String>),
}

impl AggregatorFactory {
    /// Compiles `expression`. Custom aggregate functions are not supported.
    pub fn try_new(
        expression: &AggregateExpression,
        mode: AggregateErrorMode,
    ) -> Result<Self, QueryEvaluationError> {
        match expression {
            AggregateExpression::CountSolutions { distinct } => Ok(Self {
                function: AggregateKind::Count,
                input: None,
                distinct: *distinct,
                mode,
            }),
            AggregateExpression::FunctionCall {
                name,
                expr,
                distinct,
            } => {
                let function = match name {
                    AggregateFunction::Count => AggregateKind::Count,
                    AggregateFunction::Sum => AggregateKind::Sum,
                    AggregateFunction::Avg => AggregateKind::Avg,
                    AggregateFunction::Min => AggregateKind::Min,
                    AggregateFunction::Max => AggregateKind::Max,
                    AggregateFunction::Sample => AggregateKind::Sample,
                    AggregateFunction::GroupConcat { separator } => {
                        AggregateKind::GroupConcat(separator.clone())
                    }
                    AggregateFunction::Custom(name) => {
                        return QueryEvaluationError::not_implemented(format!(
                            "Custom aggregate function {name}"
                        ))
                    }
                };
                Ok(Self {
                    function,
                    input: Some(Arc::new(SparqlExpressionEvaluator::try_new(expr)?)),
                    distinct: *distinct,
                    mode,
                })
            }
        }
    }

    /// Creates an evaluator for a new group.
    pub fn create(&self) -> AggregateEvaluator {
        let Some(input) = &self.input else {
            return AggregateEvaluator::wildcard_count(self.distinct, self.mode);
        };

        let aggregator: Box<dyn Aggregator> = match &self.function {
            AggregateKind::Count => Box::<CountAggregator>::default(),
            AggregateKind::Sum => Box::<SumAggregator>::default(),
            AggregateKind::Avg => Box::<AvgAggregator>::default(),
            AggregateKind::Min => Box::<MinAggregator>::default(),
            AggregateKind::Max => Box::<MaxAggregator>::default(),
            AggregateKind::Sample => Box::<SampleAggregator>::default(),
            AggregateKind::GroupConcat(separator) => {
                Box::new(GroupConcatAggregator::new(separator.as_deref()))
            }
        };
        AggregateEvaluator::new(Arc::clone(input), aggregator, self.distinct, self.mode)
    }

    /// The error mode of the created evaluators.
    pub fn mode(&self) -> AggregateErrorMode {
        self.mode
    }
}

/// Creates a single [AggregateEvaluator] for `expression`.
pub fn create_aggregator(
    expression: &AggregateExpression,
    mode: AggregateErrorMode,
) -> Result<AggregateEvaluator, QueryEvaluationError> {
    Ok(AggregatorFactory::try_new(expression, mode)?.create())
}
