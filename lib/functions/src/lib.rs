mod aggregates;
mod error;
mod expression;
mod name;
mod scalar;

pub use aggregates::{
    AggregateErrorMode, AggregateEvaluator, AggregateResult, Aggregator, AggregatorFactory,
    create_aggregator,
};
pub use error::{ExpressionError, ExpressionResult};
pub use expression::{ExpressionEvaluator, SparqlExpressionEvaluator};
pub use name::{BuiltinName, FunctionName};
