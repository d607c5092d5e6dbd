use rdf_delta_common::error::{ContractViolation, QueryEvaluationError};
use rdf_delta_model::ThinError;

/// The result of evaluating an expression.
pub type ExpressionResult<T> = Result<T, ExpressionError>;

/// An error while evaluating an expression.
///
/// SPARQL distinguishes between errors that are part of the query semantics (e.g., an unbound
/// variable or a type error) and errors that must abort the evaluation. Only the former are
/// swallowed by filters and aggregates.
#[derive(Debug, thiserror::Error)]
pub enum ExpressionError {
    /// An error that is part of the regular SPARQL semantics.
    #[error(transparent)]
    Expected(#[from] ThinError),
    /// An error that aborts the query.
    #[error(transparent)]
    Fatal(#[from] QueryEvaluationError),
}

impl ExpressionError {
    /// Returns whether this error must abort the query.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExpressionError::Fatal(_))
    }
}

impl From<ContractViolation> for ExpressionError {
    fn from(value: ContractViolation) -> Self {
        ExpressionError::Fatal(value.into())
    }
}
