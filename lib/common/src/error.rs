use rdf_delta_model::SparqlSyntaxError;
use std::convert::Infallible;
use std::error::Error;
use std::io;

/// An error related to storage operations (imports, removals, ...).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StorageError {
    /// Quads were imported after the store has been ended.
    #[error("Attempted to import into an ended StreamingStore")]
    ImportAfterEnd,
    /// Quads were removed after the store has been ended.
    #[error("Attempted to remove from an ended StreamingStore")]
    RemoveAfterEnd,
    /// Error from the OS I/O layer.
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("{0}")]
    Other(#[source] Box<dyn Error + Send + Sync + 'static>),
}

impl From<StorageError> for io::Error {
    #[inline]
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::Io(error) => error,
            StorageError::Other(error) => Self::other(error),
            other => Self::other(other.to_string()),
        }
    }
}

/// A violated contract between two operators.
///
/// Operators rely on their inputs to only retract what they have added before. If this does not
/// hold, the multiplicities tracked downstream are corrupted. Therefore, these errors are never
/// recovered from.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ContractViolation {
    /// A deletion arrived for a solution that is not live.
    #[error("{operator} received a deletion for a solution that was never added: {bindings}")]
    UnmatchedDeletion {
        operator: &'static str,
        bindings: String,
    },
    /// A multiplicity counter would become negative.
    #[error("The multiplicity of {key} in {operator} would drop below zero")]
    MultiplicityUnderflow { operator: &'static str, key: String },
    /// A term was removed from an aggregator without any input.
    #[error("Cannot remove term {term} from empty {aggregate} aggregator")]
    RemoveFromEmptyAggregate {
        aggregate: &'static str,
        term: String,
    },
    /// A term was removed from an aggregator that never saw it.
    #[error("Cannot remove term {term} that was not added to {aggregate} aggregator")]
    RemoveUnknownTerm {
        aggregate: &'static str,
        term: String,
    },
}

/// An error during the (incremental) evaluation of a query.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum QueryEvaluationError {
    /// An error in SPARQL parsing.
    #[error(transparent)]
    Parsing(#[from] SparqlSyntaxError),
    /// An error from the storage.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// An upstream operator emitted an invalid change.
    #[error(transparent)]
    ContractViolation(#[from] ContractViolation),
    /// An expression failed in a way that is not part of the regular SPARQL semantics.
    #[error("The evaluation of an expression failed: {0}")]
    Expression(String),
    /// An aggregate without an identity value was requested over zero inputs.
    #[error("Empty aggregate expression")]
    EmptyAggregate,
    /// An error in the management of dynamic query sources.
    #[error("{0}")]
    Source(String),
    #[error("A feature has not yet been implemented: {0}")]
    NotImplemented(String),
    #[error("An internal error that likely indicates towards a bug in RDF Delta: {0}")]
    InternalError(String),
}

impl QueryEvaluationError {
    pub fn internal<T>(cause: String) -> Result<T, Self> {
        Err(QueryEvaluationError::InternalError(cause))
    }

    pub fn not_implemented<T>(feature: impl Into<String>) -> Result<T, Self> {
        Err(QueryEvaluationError::NotImplemented(feature.into()))
    }
}

impl From<Infallible> for QueryEvaluationError {
    #[inline]
    fn from(error: Infallible) -> Self {
        match error {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_messages() {
        let error = ContractViolation::RemoveFromEmptyAggregate {
            aggregate: "count",
            term: "\"1\"^^<http://www.w3.org/2001/XMLSchema#integer>".to_owned(),
        };
        assert_eq!(
            error.to_string(),
            "Cannot remove term \"1\"^^<http://www.w3.org/2001/XMLSchema#integer> from empty count aggregator"
        );
    }

    #[test]
    fn ended_store_message() {
        assert_eq!(
            StorageError::ImportAfterEnd.to_string(),
            "Attempted to import into an ended StreamingStore"
        );
    }
}
