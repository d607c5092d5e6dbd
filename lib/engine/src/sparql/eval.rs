use crate::results::{BooleanChangeStream, QueryResults, QuerySolutionStream};
use crate::sparql::rewriting::GraphPatternRewriter;
use crate::sparql::{Query, QueryOptions};
use rdf_delta_common::error::QueryEvaluationError;
use rdf_delta_common::QuadSource;
use spargebra::algebra::QueryDataset;
use tracing::debug;

/// Sets up the incremental evaluation of `query` against `source`.
///
/// The returned results first reflect the current content of the source and then follow its
/// changes. `SELECT` and `ASK` queries are supported.
pub fn evaluate_query(
    source: &dyn QuadSource,
    query: &Query,
    options: QueryOptions,
) -> Result<QueryResults, QueryEvaluationError> {
    debug!(%query, ?options, "Evaluating query");
    match &query.inner {
        spargebra::Query::Select {
            dataset, pattern, ..
        } => {
            ensure_default_dataset(dataset.as_ref())?;
            let result = GraphPatternRewriter::new(source, options).rewrite(pattern)?;
            let variables = result.metadata.current().variable_names();
            Ok(QueryResults::Solutions(QuerySolutionStream::new(
                variables.into(),
                result,
            )))
        }
        spargebra::Query::Ask {
            dataset, pattern, ..
        } => {
            ensure_default_dataset(dataset.as_ref())?;
            let result = GraphPatternRewriter::new(source, options).rewrite(pattern)?;
            Ok(QueryResults::Boolean(BooleanChangeStream::new(
                result.stream,
            )))
        }
        spargebra::Query::Construct { .. } => {
            QueryEvaluationError::not_implemented("CONSTRUCT queries")
        }
        spargebra::Query::Describe { .. } => {
            QueryEvaluationError::not_implemented("DESCRIBE queries")
        }
    }
}

fn ensure_default_dataset(dataset: Option<&QueryDataset>) -> Result<(), QueryEvaluationError> {
    match dataset {
        None => Ok(()),
        Some(_) => QueryEvaluationError::not_implemented("FROM and FROM NAMED"),
    }
}
