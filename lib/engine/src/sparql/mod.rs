//! [SPARQL](https://www.w3.org/TR/sparql11-overview/) implementation.

mod algebra;
mod eval;
mod rewriting;

pub use algebra::Query;
pub use eval::evaluate_query;
pub use rdf_delta_common::error::QueryEvaluationError;
pub use rdf_delta_common::BlankNodeMatchingMode;
pub use rdf_delta_functions::AggregateErrorMode;
pub use rdf_delta_model::{SparqlSyntaxError, Variable};
pub use rewriting::GraphPatternRewriter;

/// Options for SPARQL query evaluation.
///
/// ```
/// # use rdf_delta_engine::QueryOptions;
/// # use rdf_delta_functions::AggregateErrorMode;
/// let options = QueryOptions::default()
///     .with_aggregate_error_mode(AggregateErrorMode::Strict)
///     .with_default_graph_as_union(true);
/// assert!(options.default_graph_as_union);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct QueryOptions {
    /// How blank nodes in the query are matched against the data.
    pub blank_node_mode: BlankNodeMatchingMode,
    /// What happens if the expression of an aggregate fails.
    pub aggregate_error_mode: AggregateErrorMode,
    /// Whether patterns outside a `GRAPH` block match the quads of every graph instead of only
    /// the default graph.
    pub default_graph_as_union: bool,
}

impl QueryOptions {
    #[must_use]
    pub fn with_blank_node_mode(mut self, mode: BlankNodeMatchingMode) -> Self {
        self.blank_node_mode = mode;
        self
    }

    #[must_use]
    pub fn with_aggregate_error_mode(mut self, mode: AggregateErrorMode) -> Self {
        self.aggregate_error_mode = mode;
        self
    }

    #[must_use]
    pub fn with_default_graph_as_union(mut self, value: bool) -> Self {
        self.default_graph_as_union = value;
        self
    }
}
