mod boolean;
mod query_solution;

pub use boolean::BooleanChangeStream;
pub use query_solution::QuerySolutionStream;

/// Results of a [SPARQL query](https://www.w3.org/TR/sparql11-query/).
///
/// Both variants are live: they keep emitting changes until the underlying source ends.
#[derive(Debug)]
pub enum QueryResults {
    /// Changes to the solutions of a [SELECT](https://www.w3.org/TR/sparql11-query/#select)
    /// query.
    Solutions(QuerySolutionStream),
    /// Changes to the answer of an [ASK](https://www.w3.org/TR/sparql11-query/#ask) query.
    Boolean(BooleanChangeStream),
}
