#![doc(test(attr(deny(warnings))))]

//! The SPARQL engine of RDF Delta.
//!
//! A query is translated into a tree of incremental operators once. Its results are a stream of
//! changes that keeps the answer up to date while the underlying
//! [QuadSource](rdf_delta_common::QuadSource) changes.

mod results;
pub mod sparql;

pub use results::{BooleanChangeStream, QueryResults, QuerySolutionStream};
pub use sparql::{evaluate_query, Query, QueryOptions};
