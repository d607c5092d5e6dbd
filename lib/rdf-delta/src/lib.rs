//! RDF Delta evaluates SPARQL queries incrementally over a live RDF store.
//!
//! A query registered on a [Store](store::Store) first reports the solutions over the current
//! content of the store. Afterward, every insertion or removal is propagated through the query
//! and reported as additions and deletions of solutions.
//!
//! ```
//! use futures::StreamExt;
//! use rdf_delta::model::*;
//! use rdf_delta::sparql::QueryResults;
//! use rdf_delta::store::Store;
//!
//! # tokio_test::block_on(async {
//! let store = Store::new();
//! let ex = NamedNode::new("http://example.com")?;
//! let quad = Quad::new(ex.clone(), ex.clone(), ex.clone(), GraphName::DefaultGraph);
//!
//! if let QueryResults::Solutions(mut solutions) = store.query("SELECT ?s WHERE { ?s ?p ?o }")? {
//!     store.insert(quad.clone())?;
//!     let solution = solutions.next().await.unwrap()?;
//!     assert!(solution.is_addition());
//!     assert_eq!(solution.get("s"), Some(&ex.clone().into()));
//!
//!     store.remove(quad)?;
//!     let solution = solutions.next().await.unwrap()?;
//!     assert!(!solution.is_addition());
//! }
//! # Result::<_, Box<dyn std::error::Error>>::Ok(())
//! # }).unwrap();
//! ```
#![doc(test(attr(deny(warnings))))]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod error;
pub mod store;

pub mod io {
    pub use oxrdfio::{RdfFormat, RdfParser};
}

pub mod model {
    pub use rdf_delta_model::*;
}

pub mod sparql {
    pub use rdf_delta_engine::sparql::*;
    pub use rdf_delta_engine::{BooleanChangeStream, QueryResults, QuerySolutionStream};
}

pub mod storage {
    pub use rdf_delta_storage::*;
}
