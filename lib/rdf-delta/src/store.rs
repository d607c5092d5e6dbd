//! API to access a live, in-memory [RDF dataset](https://www.w3.org/TR/rdf11-concepts/#dfn-rdf-dataset).
//!
//! The entry point of the module is the [`Store`] struct.

use crate::error::{LoaderError, QueryEvaluationError, StorageError};
use oxrdfio::RdfParser;
use rdf_delta_engine::{evaluate_query, Query, QueryOptions, QueryResults};
use rdf_delta_model::{DeltaQuad, Quad};
use rdf_delta_storage::{StreamingStore, StreamingStoreOptions};
use std::fmt::Debug;
use std::io::Read;
use tracing::debug;

/// An [RDF dataset](https://www.w3.org/TR/rdf11-concepts/#dfn-rdf-dataset) store whose queries
/// stay up to date.
///
/// Each [query](Self::query) first reports the solutions over the current content and then the
/// changes caused by later insertions and removals. Quads are stored with their multiplicity, so
/// inserting a quad twice requires two removals.
///
/// By default, the store ends once the last open query is dropped. Afterward, the store can still
/// be queried but no longer modified. Use [Self::new_with_options] to keep it open.
///
/// ```
/// use futures::StreamExt;
/// use rdf_delta::model::*;
/// use rdf_delta::sparql::QueryResults;
/// use rdf_delta::store::Store;
///
/// # tokio_test::block_on(async {
/// let store = Store::new();
/// let ex = NamedNode::new("http://example.com")?;
/// store.insert(Quad::new(ex.clone(), ex.clone(), ex.clone(), GraphName::DefaultGraph))?;
///
/// if let QueryResults::Boolean(mut answers) = store.query("ASK { ?s ?p ?o }")? {
///     assert_eq!(answers.next().await.transpose()?, Some(true));
/// }
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// # }).unwrap();
/// ```
#[derive(Clone, Debug, Default)]
pub struct Store {
    inner: StreamingStore,
}

impl Store {
    /// Creates an empty store with the default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with the given `options`.
    pub fn new_with_options(options: StreamingStoreOptions) -> Self {
        Self {
            inner: StreamingStore::new_with_options(options),
        }
    }

    /// Returns the underlying [StreamingStore].
    pub fn streaming_store(&self) -> &StreamingStore {
        &self.inner
    }

    /// Registers a [SPARQL](https://www.w3.org/TR/sparql11-query/) query.
    ///
    /// ```
    /// use futures::StreamExt;
    /// use rdf_delta::model::*;
    /// use rdf_delta::sparql::QueryResults;
    /// use rdf_delta::store::Store;
    ///
    /// # tokio_test::block_on(async {
    /// let store = Store::new();
    /// let ex = NamedNodeRef::new("http://example.com")?;
    /// store.insert(QuadRef::new(ex, ex, ex, GraphNameRef::DefaultGraph))?;
    ///
    /// if let QueryResults::Solutions(mut solutions) = store.query("SELECT ?s WHERE { ?s ?p ?o }")? {
    ///     assert_eq!(
    ///         solutions.next().await.unwrap()?.get("s"),
    ///         Some(&ex.into_owned().into())
    ///     );
    /// }
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// # }).unwrap();
    /// ```
    pub fn query(
        &self,
        query: impl TryInto<Query, Error = impl Into<QueryEvaluationError> + Debug>,
    ) -> Result<QueryResults, QueryEvaluationError> {
        self.query_opt(query, QueryOptions::default())
    }

    /// Registers a [SPARQL](https://www.w3.org/TR/sparql11-query/) query with some options.
    ///
    /// ```
    /// use futures::StreamExt;
    /// use rdf_delta::model::*;
    /// use rdf_delta::sparql::{QueryOptions, QueryResults};
    /// use rdf_delta::store::Store;
    ///
    /// # tokio_test::block_on(async {
    /// let store = Store::new();
    /// let ex = NamedNodeRef::new("http://example.com")?;
    /// store.insert(QuadRef::new(ex, ex, ex, ex))?;
    ///
    /// let options = QueryOptions::default().with_default_graph_as_union(true);
    /// if let QueryResults::Solutions(mut solutions) =
    ///     store.query_opt("SELECT ?s WHERE { ?s ?p ?o }", options)?
    /// {
    ///     assert!(solutions.next().await.is_some());
    /// }
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// # }).unwrap();
    /// ```
    pub fn query_opt(
        &self,
        query: impl TryInto<Query, Error = impl Into<QueryEvaluationError> + Debug>,
        options: QueryOptions,
    ) -> Result<QueryResults, QueryEvaluationError> {
        let query = query.try_into().map_err(Into::into)?;
        evaluate_query(&self.inner, &query, options)
    }

    /// Adds a quad to this store.
    ///
    /// ```
    /// use rdf_delta::model::*;
    /// use rdf_delta::store::Store;
    ///
    /// let ex = NamedNodeRef::new("http://example.com")?;
    /// let quad = QuadRef::new(ex, ex, ex, GraphNameRef::DefaultGraph);
    ///
    /// let store = Store::new();
    /// store.insert(quad)?;
    /// store.insert(quad)?;
    ///
    /// assert!(store.contains(quad));
    /// assert_eq!(store.len(), 2);
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn insert(&self, quad: impl Into<Quad>) -> Result<(), StorageError> {
        self.inner.add_quad(quad.into())
    }

    /// Adds a set of quads to this store. Open queries observe them in iteration order.
    pub fn insert_all(
        &self,
        quads: impl IntoIterator<Item = impl Into<Quad>>,
    ) -> Result<(), StorageError> {
        self.inner
            .import(quads.into_iter().map(|quad| DeltaQuad::addition(quad.into())))
    }

    /// Removes a single copy of a quad from this store.
    ///
    /// Removing a quad that is not stored has no effect.
    ///
    /// ```
    /// use rdf_delta::model::*;
    /// use rdf_delta::store::Store;
    ///
    /// let ex = NamedNodeRef::new("http://example.com")?;
    /// let quad = QuadRef::new(ex, ex, ex, GraphNameRef::DefaultGraph);
    ///
    /// let store = Store::new();
    /// store.insert(quad)?;
    /// store.remove(quad)?;
    /// store.remove(quad)?;
    ///
    /// assert!(!store.contains(quad));
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn remove(&self, quad: impl Into<Quad>) -> Result<(), StorageError> {
        self.inner.remove_quad(quad.into())
    }

    /// Removes a single copy of each of the given quads.
    pub fn remove_all(
        &self,
        quads: impl IntoIterator<Item = impl Into<Quad>>,
    ) -> Result<(), StorageError> {
        self.inner
            .remove(quads.into_iter().map(|quad| DeltaQuad::deletion(quad.into())))
    }

    /// Loads an RDF file into the store.
    ///
    /// The file is parsed completely before any quad is inserted. Hence, a syntax error leaves
    /// the store unchanged.
    ///
    /// ```
    /// use rdf_delta::io::{RdfFormat, RdfParser};
    /// use rdf_delta::model::*;
    /// use rdf_delta::store::Store;
    ///
    /// let store = Store::new();
    ///
    /// let file = b"<http://example.com> <http://example.com> <http://example.com> <http://example.com/g> .";
    /// store.load_from_reader(RdfFormat::NQuads, file.as_ref())?;
    ///
    /// let file = b"<> <> <> .";
    /// store.load_from_reader(
    ///     RdfParser::from_format(RdfFormat::Turtle)
    ///         .with_base_iri("http://example.com")?
    ///         .with_default_graph(NamedNodeRef::new("http://example.com/g2")?),
    ///     file.as_ref(),
    /// )?;
    ///
    /// let ex = NamedNodeRef::new("http://example.com")?;
    /// assert!(store.contains(QuadRef::new(ex, ex, ex, NamedNodeRef::new("http://example.com/g")?)));
    /// assert!(store.contains(QuadRef::new(ex, ex, ex, NamedNodeRef::new("http://example.com/g2")?)));
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn load_from_reader(
        &self,
        parser: impl Into<RdfParser>,
        reader: impl Read,
    ) -> Result<(), LoaderError> {
        let quads = parser
            .into()
            .rename_blank_nodes()
            .for_reader(reader)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(quads = quads.len(), "Loading parsed quads");
        self.insert_all(quads).map_err(LoaderError::from)
    }

    /// Buffers all insertions and removals until [Self::resume] is called.
    ///
    /// Open queries observe the buffered changes as one block in their original order.
    pub fn halt(&self) {
        self.inner.halt();
    }

    /// Applies the changes buffered since [Self::halt].
    pub fn resume(&self) {
        self.inner.resume();
    }

    /// Ends the store. All open queries complete and further modifications fail.
    pub fn end(&self) {
        self.inner.end();
    }

    /// Returns whether the store has ended.
    pub fn has_ended(&self) -> bool {
        self.inner.has_ended()
    }

    /// Returns the number of stored quads, counting each copy.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns whether at least one copy of `quad` is stored.
    pub fn contains(&self, quad: impl Into<Quad>) -> bool {
        self.inner.contains(&quad.into())
    }
}
