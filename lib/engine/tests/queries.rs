use futures::{FutureExt, StreamExt};
use rdf_delta_common::error::QueryEvaluationError;
use rdf_delta_common::BlankNodeMatchingMode;
use rdf_delta_engine::{evaluate_query, Query, QueryOptions, QueryResults, QuerySolutionStream};
use rdf_delta_model::{GraphName, Literal, NamedNode, Quad, Term};
use rdf_delta_storage::StreamingStore;

fn ex(name: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("http://example.com/{name}"))
}

fn quad(s: &str, p: &str, o: impl Into<Term>) -> Quad {
    Quad::new(ex(s), ex(p), o, GraphName::DefaultGraph)
}

fn quad_in(s: &str, p: &str, o: &str, graph: &str) -> Quad {
    Quad::new(ex(s), ex(p), ex(o), ex(graph))
}

fn select(store: &StreamingStore, query: &str, options: QueryOptions) -> QuerySolutionStream {
    let query = Query::parse(query, Some("http://example.com/")).unwrap();
    match evaluate_query(store, &query, options).unwrap() {
        QueryResults::Solutions(solutions) => solutions,
        QueryResults::Boolean(_) => panic!("Expected solutions"),
    }
}

/// Renders the changes that are ready, sorted to be independent of the hash join order.
fn changes(stream: &mut QuerySolutionStream) -> String {
    let mut lines = Vec::new();
    while let Some(Some(item)) = stream.next().now_or_never() {
        lines.push(item.unwrap().to_string());
    }
    lines.sort();
    lines.join("\n")
}

#[tokio::test]
async fn select_follows_inserts_and_removals() {
    let store = StreamingStore::new();
    store.add_quad(quad("alice", "knows", ex("bob"))).unwrap();

    let mut solutions = select(
        &store,
        "SELECT ?s ?o WHERE { ?s <knows> ?o }",
        QueryOptions::default(),
    );
    assert_eq!(solutions.variables().len(), 2);
    insta::assert_snapshot!(
        changes(&mut solutions),
        @"+ ?o=<http://example.com/bob> ?s=<http://example.com/alice>"
    );

    store.add_quad(quad("bob", "knows", ex("carol"))).unwrap();
    store.remove_quad(quad("alice", "knows", ex("bob"))).unwrap();
    insta::assert_snapshot!(changes(&mut solutions), @r"
    + ?o=<http://example.com/carol> ?s=<http://example.com/bob>
    - ?o=<http://example.com/bob> ?s=<http://example.com/alice>
    ");
}

#[tokio::test]
async fn shared_blank_nodes_join_patterns() {
    let store = StreamingStore::new();
    store.add_quad(quad("alice", "knows", ex("bob"))).unwrap();
    store
        .add_quad(quad("bob", "name", Literal::new_simple_literal("Bob")))
        .unwrap();
    store
        .add_quad(quad("carol", "name", Literal::new_simple_literal("Carol")))
        .unwrap();

    let mut solutions = select(
        &store,
        "SELECT * WHERE { ?s <knows> _:friend . _:friend <name> ?n }",
        QueryOptions::default(),
    );
    insta::assert_snapshot!(
        changes(&mut solutions),
        @r#"+ ?n="Bob" ?s=<http://example.com/alice>"#
    );
}

#[tokio::test]
async fn blank_nodes_as_filters_only_match_themselves() {
    let store = StreamingStore::new();
    store.add_quad(quad("alice", "knows", ex("bob"))).unwrap();

    let mut solutions = select(
        &store,
        "SELECT ?s WHERE { ?s <knows> _:friend }",
        QueryOptions::default().with_blank_node_mode(BlankNodeMatchingMode::Filter),
    );
    assert_eq!(changes(&mut solutions), "");
}

#[tokio::test]
async fn graph_variable_binds_named_graphs() {
    let store = StreamingStore::new();
    store.add_quad(quad("a", "p", ex("b"))).unwrap();
    store.add_quad(quad_in("c", "p", "d", "g1")).unwrap();

    let mut solutions = select(
        &store,
        "SELECT ?s ?g WHERE { GRAPH ?g { ?s <p> ?o } }",
        QueryOptions::default(),
    );
    insta::assert_snapshot!(
        changes(&mut solutions),
        @"+ ?g=<http://example.com/g1> ?s=<http://example.com/c>"
    );

    let mut union = select(
        &store,
        "SELECT ?s WHERE { ?s <p> ?o }",
        QueryOptions::default().with_default_graph_as_union(true),
    );
    insta::assert_snapshot!(changes(&mut union), @r"
    + ?s=<http://example.com/a>
    + ?s=<http://example.com/c>
    ");
}

#[tokio::test]
async fn not_exists_reacts_to_inner_changes() {
    let store = StreamingStore::new();
    store.add_quad(quad("alice", "type", ex("Person"))).unwrap();

    let mut solutions = select(
        &store,
        "SELECT ?s WHERE { ?s <type> <Person> FILTER NOT EXISTS { ?s <banned> true } }",
        QueryOptions::default(),
    );
    insta::assert_snapshot!(changes(&mut solutions), @"+ ?s=<http://example.com/alice>");

    store
        .add_quad(quad("alice", "banned", Literal::from(true)))
        .unwrap();
    insta::assert_snapshot!(changes(&mut solutions), @"- ?s=<http://example.com/alice>");

    store
        .remove_quad(quad("alice", "banned", Literal::from(true)))
        .unwrap();
    insta::assert_snapshot!(changes(&mut solutions), @"+ ?s=<http://example.com/alice>");
}

#[tokio::test]
async fn filter_and_bind() {
    let store = StreamingStore::new();
    store.add_quad(quad("a", "age", Literal::from(17_i64))).unwrap();
    store.add_quad(quad("b", "age", Literal::from(42_i64))).unwrap();

    let mut solutions = select(
        &store,
        "SELECT ?s ?older WHERE { ?s <age> ?age FILTER(?age >= 18) BIND(?age + 1 AS ?older) }",
        QueryOptions::default(),
    );
    insta::assert_snapshot!(
        changes(&mut solutions),
        @r#"+ ?older="43"^^<http://www.w3.org/2001/XMLSchema#integer> ?s=<http://example.com/b>"#
    );
}

#[tokio::test]
async fn ask_reports_answer_changes() {
    let store = StreamingStore::new();
    let query = Query::parse("ASK { ?s <p> ?o }", Some("http://example.com/")).unwrap();
    let QueryResults::Boolean(mut answers) =
        evaluate_query(&store, &query, QueryOptions::default()).unwrap()
    else {
        panic!("Expected a boolean result");
    };
    assert!(answers.next().now_or_never().is_none());

    store.add_quad(quad("a", "p", ex("b"))).unwrap();
    store.add_quad(quad("c", "p", ex("d"))).unwrap();
    assert!(answers.next().await.unwrap().unwrap());

    store.remove_quad(quad("a", "p", ex("b"))).unwrap();
    store.remove_quad(quad("c", "p", ex("d"))).unwrap();
    assert!(!answers.next().await.unwrap().unwrap());
}

#[tokio::test]
async fn unsupported_patterns_fail_before_registering_listeners() {
    let store = StreamingStore::new();
    let query = Query::parse(
        "SELECT * WHERE { ?s <p> ?o OPTIONAL { ?o <q> ?x } }",
        Some("http://example.com/"),
    )
    .unwrap();

    let error = evaluate_query(&store, &query, QueryOptions::default()).unwrap_err();
    assert!(matches!(error, QueryEvaluationError::NotImplemented(_)));
    insta::assert_snapshot!(
        error,
        @"A feature has not yet been implemented: OPTIONAL cannot be evaluated incrementally"
    );
    assert_eq!(store.listener_count(), 0);
    assert!(!store.has_ended());
}

#[tokio::test]
async fn exists_inside_exists_is_rejected() {
    let store = StreamingStore::new();
    store.add_quad(quad("x1", "p", ex("y1"))).unwrap();
    store.add_quad(quad("z1", "q", ex("w1"))).unwrap();
    store.add_quad(quad("x2", "r", ex("z1"))).unwrap();

    for query in [
        "SELECT * WHERE { ?x <p> ?y FILTER EXISTS { ?z <q> ?w FILTER EXISTS { ?x <r> ?z } } }",
        "SELECT * WHERE { ?x <p> ?y FILTER NOT EXISTS { ?z <q> ?w FILTER NOT EXISTS { ?x <r> ?z } } }",
        "SELECT * WHERE { ?x <p> ?y FILTER EXISTS { { ?z <q> ?w FILTER EXISTS { ?x <r> ?z } } UNION { ?z <q> ?w } } }",
    ] {
        let query = Query::parse(query, Some("http://example.com/")).unwrap();
        let error = evaluate_query(&store, &query, QueryOptions::default()).unwrap_err();
        insta::allow_duplicates! {
            insta::assert_snapshot!(
                error,
                @"A feature has not yet been implemented: Nested existence filters are currently not supported."
            );
        }
        assert_eq!(store.listener_count(), 0);
    }
    assert!(!store.has_ended());
}

#[tokio::test]
async fn dropping_the_results_releases_listeners() {
    let store = StreamingStore::new();
    let solutions = select(
        &store,
        "SELECT * WHERE { ?s <p> ?o . ?o <q> ?x }",
        QueryOptions::default(),
    );
    assert_eq!(store.listener_count(), 2);

    drop(solutions);
    assert_eq!(store.listener_count(), 0);
    assert!(store.has_ended());
}

#[tokio::test]
async fn cancel_ends_the_results() {
    let store = StreamingStore::new();
    store.add_quad(quad("a", "p", ex("b"))).unwrap();
    let mut solutions = select(&store, "SELECT * WHERE { ?s <p> ?o }", QueryOptions::default());

    solutions.cancel();
    assert_eq!(solutions.next().await.map(|s| s.is_ok()), Some(true));
    assert!(solutions.next().await.is_none());
}
