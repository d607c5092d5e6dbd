use insta::assert_snapshot;
use rdf_delta_functions::{ExpressionEvaluator, SparqlExpressionEvaluator};
use rdf_delta_model::vocab::xsd;
use rdf_delta_model::{BlankNode, Bindings, Literal, NamedNode, Term, Variable};
use spargebra::algebra::{Expression, Function};
use std::fmt::Write;

#[test]
fn test_str() {
    assert_snapshot!(invoke(Function::Str), @r#"
    [
      "http://example.com/a",
      error,
      "hello",
      "Hallo",
      "42",
      "abc",
    ]
    "#);
}

#[test]
fn test_ucase() {
    assert_snapshot!(invoke(Function::UCase), @r#"
    [
      error,
      error,
      "HELLO",
      "HALLO"@de,
      error,
      error,
    ]
    "#);
}

#[test]
fn test_strlen() {
    assert_snapshot!(invoke(Function::StrLen), @r#"
    [
      error,
      error,
      "5"^^<http://www.w3.org/2001/XMLSchema#integer>,
      "5"^^<http://www.w3.org/2001/XMLSchema#integer>,
      error,
      error,
    ]
    "#);
}

#[test]
fn test_lang() {
    assert_snapshot!(invoke(Function::Lang), @r#"
    [
      error,
      error,
      "",
      "de",
      "",
      "",
    ]
    "#);
}

fn invoke(function: Function) -> String {
    let variable = Variable::new_unchecked("arg");
    let expression =
        Expression::FunctionCall(function, vec![Expression::Variable(variable.clone())]);
    let evaluator = SparqlExpressionEvaluator::try_new(&expression).unwrap();

    let mut result = String::from("[\n");
    for term in create_test_vector() {
        let bindings = Bindings::from_iter([(variable.clone(), term)]);
        match evaluator.evaluate(&bindings) {
            Ok(term) => writeln!(result, "  {term},").unwrap(),
            Err(_) => result.push_str("  error,\n"),
        }
    }
    result.push(']');
    result
}

fn create_test_vector() -> Vec<Term> {
    vec![
        NamedNode::new_unchecked("http://example.com/a").into(),
        BlankNode::new_unchecked("b1").into(),
        Literal::new_simple_literal("hello").into(),
        Literal::new_language_tagged_literal_unchecked("Hallo", "de").into(),
        Literal::new_typed_literal("42", xsd::INTEGER).into(),
        Literal::new_typed_literal("abc", xsd::INTEGER).into(),
    ]
}
