use crate::{ThinError, ThinResult, TypedValue};
use oxrdf::{Literal, Term};
use std::cmp::Ordering;

/// Compares two possibly unbound terms using the total order of SPARQL `ORDER BY`.
///
/// Unbound values sort first, followed by blank nodes, IRIs and literals. Numeric literals are
/// compared by value, other literals by their lexical form, datatype and language tag.
pub fn compare_terms(lhs: Option<&Term>, rhs: Option<&Term>) -> Ordering {
    match (lhs, rhs) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(lhs), Some(rhs)) => match (lhs, rhs) {
            (Term::BlankNode(lhs), Term::BlankNode(rhs)) => lhs.as_str().cmp(rhs.as_str()),
            (Term::NamedNode(lhs), Term::NamedNode(rhs)) => lhs.as_str().cmp(rhs.as_str()),
            (Term::Literal(lhs), Term::Literal(rhs)) => compare_literals(lhs, rhs),
            _ => term_kind(lhs).cmp(&term_kind(rhs)),
        },
    }
}

/// Compares two terms for the SPARQL relational operators (`<`, `>`, ...).
///
/// Only numerics, strings and booleans are comparable. Comparing anything else is an expected
/// error.
pub fn compare_values(lhs: &Term, rhs: &Term) -> ThinResult<Ordering> {
    match (TypedValue::from_term(lhs), TypedValue::from_term(rhs)) {
        (TypedValue::Numeric(lhs), TypedValue::Numeric(rhs)) => {
            lhs.partial_cmp(&rhs).ok_or(ThinError::default())
        }
        (TypedValue::SimpleLiteral(lhs), TypedValue::SimpleLiteral(rhs)) => Ok(lhs.cmp(&rhs)),
        (TypedValue::Boolean(lhs), TypedValue::Boolean(rhs)) => Ok(lhs.cmp(&rhs)),
        _ => ThinError::expected(),
    }
}

/// Implements the SPARQL `=` operator.
///
/// Equal terms are always equal. Literals of known datatypes are compared by value. Comparing
/// literals of unknown datatypes that are not identical is an expected error.
pub fn terms_equal(lhs: &Term, rhs: &Term) -> ThinResult<bool> {
    if lhs == rhs {
        return Ok(true);
    }

    match (TypedValue::from_term(lhs), TypedValue::from_term(rhs)) {
        (TypedValue::Numeric(lhs), TypedValue::Numeric(rhs)) => {
            Ok(lhs.partial_cmp(&rhs) == Some(Ordering::Equal))
        }
        (TypedValue::OtherLiteral(_), TypedValue::OtherLiteral(_)) => ThinError::expected(),
        _ => Ok(false),
    }
}

fn compare_literals(lhs: &Literal, rhs: &Literal) -> Ordering {
    let lhs_value = TypedValue::from_term(&lhs.clone().into());
    let rhs_value = TypedValue::from_term(&rhs.clone().into());
    if let (TypedValue::Numeric(lhs), TypedValue::Numeric(rhs)) = (&lhs_value, &rhs_value) {
        if let Some(ordering) = lhs.partial_cmp(rhs) {
            return ordering;
        }
    }

    lhs.value()
        .cmp(rhs.value())
        .then_with(|| lhs.datatype().as_str().cmp(rhs.datatype().as_str()))
        .then_with(|| lhs.language().cmp(&rhs.language()))
}

fn term_kind(term: &Term) -> u8 {
    match term {
        Term::BlankNode(_) => 0,
        Term::NamedNode(_) => 1,
        Term::Literal(_) => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::vocab::xsd;
    use oxrdf::{BlankNode, NamedNode};

    #[test]
    fn order_by_term_kind() {
        let blank = Term::from(BlankNode::new_unchecked("b"));
        let iri = Term::from(NamedNode::new_unchecked("http://example.com"));
        let literal = Term::from(Literal::from("a"));

        assert_eq!(compare_terms(None, Some(&blank)), Ordering::Less);
        assert_eq!(compare_terms(Some(&blank), Some(&iri)), Ordering::Less);
        assert_eq!(compare_terms(Some(&iri), Some(&literal)), Ordering::Less);
        assert_eq!(compare_terms(Some(&literal), Some(&literal)), Ordering::Equal);
    }

    #[test]
    fn numerics_are_ordered_by_value() {
        let ten = Term::from(Literal::from(10));
        let two = Term::from(Literal::new_typed_literal("2.0", xsd::DECIMAL));

        assert_eq!(compare_terms(Some(&two), Some(&ten)), Ordering::Less);
        assert_eq!(compare_values(&two, &ten), Ok(Ordering::Less));
    }

    #[test]
    fn comparing_incomparable_values_fails() {
        let iri = Term::from(NamedNode::new_unchecked("http://example.com"));
        assert!(compare_values(&iri, &iri).is_err());
    }

    #[test]
    fn equality_of_numerics_across_datatypes() {
        let one = Term::from(Literal::from(1));
        let one_decimal = Term::from(Literal::new_typed_literal("1.0", xsd::DECIMAL));
        let other = Term::from(Literal::from("1"));

        assert_eq!(terms_equal(&one, &one_decimal), Ok(true));
        assert_eq!(terms_equal(&one, &other), Ok(false));
    }
}
