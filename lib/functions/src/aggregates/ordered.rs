use rdf_delta_common::error::ContractViolation;
use rdf_delta_model::{Literal, Numeric, Term, TypedValue};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A multiset of terms that keeps them sorted.
///
/// Blank nodes sort before IRIs and IRIs before literals. Numeric literals sort before all other
/// literals and are compared by value. Numerics with the same value are ordered by their lexical
/// form.
#[derive(Debug, Default)]
pub(crate) struct OrderedTerms {
    terms: BTreeMap<SortKey, usize>,
    len: usize,
}

impl OrderedTerms {
    pub fn insert(&mut self, term: &Term) {
        *self.terms.entry(SortKey::new(term.clone())).or_insert(0) += 1;
        self.len += 1;
    }

    pub fn remove(
        &mut self,
        aggregate: &'static str,
        term: &Term,
    ) -> Result<(), ContractViolation> {
        if self.len == 0 {
            return Err(ContractViolation::RemoveFromEmptyAggregate {
                aggregate,
                term: term.to_string(),
            });
        }

        let key = SortKey::new(term.clone());
        let Some(count) = self.terms.get_mut(&key) else {
            return Err(ContractViolation::RemoveUnknownTerm {
                aggregate,
                term: term.to_string(),
            });
        };
        *count -= 1;
        if *count == 0 {
            self.terms.remove(&key);
        }
        self.len -= 1;
        Ok(())
    }

    pub fn first(&self) -> Option<&Term> {
        self.terms.first_key_value().map(|(key, _)| &key.term)
    }

    pub fn last(&self) -> Option<&Term> {
        self.terms.last_key_value().map(|(key, _)| &key.term)
    }
}

#[derive(Debug)]
struct SortKey {
    term: Term,
    numeric: Option<Numeric>,
}

impl SortKey {
    fn new(term: Term) -> Self {
        let numeric = TypedValue::from_term(&term).as_numeric();
        Self { term, numeric }
    }

    fn rank(&self) -> u8 {
        match (&self.term, self.numeric) {
            (Term::BlankNode(_), _) => 0,
            (Term::NamedNode(_), _) => 1,
            (Term::Literal(_), Some(_)) => 2,
            (Term::Literal(_), None) => 3,
        }
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank()).then_with(|| {
            match (&self.term, &other.term) {
                (Term::BlankNode(lhs), Term::BlankNode(rhs)) => lhs.as_str().cmp(rhs.as_str()),
                (Term::NamedNode(lhs), Term::NamedNode(rhs)) => lhs.as_str().cmp(rhs.as_str()),
                (Term::Literal(lhs), Term::Literal(rhs)) => {
                    compare_numerics(self.numeric, other.numeric)
                        .then_with(|| compare_lexical(lhs, rhs))
                }
                _ => Ordering::Equal,
            }
        })
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

fn compare_numerics(lhs: Option<Numeric>, rhs: Option<Numeric>) -> Ordering {
    match (lhs, rhs) {
        (Some(lhs), Some(rhs)) => lhs
            .partial_cmp(&rhs)
            .unwrap_or_else(|| lhs.to_f64().total_cmp(&rhs.to_f64())),
        _ => Ordering::Equal,
    }
}

fn compare_lexical(lhs: &Literal, rhs: &Literal) -> Ordering {
    lhs.value()
        .cmp(rhs.value())
        .then_with(|| lhs.datatype().as_str().cmp(rhs.datatype().as_str()))
        .then_with(|| lhs.language().cmp(&rhs.language()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_delta_model::vocab::xsd;
    use rdf_delta_model::NamedNode;

    #[test]
    fn numerics_are_sorted_by_value() {
        let mut terms = OrderedTerms::default();
        terms.insert(&Literal::from(10).into());
        terms.insert(&Literal::new_typed_literal("9.5", xsd::DECIMAL).into());
        terms.insert(&Literal::from("a").into());
        terms.insert(&NamedNode::new_unchecked("http://example.com").into());

        assert_eq!(
            terms.first(),
            Some(&NamedNode::new_unchecked("http://example.com").into())
        );
        assert_eq!(terms.last(), Some(&Literal::from("a").into()));
    }

    #[test]
    fn equal_values_with_different_lexical_forms_are_kept_apart() {
        let mut terms = OrderedTerms::default();
        let one = Term::from(Literal::from(1));
        let one_decimal = Term::from(Literal::new_typed_literal("1.0", xsd::DECIMAL));
        terms.insert(&one);
        terms.insert(&one_decimal);

        terms.remove("min", &one).unwrap();
        assert_eq!(terms.first(), Some(&one_decimal));
        assert!(terms.remove("min", &one).is_err());
    }
}
