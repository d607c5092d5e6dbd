use crate::aggregates::Aggregator;
use crate::ExpressionResult;
use rdf_delta_common::error::ContractViolation;
use rdf_delta_model::{Literal, Term, ThinError, ThinResult};

/// Concatenates the values of a group with a given separator.
///
/// Values are concatenated in the order in which they were first added. Literals and IRIs
/// contribute their lexical form. The result keeps the language tag if all values share it.
///
/// Relevant Resources:
/// - [SPARQL 1.1 - GROUP CONCAT](https://www.w3.org/TR/sparql11-query/#defn_aggGroupConcat)
#[derive(Debug)]
pub(crate) struct GroupConcatAggregator {
    separator: String,
    /// The values with their multiplicity.
    values: Vec<(Term, usize)>,
}

impl GroupConcatAggregator {
    const NAME: &'static str = "group_concat";

    pub fn new(separator: Option<&str>) -> Self {
        Self {
            separator: separator.unwrap_or(" ").to_owned(),
            values: Vec::new(),
        }
    }
}

impl Aggregator for GroupConcatAggregator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn put_term(&mut self, term: &Term) -> ExpressionResult<()> {
        if matches!(term, Term::BlankNode(_)) {
            return Err(ThinError::default().into());
        }
        match self.values.iter_mut().find(|(value, _)| value == term) {
            Some((_, count)) => *count += 1,
            None => self.values.push((term.clone(), 1)),
        }
        Ok(())
    }

    fn remove_term(&mut self, term: &Term) -> ExpressionResult<()> {
        if self.values.is_empty() {
            return Err(ContractViolation::RemoveFromEmptyAggregate {
                aggregate: Self::NAME,
                term: term.to_string(),
            }
            .into());
        }
        let Some(position) = self.values.iter().position(|(value, _)| value == term) else {
            return Err(ContractViolation::RemoveUnknownTerm {
                aggregate: Self::NAME,
                term: term.to_string(),
            }
            .into());
        };

        let count = &mut self.values[position].1;
        *count -= 1;
        if *count == 0 {
            self.values.remove(position);
        }
        Ok(())
    }

    fn current(&self) -> ThinResult<Option<Term>> {
        let mut result = String::new();
        let mut language: Option<Option<&str>> = None;
        let copies = self
            .values
            .iter()
            .flat_map(|(term, count)| std::iter::repeat(term).take(*count));
        for (idx, term) in copies.enumerate() {
            if idx > 0 {
                result.push_str(&self.separator);
            }
            let (value, term_language) = match term {
                Term::NamedNode(node) => (node.as_str(), None),
                Term::Literal(literal) => (literal.value(), literal.language()),
                Term::BlankNode(_) => return ThinError::expected(),
            };
            result.push_str(value);
            language = match language {
                None => Some(term_language),
                Some(current) if current == term_language => Some(current),
                Some(_) => Some(None),
            };
        }

        let literal = match language.flatten() {
            Some(language) => Literal::new_language_tagged_literal_unchecked(result, language),
            None => Literal::new_simple_literal(result),
        };
        Ok(Some(literal.into()))
    }

    fn empty_value_term(&self) -> Option<Term> {
        Some(Literal::new_simple_literal("").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concatenates_in_insertion_order() {
        let mut concat = GroupConcatAggregator::new(Some(", "));
        concat.put_term(&Literal::from("b").into()).unwrap();
        concat.put_term(&Literal::from("a").into()).unwrap();
        concat.put_term(&Literal::from("b").into()).unwrap();
        assert_eq!(
            concat.current(),
            Ok(Some(Literal::from("b, b, a").into()))
        );

        concat.remove_term(&Literal::from("b").into()).unwrap();
        assert_eq!(concat.current(), Ok(Some(Literal::from("b, a").into())));
    }

    #[test]
    fn shared_languages_are_kept() {
        let mut concat = GroupConcatAggregator::new(None);
        let hello = Literal::new_language_tagged_literal_unchecked("hello", "en");
        let world = Literal::new_language_tagged_literal_unchecked("world", "en");
        concat.put_term(&hello.into()).unwrap();
        concat.put_term(&world.into()).unwrap();
        assert_eq!(
            concat.current(),
            Ok(Some(
                Literal::new_language_tagged_literal_unchecked("hello world", "en").into()
            ))
        );

        concat.put_term(&Literal::from("!").into()).unwrap();
        assert_eq!(
            concat.current(),
            Ok(Some(Literal::from("hello world !").into()))
        );
    }
}
