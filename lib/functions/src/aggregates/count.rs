use crate::aggregates::multiset::Multiset;
use crate::aggregates::Aggregator;
use crate::ExpressionResult;
use rdf_delta_model::{Numeric, Term, ThinResult};

/// Counts the values of a group.
///
/// Relevant Resources:
/// - [SPARQL 1.1 - Count](https://www.w3.org/TR/sparql11-query/#defn_aggCount)
#[derive(Debug, Default)]
pub(crate) struct CountAggregator {
    terms: Multiset<Term>,
}

impl CountAggregator {
    const NAME: &'static str = "count";
}

impl Aggregator for CountAggregator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn put_term(&mut self, term: &Term) -> ExpressionResult<()> {
        self.terms.insert(term);
        Ok(())
    }

    fn remove_term(&mut self, term: &Term) -> ExpressionResult<()> {
        self.terms.remove(Self::NAME, term)?;
        Ok(())
    }

    fn current(&self) -> ThinResult<Option<Term>> {
        Ok(Some(count_term(self.terms.len())))
    }

    fn empty_value_term(&self) -> Option<Term> {
        Some(count_term(0))
    }
}

pub(crate) fn count_term(count: usize) -> Term {
    Numeric::from_count(count).to_literal().into()
}
