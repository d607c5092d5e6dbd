use crate::aggregates::count::count_term;
use crate::aggregates::multiset::Multiset;
use crate::aggregates::sum::{numeric, NumericSum};
use crate::aggregates::Aggregator;
use crate::ExpressionResult;
use rdf_delta_model::{Numeric, Term, ThinResult};

/// Computes the average of the values of a group.
///
/// Relevant Resources:
/// - [SPARQL 1.1 - Avg](https://www.w3.org/TR/sparql11-query/#defn_aggAvg)
#[derive(Debug, Default)]
pub(crate) struct AvgAggregator {
    terms: Multiset<Term>,
    sum: NumericSum,
}

impl AvgAggregator {
    const NAME: &'static str = "avg";
}

impl Aggregator for AvgAggregator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn put_term(&mut self, term: &Term) -> ExpressionResult<()> {
        self.sum.add(numeric(term)?)?;
        self.terms.insert(term);
        Ok(())
    }

    fn remove_term(&mut self, term: &Term) -> ExpressionResult<()> {
        self.terms.remove(Self::NAME, term)?;
        self.sum.subtract(numeric(term)?)?;
        Ok(())
    }

    fn current(&self) -> ThinResult<Option<Term>> {
        if self.terms.is_empty() {
            return Ok(self.empty_value_term());
        }
        let average = self
            .sum
            .total()?
            .checked_div(Numeric::from_count(self.terms.len()))?;
        Ok(Some(average.to_literal().into()))
    }

    fn empty_value_term(&self) -> Option<Term> {
        Some(count_term(0))
    }
}
