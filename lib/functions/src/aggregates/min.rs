use crate::aggregates::ordered::OrderedTerms;
use crate::aggregates::Aggregator;
use crate::ExpressionResult;
use rdf_delta_model::{Term, ThinResult};

/// Computes the smallest value of a group.
///
/// Relevant Resources:
/// - [SPARQL 1.1 - Min](https://www.w3.org/TR/sparql11-query/#defn_aggMin)
#[derive(Debug, Default)]
pub(crate) struct MinAggregator {
    terms: OrderedTerms,
}

impl MinAggregator {
    const NAME: &'static str = "min";
}

impl Aggregator for MinAggregator {
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
        Ok(self.terms.first().cloned())
    }
}
