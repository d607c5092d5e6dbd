use crate::aggregates::ordered::OrderedTerms;
use crate::aggregates::Aggregator;
use crate::ExpressionResult;
use rdf_delta_model::{Term, ThinResult};

/// Computes the largest value of a group.
///
/// Relevant Resources:
/// - [SPARQL 1.1 - Max](https://www.w3.org/TR/sparql11-query/#defn_aggMax)
#[derive(Debug, Default)]
pub(crate) struct MaxAggregator {
    terms: OrderedTerms,
}

impl MaxAggregator {
    const NAME: &'static str = "max";
}

impl Aggregator for MaxAggregator {
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
        Ok(self.terms.last().cloned())
    }
}
