use crate::aggregates::multiset::Multiset;
use crate::aggregates::Aggregator;
use crate::ExpressionResult;
use rdf_delta_model::{Term, ThinResult};

/// Picks an arbitrary value of a group.
///
/// The picked value stays the same as long as it is part of the group.
///
/// Relevant Resources:
/// - [SPARQL 1.1 - Sample](https://www.w3.org/TR/sparql11-query/#defn_aggSample)
#[derive(Debug, Default)]
pub(crate) struct SampleAggregator {
    terms: Multiset<Term>,
    sample: Option<Term>,
}

impl SampleAggregator {
    const NAME: &'static str = "sample";
}

impl Aggregator for SampleAggregator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn put_term(&mut self, term: &Term) -> ExpressionResult<()> {
        self.terms.insert(term);
        if self.sample.is_none() {
            self.sample = Some(term.clone());
        }
        Ok(())
    }

    fn remove_term(&mut self, term: &Term) -> ExpressionResult<()> {
        let removed_last_copy = self.terms.remove(Self::NAME, term)?;
        if removed_last_copy && self.sample.as_ref() == Some(term) {
            self.sample = self.terms.any().cloned();
        }
        Ok(())
    }

    fn current(&self) -> ThinResult<Option<Term>> {
        Ok(self.sample.clone())
    }
}
