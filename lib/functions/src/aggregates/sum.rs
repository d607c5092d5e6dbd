use crate::aggregates::count::count_term;
use crate::aggregates::multiset::Multiset;
use crate::aggregates::Aggregator;
use crate::ExpressionResult;
use rdf_delta_model::{Numeric, Term, ThinError, ThinResult, TypedValue};

/// The running sum of a multiset of numerics.
///
/// Each numeric type is summed up separately. Removing the last value of a type therefore also
/// removes its influence on the type of the result.
#[derive(Debug, Default)]
pub(crate) struct NumericSum {
    integers: PartialSum,
    decimals: PartialSum,
    floats: PartialSum,
    doubles: PartialSum,
}

#[derive(Debug, Default)]
struct PartialSum {
    sum: Option<Numeric>,
    count: usize,
}

impl PartialSum {
    fn add(&mut self, value: Numeric) -> ThinResult<()> {
        self.sum = Some(match self.sum {
            Some(sum) => sum.checked_add(value)?,
            None => value,
        });
        self.count += 1;
        Ok(())
    }

    fn subtract(&mut self, value: Numeric) -> ThinResult<()> {
        self.count = self.count.checked_sub(1).ok_or(ThinError::default())?;
        self.sum = match self.sum {
            _ if self.count == 0 => None,
            Some(sum) => Some(sum.checked_sub(value)?),
            None => return ThinError::expected(),
        };
        Ok(())
    }
}

impl NumericSum {
    pub fn add(&mut self, value: Numeric) -> ThinResult<()> {
        self.partial(value).add(value)
    }

    pub fn subtract(&mut self, value: Numeric) -> ThinResult<()> {
        self.partial(value).subtract(value)
    }

    /// Returns the sum of all values. The sum of no values is `0`.
    pub fn total(&self) -> ThinResult<Numeric> {
        [&self.integers, &self.decimals, &self.floats, &self.doubles]
            .into_iter()
            .filter_map(|partial| partial.sum)
            .try_fold(Numeric::from_count(0), Numeric::checked_add)
    }

    fn partial(&mut self, value: Numeric) -> &mut PartialSum {
        match value {
            Numeric::Integer(_) => &mut self.integers,
            Numeric::Decimal(_) => &mut self.decimals,
            Numeric::Float(_) => &mut self.floats,
            Numeric::Double(_) => &mut self.doubles,
        }
    }
}

pub(crate) fn numeric(term: &Term) -> ThinResult<Numeric> {
    TypedValue::from_term(term)
        .as_numeric()
        .ok_or(ThinError::default())
}

/// Sums up the values of a group.
///
/// Relevant Resources:
/// - [SPARQL 1.1 - Sum](https://www.w3.org/TR/sparql11-query/#defn_aggSum)
#[derive(Debug, Default)]
pub(crate) struct SumAggregator {
    terms: Multiset<Term>,
    sum: NumericSum,
}

impl SumAggregator {
    const NAME: &'static str = "sum";
}

impl Aggregator for SumAggregator {
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
        Ok(Some(self.sum.total()?.to_literal().into()))
    }

    fn empty_value_term(&self) -> Option<Term> {
        Some(count_term(0))
    }
}
