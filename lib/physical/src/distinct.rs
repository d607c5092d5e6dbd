use crate::metadata::{at_most, derived};
use futures::{ready, Stream, StreamExt};
use rdf_delta_common::error::ContractViolation;
use rdf_delta_common::{BindingsHasher, BindingsResult, BindingsStream, QueryOperationResult};
use rdf_delta_model::{Bindings, Variable};
use rustc_hash::FxHashMap;
use std::fmt::{Debug, Formatter};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Removes duplicates from a stream of tagged solutions.
///
/// Each distinct solution is visible at most once. Its additional copies are counted, such that
/// the solution is only retracted once its last copy has been deleted.
pub struct DistinctStream {
    input: BindingsStream,
    variables: Vec<Variable>,
    hasher: Arc<dyn BindingsHasher>,
    /// The live solutions and their multiplicity, grouped by their hash.
    buckets: FxHashMap<u64, Vec<(Bindings, usize)>>,
    finished: bool,
}

impl DistinctStream {
    /// Removes the duplicates of `input`.
    pub fn create(
        input: QueryOperationResult,
        hasher: Arc<dyn BindingsHasher>,
    ) -> QueryOperationResult {
        let input_metadata = input.metadata.current();
        let metadata = derived(
            at_most(input_metadata.cardinality),
            input_metadata.variables.clone(),
        );
        let cancel_handles = input.stream.cancel_handles().clone();

        let stream = Self {
            input: input.stream,
            variables: input_metadata.variable_names(),
            hasher,
            buckets: FxHashMap::default(),
            finished: false,
        };
        QueryOperationResult::new(BindingsStream::new(stream, cancel_handles), metadata)
    }

    /// Updates the multiplicity of `bindings` and returns whether it became visible or invisible.
    fn process(&mut self, bindings: &Bindings) -> Result<bool, ContractViolation> {
        let hash = self.hasher.hash(bindings, &self.variables);
        let bucket = self.buckets.entry(hash).or_default();
        let position = bucket.iter().position(|(other, _)| other == bindings);

        if bindings.is_addition() {
            return Ok(match position {
                Some(position) => {
                    bucket[position].1 += 1;
                    false
                }
                None => {
                    bucket.push((bindings.clone(), 1));
                    true
                }
            });
        }

        let Some(position) = position else {
            if bucket.is_empty() {
                self.buckets.remove(&hash);
            }
            return Err(ContractViolation::UnmatchedDeletion {
                operator: "Distinct",
                bindings: bindings.to_string(),
            });
        };

        bucket[position].1 -= 1;
        if bucket[position].1 > 0 {
            return Ok(false);
        }
        bucket.swap_remove(position);
        if bucket.is_empty() {
            self.buckets.remove(&hash);
        }
        Ok(true)
    }
}

impl Stream for DistinctStream {
    type Item = BindingsResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if this.finished {
                return Poll::Ready(None);
            }

            let bindings = match ready!(this.input.poll_next_unpin(cx)) {
                None => {
                    this.finished = true;
                    return Poll::Ready(None);
                }
                Some(Err(error)) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(error)));
                }
                Some(Ok(bindings)) => bindings,
            };

            match this.process(&bindings) {
                Ok(true) => return Poll::Ready(Some(Ok(bindings))),
                Ok(false) => {}
                Err(violation) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(violation.into())));
                }
            }
        }
    }
}

impl Debug for DistinctStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistinctStream")
            .field("variables", &self.variables)
            .field("buckets", &self.buckets.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{add, del, render, static_input};
    use futures::executor::block_on;
    use futures::TryStreamExt;
    use rdf_delta_common::FxBindingsHasher;

    fn distinct(items: Vec<Bindings>) -> Result<Vec<Bindings>, String> {
        let input = static_input(&["a"], items);
        let stream = DistinctStream::create(input, Arc::new(FxBindingsHasher)).stream;
        block_on(stream.try_collect::<Vec<_>>()).map_err(|e| e.to_string())
    }

    #[test]
    fn emits_only_first_addition_and_last_deletion() {
        let result = distinct(vec![
            add(&[("a", "1")]),
            add(&[("a", "1")]),
            add(&[("a", "2")]),
            del(&[("a", "1")]),
            del(&[("a", "1")]),
            add(&[("a", "1")]),
        ])
        .unwrap();

        insta::assert_snapshot!(render(&result), @r#"
        + ?a="1"
        + ?a="2"
        - ?a="1"
        + ?a="1"
        "#);
    }

    #[test]
    fn visible_solutions_follow_multiplicity() {
        let changes = [
            add(&[("a", "1")]),
            add(&[("a", "2")]),
            add(&[("a", "1")]),
            del(&[("a", "2")]),
            add(&[("a", "1")]),
            del(&[("a", "1")]),
            add(&[("a", "2")]),
            del(&[("a", "1")]),
            del(&[("a", "1")]),
        ];

        for prefix in 1..=changes.len() {
            let result = distinct(changes[..prefix].to_vec()).unwrap();
            for value in ["1", "2"] {
                let live = changes[..prefix]
                    .iter()
                    .filter(|b| b.get("a") == add(&[("a", value)]).get("a"))
                    .map(|b| if b.is_addition() { 1_i32 } else { -1 })
                    .sum::<i32>();
                let visible = result
                    .iter()
                    .filter(|b| b.get("a") == add(&[("a", value)]).get("a"))
                    .map(|b| if b.is_addition() { 1_i32 } else { -1 })
                    .sum::<i32>();
                assert_eq!(visible, i32::from(live > 0), "value {value} after {prefix} changes");
            }
        }
    }

    #[test]
    fn unmatched_deletion_fails() {
        let error = distinct(vec![add(&[("a", "1")]), del(&[("a", "2")])]).unwrap_err();
        assert_eq!(
            error,
            "Distinct received a deletion for a solution that was never added: - ?a=\"2\""
        );
    }

    /// Maps every solution to the same bucket.
    struct ConstantHasher;

    impl BindingsHasher for ConstantHasher {
        fn hash(&self, _: &Bindings, _: &[Variable]) -> u64 {
            0
        }
    }

    #[test]
    fn collisions_are_resolved_by_equality() {
        let input = static_input(
            &["a"],
            vec![add(&[("a", "1")]), add(&[("a", "2")]), del(&[("a", "1")])],
        );
        let stream = DistinctStream::create(input, Arc::new(ConstantHasher)).stream;
        let result = block_on(stream.try_collect::<Vec<_>>()).unwrap();

        insta::assert_snapshot!(render(&result), @r#"
        + ?a="1"
        + ?a="2"
        - ?a="1"
        "#);
    }
}
