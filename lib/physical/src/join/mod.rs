mod index;

use crate::metadata::{bound_shared_variables, derived, join_variables};
use futures::stream::BoxStream;
use futures::{ready, Stream, StreamExt};
use index::JoinIndex;
use rdf_delta_common::error::ContractViolation;
use rdf_delta_common::{
    BindingsHasher, BindingsResult, BindingsStream, Cardinality, QueryOperationResult,
};
use rdf_delta_model::{Bindings, Variable};
use std::collections::VecDeque;
use std::fmt::{Debug, Formatter};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// An incremental inner join of two solution streams.
///
/// Both sides keep an index of their live solutions. A change on one side is joined with the
/// current state of the other side's index, which makes the result independent of how the two
/// inputs interleave. A deletion retracts exactly the results that the matching addition
/// produced.
///
/// The join key consists of the shared variables that are bound in every solution of both sides.
/// Solutions that nevertheless leave a key variable unbound are compared against every live
/// solution of the other side.
pub struct HashJoinStream {
    inputs: BoxStream<'static, (Side, BindingsResult)>,
    key_variables: Vec<Variable>,
    hasher: Arc<dyn BindingsHasher>,
    left: JoinIndex,
    right: JoinIndex,
    output: VecDeque<Bindings>,
    finished: bool,
}

impl HashJoinStream {
    /// Joins `left` and `right`. The output ends once both inputs have ended.
    pub fn create(
        left: QueryOperationResult,
        right: QueryOperationResult,
        hasher: Arc<dyn BindingsHasher>,
    ) -> QueryOperationResult {
        let left_metadata = left.metadata.current();
        let right_metadata = right.metadata.current();
        let key_variables = bound_shared_variables(&left_metadata, &right_metadata);
        debug!(?key_variables, "Creating hash join");

        let metadata = derived(
            Cardinality::Estimate(
                left_metadata
                    .cardinality
                    .value()
                    .saturating_mul(right_metadata.cardinality.value()),
            ),
            join_variables(&left_metadata.variables, &right_metadata.variables),
        );

        let cancel_handles = left
            .stream
            .cancel_handles()
            .clone()
            .merge(right.stream.cancel_handles());
        let inputs = futures::stream::select(
            left.stream.map(|item| (Side::Left, item)),
            right.stream.map(|item| (Side::Right, item)),
        )
        .boxed();

        let stream = Self {
            inputs,
            key_variables,
            hasher,
            left: JoinIndex::default(),
            right: JoinIndex::default(),
            output: VecDeque::new(),
            finished: false,
        };
        QueryOperationResult::new(BindingsStream::new(stream, cancel_handles), metadata)
    }

    /// The hash of the join key. [None] if a join variable is unbound.
    fn key_hash(&self, bindings: &Bindings) -> Option<u64> {
        self.key_variables
            .iter()
            .all(|variable| bindings.contains(variable.as_str()))
            .then(|| self.hasher.hash(bindings, &self.key_variables))
    }

    fn process(&mut self, side: Side, bindings: Bindings) -> Result<(), ContractViolation> {
        let hash = self.key_hash(&bindings);
        let is_addition = bindings.is_addition();
        let (own, other) = match side {
            Side::Left => (&mut self.left, &self.right),
            Side::Right => (&mut self.right, &self.left),
        };

        if is_addition {
            own.insert(hash, bindings.clone());
        } else if !own.remove(hash, &bindings) {
            return Err(ContractViolation::UnmatchedDeletion {
                operator: "HashJoin",
                bindings: bindings.to_string(),
            });
        }

        for (candidate, count) in other.candidates(hash) {
            let merged = match side {
                Side::Left => bindings.merge(candidate),
                Side::Right => candidate.merge(&bindings),
            };
            if let Some(merged) = merged {
                let merged = merged.with_addition(is_addition);
                self.output
                    .extend(std::iter::repeat(merged).take(count));
            }
        }
        Ok(())
    }
}

impl Stream for HashJoinStream {
    type Item = BindingsResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if let Some(bindings) = this.output.pop_front() {
                return Poll::Ready(Some(Ok(bindings)));
            }
            if this.finished {
                return Poll::Ready(None);
            }

            match ready!(this.inputs.poll_next_unpin(cx)) {
                None => this.finished = true,
                Some((_, Err(error))) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(error)));
                }
                Some((side, Ok(bindings))) => {
                    if let Err(violation) = this.process(side, bindings) {
                        this.finished = true;
                        return Poll::Ready(Some(Err(violation.into())));
                    }
                }
            }
        }
    }
}

impl Debug for HashJoinStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashJoinStream")
            .field("key_variables", &self.key_variables)
            .field("left", &self.left.len())
            .field("right", &self.right.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{add, del, drain, live_input, render, send, static_input};
    use futures::executor::block_on;
    use futures::{FutureExt, TryStreamExt};
    use rdf_delta_common::{BindingsMetadata, FxBindingsHasher, MetadataHandle, MetadataVariable};

    fn join(left: QueryOperationResult, right: QueryOperationResult) -> QueryOperationResult {
        HashJoinStream::create(left, right, Arc::new(FxBindingsHasher))
    }

    fn sorted(items: &[Bindings]) -> String {
        let mut lines = items.iter().map(ToString::to_string).collect::<Vec<_>>();
        lines.sort();
        lines.join("\n")
    }

    #[test]
    fn joins_compatible_pairs() {
        let left = static_input(
            &["a", "b"],
            vec![add(&[("a", "1"), ("b", "x")]), add(&[("a", "2"), ("b", "y")])],
        );
        let right = static_input(
            &["a", "c"],
            vec![
                add(&[("a", "1"), ("c", "u")]),
                add(&[("a", "1"), ("c", "v")]),
                add(&[("a", "3"), ("c", "w")]),
            ],
        );

        let result = block_on(join(left, right).stream.try_collect::<Vec<_>>()).unwrap();
        insta::assert_snapshot!(sorted(&result), @r#"
        + ?a="1" ?b="x" ?c="u"
        + ?a="1" ?b="x" ?c="v"
        "#);
    }

    #[test]
    fn metadata_contains_the_variables_of_both_sides() {
        let left = static_input(&["a", "b"], Vec::new());
        let right = static_input(&["a", "c"], Vec::new());

        let variables = join(left, right)
            .metadata
            .current()
            .variables
            .iter()
            .map(|v| v.variable.as_str().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(variables, ["a", "b", "c"]);
    }

    #[test]
    fn result_is_independent_of_interleaving() {
        let left_items = vec![add(&[("a", "1"), ("b", "x")]), add(&[("a", "1"), ("b", "y")])];
        let right_items = vec![add(&[("a", "1"), ("c", "u")]), add(&[("a", "2"), ("c", "v")])];

        let (left_tx, left) = live_input(&["a", "b"]);
        let (right_tx, right) = live_input(&["a", "c"]);
        let mut left_first = join(left, right).stream;
        left_items.iter().for_each(|b| send(&left_tx, b.clone()));
        right_items.iter().for_each(|b| send(&right_tx, b.clone()));
        let left_first = drain(&mut left_first);

        let (left_tx, left) = live_input(&["a", "b"]);
        let (right_tx, right) = live_input(&["a", "c"]);
        let mut interleaved = join(left, right).stream;
        send(&right_tx, right_items[0].clone());
        send(&left_tx, left_items[0].clone());
        send(&right_tx, right_items[1].clone());
        send(&left_tx, left_items[1].clone());
        let interleaved = drain(&mut interleaved);

        assert_eq!(left_first.len(), 2);
        assert_eq!(sorted(&left_first), sorted(&interleaved));
    }

    #[test]
    fn deletion_retracts_results_on_both_sides() {
        let (left_tx, left) = live_input(&["a", "b"]);
        let (right_tx, right) = live_input(&["a", "c"]);
        let mut stream = join(left, right).stream;

        send(&left_tx, add(&[("a", "1"), ("b", "x")]));
        send(&right_tx, add(&[("a", "1"), ("c", "u")]));
        send(&right_tx, add(&[("a", "1"), ("c", "u")]));
        assert_eq!(drain(&mut stream).len(), 2);

        send(&left_tx, del(&[("a", "1"), ("b", "x")]));
        insta::assert_snapshot!(render(&drain(&mut stream)), @r#"
        - ?a="1" ?b="x" ?c="u"
        - ?a="1" ?b="x" ?c="u"
        "#);

        // The right side is still live and joins with a new left solution.
        send(&left_tx, add(&[("a", "1"), ("b", "y")]));
        assert_eq!(drain(&mut stream).len(), 2);
        send(&right_tx, del(&[("a", "1"), ("c", "u")]));
        insta::assert_snapshot!(render(&drain(&mut stream)), @r#"- ?a="1" ?b="y" ?c="u""#);
    }

    #[test]
    fn deletion_without_addition_fails() {
        let left = static_input(&["a"], vec![del(&[("a", "1")])]);
        let right = static_input(&["a"], vec![add(&[("a", "1")])]);

        let error = block_on(join(left, right).stream.try_collect::<Vec<_>>()).unwrap_err();
        insta::assert_snapshot!(
            error,
            @r#"HashJoin received a deletion for a solution that was never added: - ?a="1""#
        );
    }

    #[test]
    fn unbound_values_join_with_everything() {
        let (left_tx, left) = live_input(&["a", "b"]);
        let left = QueryOperationResult::new(
            left.stream,
            MetadataHandle::new(BindingsMetadata::new(
                Cardinality::Exact(0),
                vec![
                    MetadataVariable::maybe_undef(Variable::new_unchecked("a")),
                    MetadataVariable::bound(Variable::new_unchecked("b")),
                ],
            )),
        );
        let (right_tx, right) = live_input(&["a", "c"]);
        let result = join(left, right);
        assert!(result
            .metadata
            .current()
            .variables
            .iter()
            .all(|v| !v.can_be_undef));
        let mut stream = result.stream;

        send(&right_tx, add(&[("a", "1"), ("c", "u")]));
        send(&right_tx, add(&[("a", "2"), ("c", "v")]));
        send(&left_tx, add(&[("b", "x")]));
        send(&left_tx, add(&[("a", "2"), ("b", "y")]));

        insta::assert_snapshot!(sorted(&drain(&mut stream)), @r#"
        + ?a="1" ?b="x" ?c="u"
        + ?a="2" ?b="x" ?c="v"
        + ?a="2" ?b="y" ?c="v"
        "#);
    }

    #[test]
    fn ends_after_both_inputs_ended() {
        let (left_tx, left) = live_input(&["a"]);
        let (right_tx, right) = live_input(&["a"]);
        let mut stream = join(left, right).stream;

        drop(left_tx);
        assert!(drain(&mut stream).is_empty());
        assert!(stream.next().now_or_never().is_none());

        drop(right_tx);
        assert!(block_on(stream.next()).is_none());
    }
}
