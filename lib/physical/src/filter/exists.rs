use crate::metadata::{at_most, derived, shared_variables};
use futures::{Stream, StreamExt};
use rdf_delta_common::error::ContractViolation;
use rdf_delta_common::{BindingsResult, BindingsStream, QueryOperationResult};
use rdf_delta_model::{Bindings, Variable};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::fmt::{Debug, Formatter};
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{debug, trace};

/// Filters solutions by whether a pattern has a compatible solution (`EXISTS`) or not
/// (`NOT EXISTS`).
///
/// The pattern is evaluated once as the *inner* stream. Its live solutions are counted per value
/// of the variables it shares with the *outer* stream. Outer solutions with the same shared
/// values form a group that is either visible or not. Whenever the visibility of a group changes,
/// all live copies of its solutions are added or retracted.
///
/// Changes of the inner stream are processed before those of the outer stream. Deletions of
/// inner solutions that are not live are ignored.
pub struct ExistsFilterStream {
    outer: BindingsStream,
    inner: BindingsStream,
    outer_done: bool,
    inner_done: bool,
    negated: bool,
    index: InnerIndex,
    groups: FxHashMap<Bindings, OuterGroup>,
    /// The number of groups whose key leaves a shared variable unbound.
    partial_groups: usize,
    output: VecDeque<Bindings>,
    finished: bool,
}

impl ExistsFilterStream {
    /// Filters `outer` by the existence of compatible solutions in `inner`. Inverts the condition
    /// if `negated` is set.
    pub fn create(
        outer: QueryOperationResult,
        inner: QueryOperationResult,
        negated: bool,
    ) -> QueryOperationResult {
        let outer_metadata = outer.metadata.current();
        let shared = shared_variables(&outer_metadata, &inner.metadata.current());
        debug!(?shared, negated, "Creating existence filter");

        let metadata = derived(
            at_most(outer_metadata.cardinality),
            outer_metadata.variables,
        );
        let cancel_handles = outer
            .stream
            .cancel_handles()
            .clone()
            .merge(inner.stream.cancel_handles());

        let stream = Self {
            outer: outer.stream,
            inner: inner.stream,
            outer_done: false,
            inner_done: false,
            negated,
            index: InnerIndex {
                shared,
                keys: FxHashMap::default(),
                partial: 0,
            },
            groups: FxHashMap::default(),
            partial_groups: 0,
            output: VecDeque::new(),
            finished: false,
        };
        QueryOperationResult::new(BindingsStream::new(stream, cancel_handles), metadata)
    }

    fn process_outer(&mut self, bindings: Bindings) -> Result<(), ContractViolation> {
        let key = self.index.key(&bindings);
        let is_addition = bindings.is_addition();

        if is_addition {
            if !self.groups.contains_key(&key) && !self.index.is_full(&key) {
                self.partial_groups += 1;
            }
            let index = &self.index;
            let group = self
                .groups
                .entry(key)
                .or_insert_with_key(|key| OuterGroup::new(index.matches(key)));
            match group.solutions.iter_mut().find(|(other, _)| *other == bindings) {
                Some((_, count)) => *count += 1,
                None => group.solutions.push((bindings.clone(), 1)),
            }
            if group.is_visible(self.negated) {
                self.output.push_back(bindings);
            }
            return Ok(());
        }

        let unmatched = || ContractViolation::UnmatchedDeletion {
            operator: "ExistsFilter",
            bindings: bindings.to_string(),
        };
        let group = self.groups.get_mut(&key).ok_or_else(unmatched)?;
        let position = group
            .solutions
            .iter()
            .position(|(other, _)| *other == bindings)
            .ok_or_else(unmatched)?;

        if group.is_visible(self.negated) {
            self.output.push_back(bindings.clone());
        }
        group.solutions[position].1 -= 1;
        if group.solutions[position].1 == 0 {
            group.solutions.swap_remove(position);
        }
        if group.solutions.is_empty() {
            self.groups.remove(&key);
            if !self.index.is_full(&key) {
                self.partial_groups -= 1;
            }
        }
        Ok(())
    }

    fn process_inner(&mut self, bindings: &Bindings) {
        let key = self.index.key(bindings);
        let full = self.index.is_full(&key);

        if bindings.is_addition() {
            let count = self.index.keys.entry(key.clone()).or_insert(0);
            *count += 1;
            if *count == 1 && !full {
                self.index.partial += 1;
            }
        } else {
            let Some(count) = self.index.keys.get_mut(&key) else {
                trace!(%bindings, "Ignoring the deletion of an inner solution that is not live");
                return;
            };
            *count -= 1;
            if *count == 0 {
                self.index.keys.remove(&key);
                if !full {
                    self.index.partial -= 1;
                }
            }
        }

        let increment = bindings.is_addition();
        if full && self.partial_groups == 0 {
            if let Some(group) = self.groups.get_mut(&key) {
                group.adjust(increment, self.negated, &mut self.output);
            }
        } else {
            for (group_key, group) in &mut self.groups {
                if group_key.is_compatible(&key) {
                    group.adjust(increment, self.negated, &mut self.output);
                }
            }
        }
    }
}

impl Stream for ExistsFilterStream {
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

            if !this.inner_done {
                match this.inner.poll_next_unpin(cx) {
                    Poll::Ready(Some(Ok(bindings))) => {
                        this.process_inner(&bindings);
                        continue;
                    }
                    Poll::Ready(Some(Err(error))) => {
                        this.finished = true;
                        return Poll::Ready(Some(Err(error)));
                    }
                    Poll::Ready(None) => {
                        this.inner_done = true;
                        continue;
                    }
                    Poll::Pending => {}
                }
            }

            if !this.outer_done {
                match this.outer.poll_next_unpin(cx) {
                    Poll::Ready(Some(Ok(bindings))) => {
                        if let Err(violation) = this.process_outer(bindings) {
                            this.finished = true;
                            this.output.clear();
                            return Poll::Ready(Some(Err(violation.into())));
                        }
                        continue;
                    }
                    Poll::Ready(Some(Err(error))) => {
                        this.finished = true;
                        return Poll::Ready(Some(Err(error)));
                    }
                    Poll::Ready(None) => {
                        this.outer_done = true;
                        continue;
                    }
                    Poll::Pending => {}
                }
            }

            if this.inner_done && this.outer_done {
                this.finished = true;
                continue;
            }
            return Poll::Pending;
        }
    }
}

impl Debug for ExistsFilterStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExistsFilterStream")
            .field("shared", &self.index.shared)
            .field("negated", &self.negated)
            .field("groups", &self.groups.len())
            .finish_non_exhaustive()
    }
}

/// The live inner solutions, projected to the shared variables.
#[derive(Debug)]
struct InnerIndex {
    shared: Vec<Variable>,
    keys: FxHashMap<Bindings, usize>,
    /// The number of keys that leave a shared variable unbound.
    partial: usize,
}

impl InnerIndex {
    fn key(&self, bindings: &Bindings) -> Bindings {
        bindings.project(&self.shared).with_addition(true)
    }

    fn is_full(&self, key: &Bindings) -> bool {
        key.len() == self.shared.len()
    }

    /// The number of live inner solutions that are compatible with `key`.
    fn matches(&self, key: &Bindings) -> usize {
        if self.is_full(key) && self.partial == 0 {
            return self.keys.get(key).copied().unwrap_or(0);
        }
        self.keys
            .iter()
            .filter(|(inner, _)| inner.is_compatible(key))
            .map(|(_, count)| *count)
            .sum()
    }
}

/// The outer solutions that share the same values for the shared variables.
#[derive(Debug)]
struct OuterGroup {
    /// The number of compatible inner solutions.
    matches: usize,
    solutions: Vec<(Bindings, usize)>,
}

impl OuterGroup {
    fn new(matches: usize) -> Self {
        Self {
            matches,
            solutions: Vec::new(),
        }
    }

    fn is_visible(&self, negated: bool) -> bool {
        (self.matches > 0) != negated
    }

    /// Applies a change of a compatible inner solution and emits the resulting changes.
    fn adjust(&mut self, increment: bool, negated: bool, output: &mut VecDeque<Bindings>) {
        let was_visible = self.is_visible(negated);
        if increment {
            self.matches += 1;
        } else {
            self.matches = self.matches.saturating_sub(1);
        }

        let visible = self.is_visible(negated);
        if was_visible == visible {
            return;
        }
        for (bindings, count) in &self.solutions {
            let change = bindings.clone().with_addition(visible);
            output.extend(std::iter::repeat(change).take(*count));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{add, del, drain, live_input, render, send, static_input};
    use futures::executor::block_on;
    use futures::TryStreamExt;

    #[test]
    fn passes_solutions_with_matches() {
        let outer = static_input(
            &["a"],
            vec![add(&[("a", "1")]), add(&[("a", "2")]), add(&[("a", "3")])],
        );
        let inner = static_input(&["a"], vec![add(&[("a", "1")]), add(&[("a", "3")])]);

        let stream = ExistsFilterStream::create(outer, inner, false).stream;
        let result = block_on(stream.try_collect::<Vec<_>>()).unwrap();
        insta::assert_snapshot!(render(&result), @r#"
        + ?a="1"
        + ?a="3"
        "#);
    }

    #[test]
    fn outer_changes_pass_while_a_match_exists() {
        let (outer_tx, outer) = live_input(&["a"]);
        let (inner_tx, inner) = live_input(&["a"]);
        let mut stream = ExistsFilterStream::create(outer, inner, false).stream;

        send(&inner_tx, add(&[("a", "1")]));
        let changes = [
            add(&[("a", "1")]),
            del(&[("a", "1")]),
            add(&[("a", "1")]),
            add(&[("a", "1")]),
            add(&[("a", "1")]),
            del(&[("a", "1")]),
        ];
        for change in &changes {
            send(&outer_tx, change.clone());
        }

        assert_eq!(render(&drain(&mut stream)), render(&changes));
    }

    #[test]
    fn inner_changes_flip_visibility() {
        let (outer_tx, outer) = live_input(&["a"]);
        let (inner_tx, inner) = live_input(&["a"]);
        let mut stream = ExistsFilterStream::create(outer, inner, false).stream;

        send(&outer_tx, add(&[("a", "1")]));
        send(&outer_tx, add(&[("a", "1")]));
        send(&outer_tx, add(&[("a", "2")]));
        assert!(drain(&mut stream).is_empty());

        send(&inner_tx, add(&[("a", "1")]));
        send(&inner_tx, add(&[("a", "1")]));
        insta::assert_snapshot!(render(&drain(&mut stream)), @r#"
        + ?a="1"
        + ?a="1"
        "#);

        send(&inner_tx, del(&[("a", "1")]));
        assert!(drain(&mut stream).is_empty());

        send(&inner_tx, del(&[("a", "1")]));
        insta::assert_snapshot!(render(&drain(&mut stream)), @r#"
        - ?a="1"
        - ?a="1"
        "#);
    }

    #[test]
    fn not_exists_inverts_visibility() {
        let (outer_tx, outer) = live_input(&["a"]);
        let (inner_tx, inner) = live_input(&["a"]);
        let mut stream = ExistsFilterStream::create(outer, inner, true).stream;

        send(&outer_tx, add(&[("a", "1")]));
        send(&outer_tx, add(&[("a", "2")]));
        insta::assert_snapshot!(render(&drain(&mut stream)), @r#"
        + ?a="1"
        + ?a="2"
        "#);

        send(&inner_tx, add(&[("a", "1")]));
        insta::assert_snapshot!(render(&drain(&mut stream)), @r#"- ?a="1""#);

        send(&inner_tx, del(&[("a", "1")]));
        insta::assert_snapshot!(render(&drain(&mut stream)), @r#"+ ?a="1""#);

        // Retracting an invisible solution emits nothing.
        send(&inner_tx, add(&[("a", "2")]));
        send(&outer_tx, del(&[("a", "2")]));
        insta::assert_snapshot!(render(&drain(&mut stream)), @r#"- ?a="2""#);
    }

    #[test]
    fn inner_only_deletions_are_ignored() {
        let outer = static_input(&["a"], vec![add(&[("a", "1")])]);
        let inner = static_input(&["a"], vec![del(&[("a", "1")])]);

        let stream = ExistsFilterStream::create(outer, inner, false).stream;
        assert!(block_on(stream.try_collect::<Vec<_>>()).unwrap().is_empty());
    }

    #[test]
    fn groups_by_shared_variables() {
        let (outer_tx, outer) = live_input(&["a", "b"]);
        let (inner_tx, inner) = live_input(&["a", "c"]);
        let mut stream = ExistsFilterStream::create(outer, inner, false).stream;

        send(&outer_tx, add(&[("a", "1"), ("b", "x")]));
        send(&outer_tx, add(&[("a", "1"), ("b", "y")]));
        send(&outer_tx, add(&[("a", "2"), ("b", "z")]));
        send(&inner_tx, add(&[("a", "1"), ("c", "u")]));

        let mut lines = drain(&mut stream)
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        lines.sort();
        insta::assert_snapshot!(lines.join("\n"), @r#"
        + ?a="1" ?b="x"
        + ?a="1" ?b="y"
        "#);
    }

    #[test]
    fn without_shared_variables_any_match_counts() {
        let (outer_tx, outer) = live_input(&["a"]);
        let (inner_tx, inner) = live_input(&["c"]);
        let mut stream = ExistsFilterStream::create(outer, inner, false).stream;

        send(&outer_tx, add(&[("a", "1")]));
        assert!(drain(&mut stream).is_empty());

        send(&inner_tx, add(&[("c", "u")]));
        insta::assert_snapshot!(render(&drain(&mut stream)), @r#"+ ?a="1""#);
    }

    #[test]
    fn unmatched_outer_deletion_fails() {
        let outer = static_input(&["a"], vec![del(&[("a", "1")])]);
        let inner = static_input(&["a"], Vec::new());

        let stream = ExistsFilterStream::create(outer, inner, true).stream;
        let error = block_on(stream.try_collect::<Vec<_>>()).unwrap_err();
        assert!(error.to_string().starts_with("ExistsFilter received a deletion"));
    }
}
