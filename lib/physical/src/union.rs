use crate::metadata::{derived, union_variables};
use futures::stream::SelectAll;
use futures::{Stream, StreamExt};
use rdf_delta_common::{
    BindingsResult, BindingsStream, CancelHandles, Cardinality, QueryOperationResult,
};
use std::fmt::{Debug, Formatter};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Merges the solutions of several inputs (`UNION`).
///
/// Each change of an input is a change of the union's multiset, so additions and deletions are
/// passed on as they arrive. The output ends once every input has ended, or with the first error.
pub struct UnionStream {
    inputs: SelectAll<BindingsStream>,
    finished: bool,
}

impl UnionStream {
    /// Merges `inputs`.
    pub fn create(inputs: Vec<QueryOperationResult>) -> QueryOperationResult {
        let metadata = inputs
            .iter()
            .map(|input| input.metadata.current())
            .collect::<Vec<_>>();
        let cardinality = metadata
            .iter()
            .map(|metadata| metadata.cardinality.value())
            .fold(0_usize, usize::saturating_add);
        let variables = union_variables(metadata.iter().map(|m| m.variables.as_slice()));

        let cancel_handles = inputs
            .iter()
            .fold(CancelHandles::new(), |handles, input| {
                handles.merge(input.stream.cancel_handles())
            });
        let stream = Self {
            inputs: futures::stream::select_all(inputs.into_iter().map(|input| input.stream)),
            finished: false,
        };
        QueryOperationResult::new(
            BindingsStream::new(stream, cancel_handles),
            derived(Cardinality::Estimate(cardinality), variables),
        )
    }
}

impl Stream for UnionStream {
    type Item = BindingsResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        let item = futures::ready!(self.inputs.poll_next_unpin(cx));
        if !matches!(item, Some(Ok(_))) {
            self.finished = true;
        }
        Poll::Ready(item)
    }
}

impl Debug for UnionStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnionStream")
            .field("inputs", &self.inputs.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{add, del, drain, live_input, send, static_input, var};
    use futures::executor::block_on;
    use futures::TryStreamExt;

    #[test]
    fn merges_all_inputs() {
        let result = UnionStream::create(vec![
            static_input(&["a"], vec![add(&[("a", "1")]), add(&[("a", "2")])]),
            static_input(&["b"], vec![add(&[("b", "x")])]),
        ]);
        let metadata = result.metadata.current();
        assert!(metadata.can_be_undef(&var("a")));
        assert!(metadata.can_be_undef(&var("b")));

        let mut lines = block_on(result.stream.try_collect::<Vec<_>>())
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        lines.sort();
        insta::assert_snapshot!(lines.join("\n"), @r#"
        + ?a="1"
        + ?a="2"
        + ?b="x"
        "#);
    }

    #[test]
    fn passes_deletions_and_waits_for_all_inputs() {
        let (left_tx, left) = live_input(&["a"]);
        let (right_tx, right) = live_input(&["a"]);
        let mut stream = UnionStream::create(vec![left, right]).stream;

        send(&left_tx, add(&[("a", "1")]));
        send(&right_tx, del(&[("a", "1")]));
        assert_eq!(drain(&mut stream).len(), 2);

        drop(left_tx);
        assert!(drain(&mut stream).is_empty());
        drop(right_tx);
        assert!(block_on(stream.next()).is_none());
    }
}
