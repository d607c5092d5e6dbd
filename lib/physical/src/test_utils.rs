use futures::channel::mpsc::{unbounded, UnboundedSender};
use futures::{FutureExt, StreamExt};
use rdf_delta_common::{
    BindingsMetadata, BindingsResult, BindingsStream, Cardinality, CancelHandles, MetadataHandle,
    MetadataVariable, QueryOperationResult,
};
use rdf_delta_model::{Bindings, Literal, Term, Variable};

pub(crate) fn var(name: &str) -> Variable {
    Variable::new_unchecked(name)
}

pub(crate) fn lit(value: &str) -> Term {
    Literal::new_simple_literal(value).into()
}

pub(crate) fn add(entries: &[(&str, &str)]) -> Bindings {
    entries
        .iter()
        .map(|(name, value)| (var(name), lit(value)))
        .collect()
}

pub(crate) fn del(entries: &[(&str, &str)]) -> Bindings {
    add(entries).with_addition(false)
}

pub(crate) fn metadata(variables: &[&str]) -> MetadataHandle {
    MetadataHandle::new(BindingsMetadata::new(
        Cardinality::Exact(0),
        variables
            .iter()
            .map(|name| MetadataVariable::bound(var(name)))
            .collect(),
    ))
}

/// An input that emits `items` and ends.
pub(crate) fn static_input(variables: &[&str], items: Vec<Bindings>) -> QueryOperationResult {
    QueryOperationResult::new(BindingsStream::from_bindings(items), metadata(variables))
}

/// An input that stays open until the returned sender is dropped.
pub(crate) fn live_input(
    variables: &[&str],
) -> (UnboundedSender<BindingsResult>, QueryOperationResult) {
    let (sender, receiver) = unbounded();
    let stream = BindingsStream::new(receiver, CancelHandles::new());
    (sender, QueryOperationResult::new(stream, metadata(variables)))
}

pub(crate) fn send(sender: &UnboundedSender<BindingsResult>, bindings: Bindings) {
    sender.unbounded_send(Ok(bindings)).unwrap();
}

/// Collects all solutions that are ready without waiting.
pub(crate) fn drain(stream: &mut BindingsStream) -> Vec<Bindings> {
    let mut result = Vec::new();
    while let Some(Some(item)) = stream.next().now_or_never() {
        result.push(item.unwrap());
    }
    result
}

/// Renders one solution per line.
pub(crate) fn render(items: &[Bindings]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
