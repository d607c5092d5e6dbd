use crate::metadata::{at_most, derived};
use futures::{Stream, StreamExt};
use rdf_delta_common::error::{ContractViolation, QueryEvaluationError};
use rdf_delta_common::{
    BindingsResult, BindingsStream, Cardinality, MetadataVariable, QueryOperationResult,
};
use rdf_delta_functions::{AggregateEvaluator, AggregateResult, AggregatorFactory};
use rdf_delta_model::{Bindings, Term, Variable};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::fmt::{Debug, Formatter};
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{debug, trace};

/// Groups solutions and maintains aggregates per group.
///
/// Every group has at most one visible row that binds the group variables and the aggregate
/// variables. If an aggregate of a group changes, the old row is retracted and the new row is
/// added. Once the last solution of a group is deleted, its row is retracted.
///
/// Changes are collected until the input has no more solutions ready, such that a batch of
/// solutions produces at most one new row per group.
///
/// Without group variables, all solutions belong to a single implicit group. Its row exists from
/// the start and binds the aggregates over zero solutions.
pub struct GroupStream {
    input: BindingsStream,
    input_done: bool,
    group_variables: Vec<Variable>,
    aggregates: Vec<(Variable, AggregatorFactory)>,
    groups: FxHashMap<Bindings, Group>,
    /// The keys of the groups that changed since the last flush, in order of their first change.
    dirty: Vec<Bindings>,
    output: VecDeque<Bindings>,
    finished: bool,
}

struct Group {
    /// The number of live solutions.
    count: usize,
    evaluators: Vec<AggregateEvaluator>,
    values: Vec<Option<Term>>,
    /// The currently visible row.
    row: Option<Bindings>,
    dirty: bool,
}

impl GroupStream {
    /// Groups `input` by `group_variables` and binds each aggregate to its variable.
    ///
    /// Fails if the implicit group has an aggregate without a value over zero solutions in strict
    /// mode.
    pub fn create(
        input: QueryOperationResult,
        group_variables: Vec<Variable>,
        aggregates: Vec<(Variable, AggregatorFactory)>,
    ) -> Result<QueryOperationResult, QueryEvaluationError> {
        let input_metadata = input.metadata.current();
        debug!(?group_variables, aggregates = aggregates.len(), "Creating group");

        let variables = group_variables
            .iter()
            .map(|variable| {
                if input_metadata.can_be_undef(variable) {
                    MetadataVariable::maybe_undef(variable.clone())
                } else {
                    MetadataVariable::bound(variable.clone())
                }
            })
            .chain(
                aggregates
                    .iter()
                    .map(|(variable, _)| MetadataVariable::maybe_undef(variable.clone())),
            )
            .collect();
        let cardinality = if group_variables.is_empty() {
            Cardinality::Exact(1)
        } else {
            at_most(input_metadata.cardinality)
        };
        let cancel_handles = input.stream.cancel_handles().clone();

        let mut stream = Self {
            input: input.stream,
            input_done: false,
            group_variables,
            aggregates,
            groups: FxHashMap::default(),
            dirty: Vec::new(),
            output: VecDeque::new(),
            finished: false,
        };
        if stream.group_variables.is_empty() {
            let group = stream.empty_group()?;
            if let Some(row) = &group.row {
                stream.output.push_back(row.clone());
            }
            stream.groups.insert(Bindings::empty(), group);
        }

        Ok(QueryOperationResult::new(
            BindingsStream::new(stream, cancel_handles),
            derived(cardinality, variables),
        ))
    }

    fn new_group(&self) -> Group {
        Group {
            count: 0,
            evaluators: self.aggregates.iter().map(|(_, f)| f.create()).collect(),
            values: vec![None; self.aggregates.len()],
            row: None,
            dirty: false,
        }
    }

    /// The implicit group without solutions.
    fn empty_group(&self) -> Result<Group, QueryEvaluationError> {
        let mut group = self.new_group();
        group.values = group
            .evaluators
            .iter()
            .map(AggregateEvaluator::empty_value)
            .collect::<Result<_, _>>()?;
        group.row = Some(self.row(&Bindings::empty(), &group.values));
        Ok(group)
    }

    fn row(&self, key: &Bindings, values: &[Option<Term>]) -> Bindings {
        self.aggregates
            .iter()
            .zip(values)
            .fold(key.clone(), |row, ((variable, _), value)| match value {
                Some(value) => row.set(variable.clone(), value.clone()),
                None => row,
            })
    }

    fn process(&mut self, bindings: &Bindings) -> Result<(), QueryEvaluationError> {
        let key = bindings.project(&self.group_variables).with_addition(true);

        if bindings.is_addition() && !self.groups.contains_key(&key) {
            let group = self.new_group();
            self.groups.insert(key.clone(), group);
        }
        let group = match self.groups.get_mut(&key) {
            Some(group) if bindings.is_addition() || group.count > 0 => group,
            _ => {
                return Err(ContractViolation::UnmatchedDeletion {
                    operator: "Group",
                    bindings: bindings.to_string(),
                }
                .into())
            }
        };

        if bindings.is_addition() {
            group.count += 1;
        } else {
            group.count -= 1;
        }
        for evaluator in &mut group.evaluators {
            evaluator.put_bindings(bindings)?;
        }
        if !group.dirty {
            group.dirty = true;
            self.dirty.push(key);
        }
        Ok(())
    }

    /// Emits the new rows of all changed groups.
    fn flush(&mut self) -> Result<(), QueryEvaluationError> {
        if self.dirty.is_empty() {
            return Ok(());
        }
        trace!(groups = self.dirty.len(), "Flushing changed groups");
        for key in std::mem::take(&mut self.dirty) {
            let Some(mut group) = self.groups.remove(&key) else {
                continue;
            };
            group.dirty = false;

            if group.count == 0 {
                if !self.group_variables.is_empty() {
                    if let Some(row) = group.row {
                        self.output.push_back(row.with_addition(false));
                    }
                    continue;
                }
                let old_row = group.row.take();
                group = self.empty_group()?;
                self.replace_row(old_row, group.row.clone());
                self.groups.insert(key, group);
                continue;
            }

            for (evaluator, value) in group.evaluators.iter_mut().zip(&mut group.values) {
                match evaluator.result() {
                    AggregateResult::Unchanged => {}
                    AggregateResult::Changed(new_value) => *value = new_value,
                    AggregateResult::Error => *value = None,
                }
            }
            let new_row = Some(self.row(&key, &group.values));
            let old_row = std::mem::replace(&mut group.row, new_row.clone());
            self.replace_row(old_row, new_row);
            self.groups.insert(key, group);
        }
        Ok(())
    }

    fn replace_row(&mut self, old_row: Option<Bindings>, new_row: Option<Bindings>) {
        if old_row == new_row {
            return;
        }
        if let Some(old_row) = old_row {
            self.output.push_back(old_row.with_addition(false));
        }
        if let Some(new_row) = new_row {
            self.output.push_back(new_row);
        }
    }

    fn fail(&mut self, error: QueryEvaluationError) -> Poll<Option<BindingsResult>> {
        self.finished = true;
        self.output.clear();
        Poll::Ready(Some(Err(error)))
    }
}

impl Stream for GroupStream {
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
            if this.input_done {
                this.finished = true;
                continue;
            }

            match this.input.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(bindings))) => {
                    if let Err(error) = this.process(&bindings) {
                        return this.fail(error);
                    }
                }
                Poll::Ready(Some(Err(error))) => return this.fail(error),
                Poll::Ready(None) => {
                    this.input_done = true;
                    if let Err(error) = this.flush() {
                        return this.fail(error);
                    }
                }
                Poll::Pending => {
                    if let Err(error) = this.flush() {
                        return this.fail(error);
                    }
                    if this.output.is_empty() {
                        return Poll::Pending;
                    }
                }
            }
        }
    }
}

impl Debug for GroupStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupStream")
            .field("group_variables", &self.group_variables)
            .field("groups", &self.groups.len())
            .finish_non_exhaustive()
    }
}
