use crate::active_graph::ActiveGraph;
use futures::{ready, Stream, StreamExt};
use rdf_delta_common::error::QueryEvaluationError;
use rdf_delta_common::{
    BindingsMetadata, BindingsResult, BindingsStream, BlankNodeMatchingMode, Cardinality,
    DeltaQuadStream, MetadataHandle, MetadataVariable, QuadSource, QueryOperationResult,
};
use rdf_delta_model::{
    BlankNode, Bindings, GraphName, NamedNodePattern, Quad, QuadPattern, Subject, Term,
    TermPattern, TriplePattern, Variable,
};
use std::fmt::{Debug, Formatter};
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::debug;

/// Turns the tagged quads of a [QuadSource] into tagged solutions of a triple pattern.
///
/// Variables that occur multiple times in the pattern must be bound to the same term. Blank nodes
/// either act as variables that do not appear in the solutions or as constants, depending on the
/// [BlankNodeMatchingMode].
pub struct QuadPatternBindingsStream {
    quads: DeltaQuadStream,
    pattern: CompiledPattern,
    active_graph: ActiveGraph,
    metadata: MetadataHandle,
    /// The number of solutions that are currently live.
    live: usize,
    finished: bool,
}

impl QuadPatternBindingsStream {
    /// Matches `pattern` against the quads of `source` that are part of the `active_graph`.
    ///
    /// If `graph_variable` is given, it is bound to the graph of each matching quad.
    pub fn create(
        source: &dyn QuadSource,
        active_graph: ActiveGraph,
        graph_variable: Option<Variable>,
        pattern: &TriplePattern,
        blank_node_mode: BlankNodeMatchingMode,
    ) -> Result<QueryOperationResult, QueryEvaluationError> {
        let compiled = CompiledPattern::new(pattern, graph_variable, blank_node_mode);
        let variables = compiled
            .variables()
            .into_iter()
            .map(MetadataVariable::bound)
            .collect::<Vec<_>>();

        let Some(quad_pattern) = compiled.quad_pattern(pattern, &active_graph) else {
            debug!(%pattern, "Triple pattern can never match");
            let metadata = BindingsMetadata::new(Cardinality::Exact(0), variables);
            return Ok(QueryOperationResult::new(
                BindingsStream::from_bindings(Vec::new()),
                MetadataHandle::new(metadata),
            ));
        };

        let quads = source.match_pattern(quad_pattern)?;
        let cancel_handles = quads.cancel_handles().clone();
        let metadata = MetadataHandle::new(BindingsMetadata::new(
            Cardinality::Estimate(quads.snapshot_len()),
            variables,
        ));

        let stream = Self {
            quads,
            pattern: compiled,
            active_graph,
            metadata: metadata.clone(),
            live: 0,
            finished: false,
        };
        Ok(QueryOperationResult::new(
            BindingsStream::new(stream, cancel_handles),
            metadata,
        ))
    }
}

impl Stream for QuadPatternBindingsStream {
    type Item = BindingsResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if this.finished {
                return Poll::Ready(None);
            }

            let quad = match ready!(this.quads.poll_next_unpin(cx)) {
                None => {
                    this.finished = true;
                    return Poll::Ready(None);
                }
                Some(Err(error)) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(error)));
                }
                Some(Ok(quad)) => quad,
            };

            if !this.active_graph.contains(&quad.quad.graph_name) {
                continue;
            }
            let Some(bindings) = this.pattern.bind(&quad.quad) else {
                continue;
            };

            let is_addition = quad.is_addition();
            this.live = if is_addition {
                this.live + 1
            } else {
                this.live.saturating_sub(1)
            };
            this.metadata
                .update_cardinality(Cardinality::Estimate(this.live));
            return Poll::Ready(Some(Ok(bindings.with_addition(is_addition))));
        }
    }
}

impl Debug for QuadPatternBindingsStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuadPatternBindingsStream")
            .field("pattern", &self.pattern)
            .field("active_graph", &self.active_graph)
            .field("live", &self.live)
            .finish_non_exhaustive()
    }
}

/// What happens with a single component of a matching quad.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Slot {
    /// The component is fixed by the quad pattern.
    Constant,
    Variable(Variable),
    /// A blank node that constrains the match but is not part of the solution.
    Hidden(BlankNode),
}

#[derive(Clone, Debug)]
struct CompiledPattern {
    subject: Slot,
    predicate: Slot,
    object: Slot,
    graph: Slot,
}

impl CompiledPattern {
    fn new(
        pattern: &TriplePattern,
        graph_variable: Option<Variable>,
        blank_node_mode: BlankNodeMatchingMode,
    ) -> Self {
        let term_slot = |term: &TermPattern| match term {
            TermPattern::Variable(variable) => Slot::Variable(variable.clone()),
            TermPattern::BlankNode(node) if blank_node_mode == BlankNodeMatchingMode::Variable => {
                Slot::Hidden(node.clone())
            }
            _ => Slot::Constant,
        };
        let predicate = match &pattern.predicate {
            NamedNodePattern::Variable(variable) => Slot::Variable(variable.clone()),
            NamedNodePattern::NamedNode(_) => Slot::Constant,
        };

        Self {
            subject: term_slot(&pattern.subject),
            predicate,
            object: term_slot(&pattern.object),
            graph: graph_variable.map_or(Slot::Constant, Slot::Variable),
        }
    }

    /// The variables of the solutions, in the order of their first occurrence.
    fn variables(&self) -> Vec<Variable> {
        let mut result = Vec::new();
        for slot in [&self.graph, &self.subject, &self.predicate, &self.object] {
            if let Slot::Variable(variable) = slot {
                if !result.contains(variable) {
                    result.push(variable.clone());
                }
            }
        }
        result
    }

    /// The quad pattern for the source. [None] if the pattern can never match.
    fn quad_pattern(
        &self,
        pattern: &TriplePattern,
        active_graph: &ActiveGraph,
    ) -> Option<QuadPattern> {
        let subject = match (&self.subject, &pattern.subject) {
            (Slot::Constant, TermPattern::NamedNode(node)) => Some(Subject::from(node.clone())),
            (Slot::Constant, TermPattern::BlankNode(node)) => Some(Subject::from(node.clone())),
            (Slot::Constant, _) => return None,
            _ => None,
        };
        let predicate = match &pattern.predicate {
            NamedNodePattern::NamedNode(node) => Some(node.clone()),
            NamedNodePattern::Variable(_) => None,
        };
        let object = match (&self.object, &pattern.object) {
            (Slot::Constant, TermPattern::NamedNode(node)) => Some(Term::from(node.clone())),
            (Slot::Constant, TermPattern::BlankNode(node)) => Some(Term::from(node.clone())),
            (Slot::Constant, TermPattern::Literal(literal)) => Some(Term::from(literal.clone())),
            (Slot::Constant, _) => return None,
            _ => None,
        };

        Some(QuadPattern::new(
            subject,
            predicate,
            object,
            active_graph.graph_pattern(),
        ))
    }

    /// Creates the solution for `quad`. [None] if a repeated variable or blank node would be bound
    /// to two different terms.
    fn bind(&self, quad: &Quad) -> Option<Bindings> {
        let graph = match &quad.graph_name {
            GraphName::NamedNode(node) => Some(Term::from(node.clone())),
            GraphName::BlankNode(node) => Some(Term::from(node.clone())),
            GraphName::DefaultGraph => None,
        };

        let mut bindings = Bindings::empty();
        let mut hidden: Vec<(&BlankNode, Term)> = Vec::new();
        let components = [
            (&self.graph, graph),
            (&self.subject, Some(Term::from(quad.subject.clone()))),
            (&self.predicate, Some(Term::from(quad.predicate.clone()))),
            (&self.object, Some(quad.object.clone())),
        ];

        for (slot, term) in components {
            match slot {
                Slot::Constant => {}
                Slot::Variable(variable) => {
                    // A graph variable never matches the default graph.
                    let term = term?;
                    match bindings.get(variable.as_str()) {
                        Some(existing) if *existing != term => return None,
                        Some(_) => {}
                        None => bindings = bindings.set(variable.clone(), term),
                    }
                }
                Slot::Hidden(node) => {
                    let term = term?;
                    match hidden.iter().find(|(other, _)| *other == node) {
                        Some((_, existing)) if *existing != term => return None,
                        Some(_) => {}
                        None => hidden.push((node, term)),
                    }
                }
            }
        }
        Some(bindings)
    }
}
