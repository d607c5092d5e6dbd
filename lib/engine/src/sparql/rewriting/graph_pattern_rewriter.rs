use crate::sparql::rewriting::expression_rewriter::{
    filter_conditions, rewrite_expression, FilterCondition,
};
use crate::QueryOptions;
use itertools::Itertools;
use rdf_delta_common::error::QueryEvaluationError;
use rdf_delta_common::{
    BindingsHasher, BlankNodeMatchingMode, FxBindingsHasher, QuadSource, QueryOperationResult,
};
use rdf_delta_functions::AggregatorFactory;
use rdf_delta_model::{BlankNode, NamedNodePattern, TermPattern, TriplePattern, Variable};
use rdf_delta_physical::{
    ActiveGraph, DistinctStream, ExistsFilterStream, ExtendStream, FilterStream, GroupStream,
    HashJoinStream, ProjectStream, QuadPatternBindingsStream, UnionStream, ValuesStream,
};
use spargebra::algebra::{AggregateExpression, GraphPattern};
use std::cell::RefCell;
use std::sync::Arc;
use tracing::debug;

/// The prefix of the variables that replace blank nodes which are shared by several triple
/// patterns. Parsed queries cannot contain variables with this prefix.
const HIDDEN_VARIABLE_PREFIX: &str = "-bnode-";

/// Translates a SPARQL [GraphPattern] into a tree of incremental operators.
///
/// Every triple pattern opens a live pattern stream on the [QuadSource]. The whole pattern is
/// checked before the first stream is opened, such that an unsupported query does not register
/// (and release) any listener.
pub struct GraphPatternRewriter<'source> {
    source: &'source dyn QuadSource,
    options: QueryOptions,
    hasher: Arc<dyn BindingsHasher>,
    state: RefCell<RewritingState>,
}

impl<'source> GraphPatternRewriter<'source> {
    /// Creates a new rewriter that evaluates patterns against `source`.
    pub fn new(source: &'source dyn QuadSource, options: QueryOptions) -> Self {
        let active_graph = if options.default_graph_as_union {
            ActiveGraph::AllGraphs
        } else {
            ActiveGraph::DefaultGraph
        };
        Self {
            source,
            options,
            hasher: Arc::new(FxBindingsHasher),
            state: RefCell::new(RewritingState {
                active_graph,
                graph_variable: None,
            }),
        }
    }

    /// Sets up the operators for `pattern`.
    pub fn rewrite(
        &self,
        pattern: &GraphPattern,
    ) -> Result<QueryOperationResult, QueryEvaluationError> {
        self.ensure_supported(pattern, false)?;
        self.rewrite_graph_pattern(pattern)
    }

    fn rewrite_graph_pattern(
        &self,
        pattern: &GraphPattern,
    ) -> Result<QueryOperationResult, QueryEvaluationError> {
        match pattern {
            GraphPattern::Bgp { patterns } => self.rewrite_bgp(patterns),
            GraphPattern::Project { inner, variables } => {
                if self.graph_variable_goes_out_of_scope(variables) {
                    let old_state = self.state.borrow().clone();
                    self.state.replace(old_state.clone().without_graph_variable());
                    let inner = self.rewrite_graph_pattern(inner);
                    self.state.replace(old_state);
                    Ok(ProjectStream::create(inner?, variables.clone()))
                } else {
                    let inner = self.rewrite_graph_pattern(inner)?;
                    Ok(ProjectStream::create(inner, variables.clone()))
                }
            }
            GraphPattern::Filter { inner, expr } => {
                let inner = self.rewrite_graph_pattern(inner)?;
                filter_conditions(expr)
                    .into_iter()
                    .try_fold(inner, |inner, condition| match condition {
                        FilterCondition::Exists { pattern, negated } => {
                            let pattern = self.rewrite_graph_pattern(pattern)?;
                            Ok(ExistsFilterStream::create(inner, pattern, negated))
                        }
                        FilterCondition::Expression(expression) => Ok(FilterStream::create(
                            inner,
                            rewrite_expression(expression)?,
                        )),
                    })
            }
            GraphPattern::Extend {
                inner,
                variable,
                expression,
            } => {
                let inner = self.rewrite_graph_pattern(inner)?;
                Ok(ExtendStream::create(
                    inner,
                    variable.clone(),
                    rewrite_expression(expression)?,
                ))
            }
            GraphPattern::Values {
                variables,
                bindings,
            } => Ok(ValuesStream::create(variables, bindings)),
            GraphPattern::Join { left, right } => {
                let left = self.rewrite_graph_pattern(left)?;
                let right = self.rewrite_graph_pattern(right)?;
                Ok(HashJoinStream::create(left, right, Arc::clone(&self.hasher)))
            }
            GraphPattern::Union { .. } => {
                let mut inputs = Vec::new();
                self.rewrite_union_members(pattern, &mut inputs)?;
                Ok(UnionStream::create(inputs))
            }
            GraphPattern::Distinct { inner } | GraphPattern::Reduced { inner } => {
                let inner = self.rewrite_graph_pattern(inner)?;
                Ok(DistinctStream::create(inner, Arc::clone(&self.hasher)))
            }
            GraphPattern::OrderBy { inner, .. } => {
                debug!("Solution changes are not ordered, ignoring ORDER BY");
                self.rewrite_graph_pattern(inner)
            }
            GraphPattern::Graph { name, inner } => {
                let old_state = self.state.borrow().clone();
                let new_state = match name {
                    NamedNodePattern::NamedNode(nn) => old_state
                        .clone()
                        .with_active_graph(ActiveGraph::NamedGraph(nn.clone())),
                    NamedNodePattern::Variable(variable) => old_state
                        .clone()
                        .with_active_graph(ActiveGraph::AnyNamedGraph)
                        .with_graph_variable(variable.clone()),
                };
                self.state.replace(new_state);
                let result = self.rewrite_graph_pattern(inner);
                self.state.replace(old_state);
                result
            }
            GraphPattern::Group {
                inner,
                variables,
                aggregates,
            } => {
                let inner = self.rewrite_graph_pattern(inner)?;
                let aggregates = aggregates
                    .iter()
                    .map(|(variable, aggregate)| {
                        Ok((variable.clone(), self.rewrite_aggregate(aggregate)?))
                    })
                    .collect::<Result<Vec<_>, QueryEvaluationError>>()?;
                GroupStream::create(inner, variables.clone(), aggregates)
            }
            GraphPattern::Slice { .. }
            | GraphPattern::LeftJoin { .. }
            | GraphPattern::Minus { .. }
            | GraphPattern::Path { .. }
            | GraphPattern::Service { .. } => unsupported(pattern),
        }
    }

    /// Evaluates each triple pattern and joins the results.
    fn rewrite_bgp(
        &self,
        patterns: &[TriplePattern],
    ) -> Result<QueryOperationResult, QueryEvaluationError> {
        let state = self.state.borrow().clone();
        let shared = self.shared_blank_nodes(patterns);

        let mut results = patterns
            .iter()
            .map(|pattern| {
                QuadPatternBindingsStream::create(
                    self.source,
                    state.active_graph.clone(),
                    state.graph_variable.clone(),
                    &hide_blank_nodes(pattern, &shared),
                    self.options.blank_node_mode,
                )
            })
            .collect::<Result<Vec<_>, _>>()?
            .into_iter();

        let Some(first) = results.next() else {
            return Ok(ValuesStream::create(&[], &[Vec::new()]));
        };
        let joined = results.fold(first, |left, right| {
            HashJoinStream::create(left, right, Arc::clone(&self.hasher))
        });
        if shared.is_empty() {
            return Ok(joined);
        }

        let visible = joined
            .metadata
            .current()
            .variable_names()
            .into_iter()
            .filter(|variable| !variable.as_str().starts_with(HIDDEN_VARIABLE_PREFIX))
            .collect();
        Ok(ProjectStream::create(joined, visible))
    }

    /// Returns the blank nodes that connect several triple patterns. Blank nodes that only appear
    /// once are matched within their triple pattern.
    fn shared_blank_nodes(&self, patterns: &[TriplePattern]) -> Vec<BlankNode> {
        if self.options.blank_node_mode == BlankNodeMatchingMode::Filter {
            return Vec::new();
        }
        patterns
            .iter()
            .flat_map(|pattern| [&pattern.subject, &pattern.object])
            .filter_map(|term| match term {
                TermPattern::BlankNode(node) => Some(node),
                _ => None,
            })
            .counts()
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(node, _)| node.clone())
            .collect()
    }

    fn rewrite_union_members(
        &self,
        pattern: &GraphPattern,
        inputs: &mut Vec<QueryOperationResult>,
    ) -> Result<(), QueryEvaluationError> {
        match pattern {
            GraphPattern::Union { left, right } => {
                self.rewrite_union_members(left, inputs)?;
                self.rewrite_union_members(right, inputs)
            }
            _ => {
                inputs.push(self.rewrite_graph_pattern(pattern)?);
                Ok(())
            }
        }
    }

    /// Rewrites an [AggregateExpression].
    fn rewrite_aggregate(
        &self,
        aggregate: &AggregateExpression,
    ) -> Result<AggregatorFactory, QueryEvaluationError> {
        AggregatorFactory::try_new(aggregate, self.options.aggregate_error_mode)
    }

    /// Checks whether a potential variable in the GRAPH pattern goes out of scope. This is the case
    /// if it either already is out of scope or if the variable is not projected to the outer
    /// query.
    fn graph_variable_goes_out_of_scope(&self, variables: &[Variable]) -> bool {
        self.state
            .borrow()
            .graph_variable
            .as_ref()
            .is_some_and(|v| !variables.contains(v))
    }

    /// Fails if `pattern` uses a construct that cannot be evaluated incrementally.
    ///
    /// Existence filters are only supported at the top level. An existence filter inside the
    /// pattern of another one could refer to variables of the outermost pattern, which the inner
    /// filter cannot see.
    fn ensure_supported(
        &self,
        pattern: &GraphPattern,
        inside_exists: bool,
    ) -> Result<(), QueryEvaluationError> {
        match pattern {
            GraphPattern::Bgp { .. } | GraphPattern::Values { .. } => Ok(()),
            GraphPattern::Project { inner, .. }
            | GraphPattern::Distinct { inner }
            | GraphPattern::Reduced { inner }
            | GraphPattern::OrderBy { inner, .. }
            | GraphPattern::Graph { inner, .. } => self.ensure_supported(inner, inside_exists),
            GraphPattern::Join { left, right } | GraphPattern::Union { left, right } => {
                self.ensure_supported(left, inside_exists)?;
                self.ensure_supported(right, inside_exists)
            }
            GraphPattern::Filter { inner, expr } => {
                self.ensure_supported(inner, inside_exists)?;
                for condition in filter_conditions(expr) {
                    match condition {
                        FilterCondition::Exists { .. } if inside_exists => {
                            return QueryEvaluationError::not_implemented(
                                "Nested existence filters are currently not supported.",
                            );
                        }
                        FilterCondition::Exists { pattern, .. } => {
                            self.ensure_supported(pattern, true)?;
                        }
                        FilterCondition::Expression(expression) => {
                            rewrite_expression(expression)?;
                        }
                    }
                }
                Ok(())
            }
            GraphPattern::Extend {
                inner, expression, ..
            } => {
                self.ensure_supported(inner, inside_exists)?;
                rewrite_expression(expression)?;
                Ok(())
            }
            GraphPattern::Group {
                inner,
                variables,
                aggregates,
            } => {
                self.ensure_supported(inner, inside_exists)?;
                for (_, aggregate) in aggregates {
                    let factory = self.rewrite_aggregate(aggregate)?;
                    if variables.is_empty() {
                        factory.create().empty_value()?;
                    }
                }
                Ok(())
            }
            GraphPattern::Slice { .. }
            | GraphPattern::LeftJoin { .. }
            | GraphPattern::Minus { .. }
            | GraphPattern::Path { .. }
            | GraphPattern::Service { .. } => unsupported(pattern),
        }
    }
}

#[derive(Clone, Debug)]
struct RewritingState {
    /// Currently active graph.
    active_graph: ActiveGraph,
    /// Indicates whether the graph should be bound to a variable.
    graph_variable: Option<Variable>,
}

impl RewritingState {
    fn with_graph_variable(self, variable: Variable) -> RewritingState {
        RewritingState {
            graph_variable: Some(variable),
            ..self
        }
    }

    fn without_graph_variable(self) -> RewritingState {
        RewritingState {
            graph_variable: None,
            ..self
        }
    }

    fn with_active_graph(self, active_graph: ActiveGraph) -> RewritingState {
        RewritingState {
            graph_variable: None,
            active_graph,
        }
    }
}

fn unsupported<T>(pattern: &GraphPattern) -> Result<T, QueryEvaluationError> {
    let feature = match pattern {
        GraphPattern::Slice { .. } => "LIMIT and OFFSET",
        GraphPattern::LeftJoin { .. } => "OPTIONAL",
        GraphPattern::Minus { .. } => "MINUS",
        GraphPattern::Path { .. } => "Property paths",
        GraphPattern::Service { .. } => "SERVICE",
        _ => "This graph pattern",
    };
    QueryEvaluationError::not_implemented(format!("{feature} cannot be evaluated incrementally"))
}

/// Replaces the `shared` blank nodes of `pattern` with hidden variables.
fn hide_blank_nodes(pattern: &TriplePattern, shared: &[BlankNode]) -> TriplePattern {
    let hide = |term: &TermPattern| match term {
        TermPattern::BlankNode(node) if shared.contains(node) => TermPattern::Variable(
            Variable::new_unchecked(format!("{HIDDEN_VARIABLE_PREFIX}{}", node.as_str())),
        ),
        term => term.clone(),
    };
    TriplePattern {
        subject: hide(&pattern.subject),
        predicate: pattern.predicate.clone(),
        object: hide(&pattern.object),
    }
}
