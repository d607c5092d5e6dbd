use rdf_delta_model::{GraphName, NamedNode};
use std::fmt::{Display, Formatter};

/// The graphs a triple pattern is matched against.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ActiveGraph {
    /// Only the default graph.
    #[default]
    DefaultGraph,
    /// The union of the default graph and all named graphs.
    AllGraphs,
    /// Any named graph, but not the default graph.
    AnyNamedGraph,
    /// A single named graph.
    NamedGraph(NamedNode),
}

impl ActiveGraph {
    /// The graph component of the quad pattern that is sent to the source.
    pub fn graph_pattern(&self) -> Option<GraphName> {
        match self {
            ActiveGraph::DefaultGraph => Some(GraphName::DefaultGraph),
            ActiveGraph::AllGraphs | ActiveGraph::AnyNamedGraph => None,
            ActiveGraph::NamedGraph(name) => Some(name.clone().into()),
        }
    }

    /// Returns whether a quad from `graph` belongs to the active graph.
    pub fn contains(&self, graph: &GraphName) -> bool {
        match self {
            ActiveGraph::DefaultGraph => graph.is_default_graph(),
            ActiveGraph::AllGraphs => true,
            ActiveGraph::AnyNamedGraph => !graph.is_default_graph(),
            ActiveGraph::NamedGraph(name) => matches!(graph, GraphName::NamedNode(n) if n == name),
        }
    }
}

impl Display for ActiveGraph {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ActiveGraph::DefaultGraph => f.write_str("DEFAULT"),
            ActiveGraph::AllGraphs => f.write_str("ALL"),
            ActiveGraph::AnyNamedGraph => f.write_str("NAMED"),
            ActiveGraph::NamedGraph(name) => write!(f, "{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_named_graph_excludes_default_graph() {
        let graph = GraphName::from(NamedNode::new_unchecked("http://example.com/g"));

        assert!(ActiveGraph::AnyNamedGraph.contains(&graph));
        assert!(!ActiveGraph::AnyNamedGraph.contains(&GraphName::DefaultGraph));
        assert!(ActiveGraph::AllGraphs.contains(&GraphName::DefaultGraph));
        assert_eq!(ActiveGraph::AnyNamedGraph.graph_pattern(), None);
    }
}
