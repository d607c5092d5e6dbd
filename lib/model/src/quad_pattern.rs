use crate::{GraphName, NamedNode, Quad, Subject, Term};
use std::fmt::{Display, Formatter};

/// A quad pattern where every component is either a constant or a wildcard ([None]).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct QuadPattern {
    pub subject: Option<Subject>,
    pub predicate: Option<NamedNode>,
    pub object: Option<Term>,
    pub graph_name: Option<GraphName>,
}

impl QuadPattern {
    /// Creates a new [QuadPattern].
    pub fn new(
        subject: Option<Subject>,
        predicate: Option<NamedNode>,
        object: Option<Term>,
        graph_name: Option<GraphName>,
    ) -> Self {
        Self {
            subject,
            predicate,
            object,
            graph_name,
        }
    }

    /// Creates a pattern that matches every quad.
    pub fn any() -> Self {
        Self::default()
    }

    /// Checks whether `quad` matches this pattern.
    pub fn matches(&self, quad: &Quad) -> bool {
        self.subject.as_ref().map_or(true, |s| *s == quad.subject)
            && self.predicate.as_ref().map_or(true, |p| *p == quad.predicate)
            && self.object.as_ref().map_or(true, |o| *o == quad.object)
            && self
                .graph_name
                .as_ref()
                .map_or(true, |g| *g == quad.graph_name)
    }

    /// Returns all patterns that match `quad`, from the most specific to the fully unbound one.
    ///
    /// Each component is either fixed to the value in `quad` or a wildcard, which yields sixteen
    /// patterns.
    pub fn all_matching(quad: &Quad) -> impl Iterator<Item = QuadPattern> + '_ {
        (0..16_u8).map(move |mask| QuadPattern {
            subject: (mask & 1 == 0).then(|| quad.subject.clone()),
            predicate: (mask & 2 == 0).then(|| quad.predicate.clone()),
            object: (mask & 4 == 0).then(|| quad.object.clone()),
            graph_name: (mask & 8 == 0).then(|| quad.graph_name.clone()),
        })
    }
}

impl Display for QuadPattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fn write_component(
            f: &mut Formatter<'_>,
            value: Option<&dyn Display>,
        ) -> std::fmt::Result {
            match value {
                Some(value) => write!(f, "{value}"),
                None => f.write_str("*"),
            }
        }

        write_component(f, self.subject.as_ref().map(|v| v as &dyn Display))?;
        f.write_str(" ")?;
        write_component(f, self.predicate.as_ref().map(|v| v as &dyn Display))?;
        f.write_str(" ")?;
        write_component(f, self.object.as_ref().map(|v| v as &dyn Display))?;
        f.write_str(" ")?;
        write_component(f, self.graph_name.as_ref().map(|v| v as &dyn Display))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ex(name: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.com/{name}"))
    }

    #[test]
    fn matches_with_wildcards() {
        let quad = Quad::new(ex("s"), ex("p"), ex("o"), GraphName::DefaultGraph);

        assert!(QuadPattern::any().matches(&quad));
        assert!(QuadPattern::new(None, Some(ex("p")), None, None).matches(&quad));
        assert!(!QuadPattern::new(None, Some(ex("q")), None, None).matches(&quad));
        assert!(!QuadPattern::new(None, None, None, Some(ex("g").into())).matches(&quad));
    }

    #[test]
    fn all_matching_patterns_match() {
        let quad = Quad::new(ex("s"), ex("p"), ex("o"), ex("g"));

        let patterns = QuadPattern::all_matching(&quad).collect::<Vec<_>>();
        assert_eq!(patterns.len(), 16);
        assert!(patterns.iter().all(|p| p.matches(&quad)));
        assert!(patterns.contains(&QuadPattern::any()));
    }

    #[test]
    fn display() {
        let pattern = QuadPattern::new(None, Some(ex("p")), None, None);
        insta::assert_snapshot!(pattern, @"* <http://example.com/p> * *");
    }
}
