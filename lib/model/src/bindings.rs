use crate::{Term, Variable};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

/// A tagged solution mapping.
///
/// A [Bindings] maps variables to RDF terms and carries a flag that indicates whether it describes
/// the *addition* of a solution or the *deletion* (retraction) of a previously added one. The
/// entries are kept sorted by variable name such that two structurally equal bindings always have
/// the same layout, regardless of the order in which they were built.
///
/// Equality and hashing only consider the variable-to-term entries. A deletion is therefore equal
/// to the addition it retracts.
///
/// ```
/// # use rdf_delta_model::{Bindings, NamedNode, Term, Variable};
/// let s = Variable::new_unchecked("s");
/// let ex = Term::from(NamedNode::new_unchecked("http://example.com"));
///
/// let addition = Bindings::from_iter([(s.clone(), ex.clone())]);
/// let deletion = addition.clone().with_addition(false);
///
/// assert!(addition.is_addition());
/// assert!(!deletion.is_addition());
/// assert_eq!(addition, deletion);
/// assert_eq!(deletion.get("s"), Some(&ex));
/// ```
#[derive(Clone, Debug)]
pub struct Bindings {
    /// Entries sorted by the variable name.
    entries: Vec<(Variable, Term)>,
    /// Whether this is an addition or a deletion event.
    is_addition: bool,
    /// Auxiliary entries that do not take part in the solution mapping.
    context: BTreeMap<String, Term>,
}

impl Bindings {
    /// Creates an empty addition.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            is_addition: true,
            context: BTreeMap::new(),
        }
    }

    /// Returns the term bound to the variable with the given `name`.
    pub fn get(&self, name: &str) -> Option<&Term> {
        self.position(name)
            .ok()
            .map(|idx| &self.entries[idx].1)
    }

    /// Returns whether a variable with the given `name` is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_ok()
    }

    /// Returns the bound variables in sorted order.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.entries.iter().map(|(variable, _)| variable)
    }

    /// Returns all entries in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &Term)> {
        self.entries.iter().map(|(variable, term)| (variable, term))
    }

    /// Returns the number of bound variables.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no variable is bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if this is an addition, `false` for a deletion.
    pub fn is_addition(&self) -> bool {
        self.is_addition
    }

    /// Replaces the addition flag.
    #[must_use]
    pub fn with_addition(mut self, is_addition: bool) -> Self {
        self.is_addition = is_addition;
        self
    }

    /// Binds `variable` to `term`, replacing a previous value.
    #[must_use]
    pub fn set(mut self, variable: Variable, term: Term) -> Self {
        match self.position(variable.as_str()) {
            Ok(idx) => self.entries[idx].1 = term,
            Err(idx) => self.entries.insert(idx, (variable, term)),
        }
        self
    }

    /// Removes the value of `variable`.
    #[must_use]
    pub fn without(mut self, variable: &Variable) -> Self {
        if let Ok(idx) = self.position(variable.as_str()) {
            self.entries.remove(idx);
        }
        self
    }

    /// Restricts the bindings to `variables`. The addition flag and the context are kept.
    #[must_use]
    pub fn project(&self, variables: &[Variable]) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(variable, _)| variables.contains(variable))
                .cloned()
                .collect(),
            is_addition: self.is_addition,
            context: self.context.clone(),
        }
    }

    /// Checks whether the two bindings agree on all variables that are bound in both.
    pub fn is_compatible(&self, other: &Bindings) -> bool {
        let mut lhs = self.entries.iter().peekable();
        let mut rhs = other.entries.iter().peekable();
        while let (Some((lvar, lterm)), Some((rvar, rterm))) = (lhs.peek(), rhs.peek()) {
            match lvar.as_str().cmp(rvar.as_str()) {
                std::cmp::Ordering::Less => {
                    lhs.next();
                }
                std::cmp::Ordering::Greater => {
                    rhs.next();
                }
                std::cmp::Ordering::Equal => {
                    if lterm != rterm {
                        return false;
                    }
                    lhs.next();
                    rhs.next();
                }
            }
        }
        true
    }

    /// Merges two compatible bindings. Returns [None] if they disagree on a shared variable.
    ///
    /// The addition flag and the context of `self` are kept.
    pub fn merge(&self, other: &Bindings) -> Option<Self> {
        if !self.is_compatible(other) {
            return None;
        }

        let mut result = self.clone();
        for (variable, term) in &other.entries {
            if let Err(idx) = result.position(variable.as_str()) {
                result.entries.insert(idx, (variable.clone(), term.clone()));
            }
        }
        Some(result)
    }

    /// Returns an auxiliary context entry.
    pub fn context_entry(&self, key: &str) -> Option<&Term> {
        self.context.get(key)
    }

    /// Attaches an auxiliary context entry. Context entries are not part of the solution mapping.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: Term) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    fn position(&self, name: &str) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|(variable, _)| variable.as_str().cmp(name))
    }
}

impl Default for Bindings {
    fn default() -> Self {
        Self::empty()
    }
}

impl FromIterator<(Variable, Term)> for Bindings {
    /// Creates an addition from the given entries. Later entries overwrite earlier ones.
    fn from_iter<T: IntoIterator<Item = (Variable, Term)>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Self::empty(), |bindings, (variable, term)| {
                bindings.set(variable, term)
            })
    }
}

impl PartialEq for Bindings {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for Bindings {}

impl Hash for Bindings {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entries.hash(state);
    }
}

impl Display for Bindings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(if self.is_addition { "+" } else { "-" })?;
        for (variable, term) in &self.entries {
            write!(f, " {variable}={term}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Literal, NamedNode};

    fn var(name: &str) -> Variable {
        Variable::new_unchecked(name)
    }

    fn iri(value: &str) -> Term {
        NamedNode::new_unchecked(format!("http://example.com/{value}")).into()
    }

    #[test]
    fn entries_are_sorted_independent_of_insertion_order() {
        let lhs = Bindings::from_iter([(var("b"), iri("1")), (var("a"), iri("2"))]);
        let rhs = Bindings::from_iter([(var("a"), iri("2")), (var("b"), iri("1"))]);

        assert_eq!(lhs, rhs);
        assert_eq!(
            lhs.variables().map(Variable::as_str).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn equality_ignores_flag_and_context() {
        let addition = Bindings::from_iter([(var("a"), iri("1"))]);
        let deletion = addition
            .clone()
            .with_addition(false)
            .with_context_entry("group", Literal::from(1).into());

        assert_eq!(addition, deletion);
        assert_eq!(deletion.context_entry("group"), Some(&Literal::from(1).into()));
        assert_eq!(addition.context_entry("group"), None);
    }

    #[test]
    fn merge_compatible() {
        let lhs = Bindings::from_iter([(var("a"), iri("1")), (var("b"), iri("2"))]);
        let rhs = Bindings::from_iter([(var("b"), iri("2")), (var("c"), iri("3"))]);

        let merged = lhs.merge(&rhs).unwrap();
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get("c"), Some(&iri("3")));
    }

    #[test]
    fn merge_incompatible() {
        let lhs = Bindings::from_iter([(var("a"), iri("1"))]);
        let rhs = Bindings::from_iter([(var("a"), iri("2"))]);

        assert!(!lhs.is_compatible(&rhs));
        assert_eq!(lhs.merge(&rhs), None);
    }

    #[test]
    fn merge_keeps_flag_of_left_side() {
        let lhs = Bindings::from_iter([(var("a"), iri("1"))]).with_addition(false);
        let rhs = Bindings::from_iter([(var("b"), iri("1"))]);

        assert!(!lhs.merge(&rhs).unwrap().is_addition());
    }

    #[test]
    fn project_and_without() {
        let bindings = Bindings::from_iter([(var("a"), iri("1")), (var("b"), iri("2"))])
            .with_addition(false);

        let projected = bindings.project(&[var("b"), var("c")]);
        assert_eq!(projected.len(), 1);
        assert!(!projected.is_addition());
        assert!(!bindings.clone().without(&var("a")).contains("a"));
    }

    #[test]
    fn display() {
        let bindings = Bindings::from_iter([(var("s"), iri("s")), (var("o"), iri("o"))]);
        insta::assert_snapshot!(
            bindings.with_addition(false),
            @"- ?o=<http://example.com/o> ?s=<http://example.com/s>"
        );
    }
}
