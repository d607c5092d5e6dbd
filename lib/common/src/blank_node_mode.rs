/// Defines how blank nodes in query patterns are matched against the data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlankNodeMatchingMode {
    /// A blank node is interpreted as a variable that is not part of the solution.
    #[default]
    Variable,
    /// A blank node is interpreted as a constant filter.
    Filter,
}
