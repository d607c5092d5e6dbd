use rdf_delta_model::Variable;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// A token that tells whether a metadata object is still up to date.
///
/// Clones share the same token. Once invalidated, a token never becomes valid again.
#[derive(Clone, Debug)]
pub struct MetadataValidationState(Arc<AtomicBool>);

impl MetadataValidationState {
    /// Creates a new, valid token.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// Returns whether the metadata is still up to date.
    pub fn is_valid(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Marks the metadata as outdated.
    pub fn invalidate(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for MetadataValidationState {
    fn default() -> Self {
        Self::new()
    }
}

/// The (estimated) number of solutions of a stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cardinality {
    Exact(usize),
    Estimate(usize),
}

impl Cardinality {
    /// Returns the number of solutions, regardless of whether it is exact.
    pub fn value(self) -> usize {
        match self {
            Cardinality::Exact(value) | Cardinality::Estimate(value) => value,
        }
    }
}

/// A variable of a solution stream.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MetadataVariable {
    pub variable: Variable,
    /// Whether a solution may leave this variable unbound.
    pub can_be_undef: bool,
}

impl MetadataVariable {
    /// Creates a variable that is bound in every solution.
    pub fn bound(variable: Variable) -> Self {
        Self {
            variable,
            can_be_undef: false,
        }
    }

    /// Creates a variable that may be unbound.
    pub fn maybe_undef(variable: Variable) -> Self {
        Self {
            variable,
            can_be_undef: true,
        }
    }
}

/// Describes the solutions of a stream.
#[derive(Clone, Debug)]
pub struct BindingsMetadata {
    pub cardinality: Cardinality,
    pub variables: Vec<MetadataVariable>,
    pub state: MetadataValidationState,
}

impl BindingsMetadata {
    /// Creates new metadata with a fresh validation token.
    pub fn new(cardinality: Cardinality, variables: Vec<MetadataVariable>) -> Self {
        Self {
            cardinality,
            variables,
            state: MetadataValidationState::new(),
        }
    }

    /// Returns the entry for `variable`.
    pub fn variable(&self, variable: &Variable) -> Option<&MetadataVariable> {
        self.variables.iter().find(|v| v.variable == *variable)
    }

    /// Returns the variables in their original order.
    pub fn variable_names(&self) -> Vec<Variable> {
        self.variables.iter().map(|v| v.variable.clone()).collect()
    }

    /// Returns whether `variable` may be unbound. Unknown variables are always unbound.
    pub fn can_be_undef(&self, variable: &Variable) -> bool {
        self.variable(variable).map_or(true, |v| v.can_be_undef)
    }
}

/// A shared, updatable metadata object.
///
/// Every update invalidates the validation token of the previous metadata such that readers can
/// detect that their copy is stale.
#[derive(Clone, Debug)]
pub struct MetadataHandle(Arc<Mutex<BindingsMetadata>>);

impl MetadataHandle {
    /// Creates a new handle.
    pub fn new(metadata: BindingsMetadata) -> Self {
        Self(Arc::new(Mutex::new(metadata)))
    }

    /// Returns a copy of the current metadata.
    pub fn current(&self) -> BindingsMetadata {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replaces the metadata. The previous validation token is invalidated and `metadata` gets a
    /// fresh one.
    pub fn update(&self, metadata: BindingsMetadata) {
        let mut current = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        current.state.invalidate();
        *current = BindingsMetadata {
            state: MetadataValidationState::new(),
            ..metadata
        };
    }

    /// Replaces the cardinality of the current metadata.
    pub fn update_cardinality(&self, cardinality: Cardinality) {
        let current = self.current();
        self.update(BindingsMetadata {
            cardinality,
            ..current
        });
    }
}
