use crate::Quad;
use std::fmt::{Display, Formatter};

/// A quad together with the direction of the change it describes.
///
/// `diff` is `Some(true)` for an addition, `Some(false)` for a removal and [None] if the producer
/// did not tag the quad. Consumers decide the default for untagged quads (see
/// [DeltaQuad::with_default_diff]).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeltaQuad {
    pub quad: Quad,
    pub diff: Option<bool>,
}

impl DeltaQuad {
    /// Creates a new [DeltaQuad].
    pub fn new(quad: Quad, diff: Option<bool>) -> Self {
        Self { quad, diff }
    }

    /// Creates a quad that is being added.
    pub fn addition(quad: Quad) -> Self {
        Self::new(quad, Some(true))
    }

    /// Creates a quad that is being removed.
    pub fn deletion(quad: Quad) -> Self {
        Self::new(quad, Some(false))
    }

    /// Creates a quad without a diff tag.
    pub fn untagged(quad: Quad) -> Self {
        Self::new(quad, None)
    }

    /// Sets the diff to `default` if it is not yet set.
    #[must_use]
    pub fn with_default_diff(self, default: bool) -> Self {
        Self {
            diff: Some(self.diff.unwrap_or(default)),
            quad: self.quad,
        }
    }

    /// Returns whether this quad is being added. Untagged quads count as additions.
    pub fn is_addition(&self) -> bool {
        self.diff.unwrap_or(true)
    }
}

impl From<Quad> for DeltaQuad {
    fn from(quad: Quad) -> Self {
        Self::untagged(quad)
    }
}

impl Display for DeltaQuad {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.diff {
            Some(true) => write!(f, "+ {}", self.quad),
            Some(false) => write!(f, "- {}", self.quad),
            None => write!(f, "{}", self.quad),
        }
    }
}
