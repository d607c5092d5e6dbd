use rdf_delta_model::{Bindings, Variable};
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

/// Computes the hash of a solution restricted to a list of variables.
///
/// Implementations must return the same value for structurally equal bindings, regardless of the
/// order in which their entries were created or whether they are additions or deletions.
pub trait BindingsHasher: Send + Sync {
    /// Hashes the values of `variables` in `bindings`. Unbound variables take part in the hash.
    fn hash(&self, bindings: &Bindings, variables: &[Variable]) -> u64;
}

/// A [BindingsHasher] based on [FxHasher].
#[derive(Clone, Copy, Debug, Default)]
pub struct FxBindingsHasher;

impl BindingsHasher for FxBindingsHasher {
    fn hash(&self, bindings: &Bindings, variables: &[Variable]) -> u64 {
        let mut hasher = FxHasher::default();
        for variable in variables {
            bindings.get(variable.as_str()).hash(&mut hasher);
        }
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_delta_model::{Literal, Term};

    fn var(name: &str) -> Variable {
        Variable::new_unchecked(name)
    }

    #[test]
    fn hash_is_independent_of_creation_order_and_flag() {
        let one = Term::from(Literal::from(1));
        let two = Term::from(Literal::from(2));
        let lhs = Bindings::from_iter([(var("a"), one.clone()), (var("b"), two.clone())]);
        let rhs = Bindings::from_iter([(var("b"), two), (var("a"), one)]).with_addition(false);

        let variables = [var("a"), var("b")];
        assert_eq!(
            FxBindingsHasher.hash(&lhs, &variables),
            FxBindingsHasher.hash(&rhs, &variables)
        );
    }

    #[test]
    fn unbound_differs_from_bound() {
        let bound = Bindings::from_iter([(var("a"), Term::from(Literal::from(1)))]);
        let unbound = Bindings::empty();

        assert_ne!(
            FxBindingsHasher.hash(&bound, &[var("a")]),
            FxBindingsHasher.hash(&unbound, &[var("a")])
        );
    }
}
