use itertools::Either;
use rdf_delta_model::Bindings;
use rustc_hash::FxHashMap;

/// The live solutions of one side of a join.
///
/// Solutions that bind every join variable are grouped by the hash of their join key. Equal
/// solutions share a single entry that counts their multiplicity.
#[derive(Debug, Default)]
pub(crate) struct JoinIndex {
    buckets: FxHashMap<u64, Vec<(Bindings, usize)>>,
    /// Solutions that leave at least one join variable unbound. They may join with anything.
    partial: Vec<(Bindings, usize)>,
    len: usize,
}

impl JoinIndex {
    /// Adds a copy of `bindings`. [None] as `hash` marks a solution with an unbound join variable.
    pub(crate) fn insert(&mut self, hash: Option<u64>, bindings: Bindings) {
        let entries = match hash {
            Some(hash) => self.buckets.entry(hash).or_default(),
            None => &mut self.partial,
        };
        match entries.iter_mut().find(|(other, _)| *other == bindings) {
            Some((_, count)) => *count += 1,
            None => entries.push((bindings, 1)),
        }
        self.len += 1;
    }

    /// Removes a copy of `bindings`. Returns `false` if no copy is live.
    pub(crate) fn remove(&mut self, hash: Option<u64>, bindings: &Bindings) -> bool {
        let entries = match hash {
            Some(hash) => match self.buckets.get_mut(&hash) {
                Some(entries) => entries,
                None => return false,
            },
            None => &mut self.partial,
        };
        let Some(position) = entries.iter().position(|(other, _)| other == bindings) else {
            return false;
        };

        entries[position].1 -= 1;
        if entries[position].1 == 0 {
            entries.swap_remove(position);
        }
        if let Some(hash) = hash {
            if self.buckets.get(&hash).is_some_and(Vec::is_empty) {
                self.buckets.remove(&hash);
            }
        }
        self.len -= 1;
        true
    }

    /// Returns the live solutions that may be compatible with a solution whose join key hashes to
    /// `hash`, together with their multiplicity. A solution without a full join key is probed
    /// against every live solution.
    pub(crate) fn candidates(
        &self,
        hash: Option<u64>,
    ) -> impl Iterator<Item = (&Bindings, usize)> + '_ {
        let keyed = match hash {
            Some(hash) => Either::Left(self.buckets.get(&hash).into_iter().flatten()),
            None => Either::Right(self.buckets.values().flatten()),
        };
        keyed
            .chain(self.partial.iter())
            .map(|(bindings, count)| (bindings, *count))
    }

    /// The number of live solutions, counting each copy.
    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::add;

    #[test]
    fn counts_copies() {
        let mut index = JoinIndex::default();
        index.insert(Some(1), add(&[("a", "1")]));
        index.insert(Some(1), add(&[("a", "1")]));

        assert_eq!(index.len(), 2);
        assert_eq!(
            index.candidates(Some(1)).collect::<Vec<_>>(),
            vec![(&add(&[("a", "1")]), 2)]
        );

        assert!(index.remove(Some(1), &add(&[("a", "1")])));
        assert!(index.remove(Some(1), &add(&[("a", "1")])));
        assert!(!index.remove(Some(1), &add(&[("a", "1")])));
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn partial_solutions_are_always_candidates() {
        let mut index = JoinIndex::default();
        index.insert(Some(1), add(&[("a", "1")]));
        index.insert(Some(2), add(&[("a", "2")]));
        index.insert(None, add(&[("b", "1")]));

        assert_eq!(index.candidates(Some(1)).count(), 2);
        assert_eq!(index.candidates(Some(3)).count(), 1);
        assert_eq!(index.candidates(None).count(), 3);
    }
}
