use rdf_delta_common::error::ContractViolation;
use rustc_hash::FxHashMap;
use std::fmt::Display;
use std::hash::Hash;

/// Counts how often each value is currently part of an aggregate.
#[derive(Debug, Clone)]
pub(crate) struct Multiset<K> {
    counts: FxHashMap<K, usize>,
    len: usize,
}

impl<K> Default for Multiset<K> {
    fn default() -> Self {
        Self {
            counts: FxHashMap::default(),
            len: 0,
        }
    }
}

impl<K: Hash + Eq + Clone + Display> Multiset<K> {
    /// Adds a copy of `key`. Returns `true` if it is the first copy.
    pub fn insert(&mut self, key: &K) -> bool {
        self.len += 1;
        let count = self.counts.entry(key.clone()).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Removes a copy of `key`. Returns `true` if it was the last copy.
    ///
    /// Fails if the set is empty or `key` is not part of it.
    pub fn remove(&mut self, aggregate: &'static str, key: &K) -> Result<bool, ContractViolation> {
        if self.len == 0 {
            return Err(ContractViolation::RemoveFromEmptyAggregate {
                aggregate,
                term: key.to_string(),
            });
        }
        let Some(count) = self.counts.get_mut(key) else {
            return Err(ContractViolation::RemoveUnknownTerm {
                aggregate,
                term: key.to_string(),
            });
        };

        self.len -= 1;
        *count -= 1;
        if *count == 0 {
            self.counts.remove(key);
            return Ok(true);
        }
        Ok(false)
    }

    /// The number of copies.
    pub fn len(&self) -> usize {
        self.len
    }

    /// The number of distinct values.
    pub fn distinct_len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns an arbitrary value of the set.
    pub fn any(&self) -> Option<&K> {
        self.counts.keys().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_are_counted() {
        let mut set = Multiset::default();
        assert!(set.insert(&"a".to_owned()));
        assert!(!set.insert(&"a".to_owned()));
        assert_eq!(set.len(), 2);
        assert_eq!(set.distinct_len(), 1);

        assert_eq!(set.remove("test", &"a".to_owned()), Ok(false));
        assert_eq!(set.remove("test", &"a".to_owned()), Ok(true));
        assert!(set.is_empty());
    }

    #[test]
    fn removal_errors() {
        let mut set = Multiset::default();
        assert!(matches!(
            set.remove("test", &"a".to_owned()),
            Err(ContractViolation::RemoveFromEmptyAggregate { .. })
        ));

        set.insert(&"a".to_owned());
        assert!(matches!(
            set.remove("test", &"b".to_owned()),
            Err(ContractViolation::RemoveUnknownTerm { .. })
        ));
    }
}
