use crate::{
    error::{Error, Result},
    shard::ShardSnapshot,
};
use std::collections::{btree_map::Entry, BTreeMap};

/// Final word -> count mapping of a run. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordCounts {
    counts: BTreeMap<String, u64>,
}

impl WordCounts {
    pub fn get(&self, word: &str) -> Option<u64> {
        self.counts.get(word).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts, i.e. the number of tokens counted.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Entries in byte order of the word.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(w, &c)| (w.as_str(), c))
    }
}

impl FromIterator<(String, u64)> for WordCounts {
    fn from_iter<T: IntoIterator<Item = (String, u64)>>(iter: T) -> Self {
        let mut counts = BTreeMap::new();
        for (word, count) in iter {
            *counts.entry(word).or_insert(0) += count;
        }
        Self { counts }
    }
}

/// Disjoint union of shard snapshots.
///
/// A word may only ever appear in one shard. Seeing it twice means the
/// partitioning is broken, and that is reported instead of summed.
pub fn merge(snapshots: impl IntoIterator<Item = ShardSnapshot>) -> Result<WordCounts> {
    let mut counts = BTreeMap::new();
    let mut shards = 0;

    for snapshot in snapshots {
        for (word, count) in snapshot.counts {
            match counts.entry(word) {
                Entry::Vacant(v) => {
                    v.insert((count, snapshot.index));
                }
                Entry::Occupied(o) => {
                    let (_, first) = *o.get();
                    return Err(Error::Consistency {
                        word: o.key().clone(),
                        first,
                        second: snapshot.index,
                    });
                }
            }
        }
        shards += 1;
    }

    tracing::debug!(shards, words = counts.len(), "merged shards");
    Ok(WordCounts {
        counts: counts.into_iter().map(|(w, (c, _))| (w, c)).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(index: usize, entries: &[(&str, u64)]) -> ShardSnapshot {
        ShardSnapshot {
            index,
            counts: entries.iter().map(|&(w, c)| (w.to_string(), c)).collect(),
        }
    }

    #[test]
    fn disjoint_snapshots_union() {
        let merged = merge(vec![
            snapshot(0, &[("a", 3), ("c", 1)]),
            snapshot(1, &[("b", 2)]),
            snapshot(2, &[]),
        ])
        .unwrap();

        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get("a"), Some(3));
        assert_eq!(merged.get("b"), Some(2));
        assert_eq!(merged.get("c"), Some(1));
        assert_eq!(merged.total(), 6);
        let words: Vec<_> = merged.iter().map(|(w, _)| w).collect();
        assert_eq!(words, ["a", "b", "c"]);
    }

    #[test]
    fn overlapping_snapshots_are_a_consistency_error() {
        let err = merge(vec![
            snapshot(0, &[("a", 1)]),
            snapshot(3, &[("b", 1), ("a", 2)]),
        ])
        .unwrap_err();

        match err {
            Error::Consistency {
                word,
                first,
                second,
            } => {
                assert_eq!(word, "a");
                assert_eq!(first, 0);
                assert_eq!(second, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn no_snapshots_is_empty() {
        assert!(merge(Vec::new()).unwrap().is_empty());
    }
}
