use std::collections::HashMap;

/// Per-shard word counts, written by the one worker that owns the shard.
#[derive(Debug, Default)]
pub struct ShardAggregator {
    index: usize,
    counts: HashMap<String, u64>,
    total: u64,
}

/// What a shard hands to the merger once its worker is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardSnapshot {
    pub index: usize,
    pub counts: HashMap<String, u64>,
}

impl ShardAggregator {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn record(&mut self, word: &str) {
        match self.counts.get_mut(word) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(word.to_owned(), 1);
            }
        }
        self.total += 1;
    }

    pub fn record_owned(&mut self, word: String) {
        *self.counts.entry(word).or_insert(0) += 1;
        self.total += 1;
    }

    /// Distinct words seen so far.
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// Tokens recorded so far.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Hands the counts over. Consumes the aggregator, so it happens once.
    pub fn drain(self) -> ShardSnapshot {
        ShardSnapshot {
            index: self.index,
            counts: self.counts,
        }
    }
}

impl ShardSnapshot {
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_inserts_then_increments() {
        let mut shard = ShardAggregator::new(2);
        shard.record("a");
        shard.record("b");
        shard.record("a");
        shard.record_owned("a".to_string());

        assert_eq!(shard.distinct(), 2);
        assert_eq!(shard.total(), 4);

        let snapshot = shard.drain();
        assert_eq!(snapshot.index, 2);
        assert_eq!(snapshot.counts["a"], 3);
        assert_eq!(snapshot.counts["b"], 1);
        assert_eq!(snapshot.total(), 4);
    }

    #[test]
    fn empty_shard_drains_empty() {
        let snapshot = ShardAggregator::new(0).drain();
        assert!(snapshot.counts.is_empty());
        assert_eq!(snapshot.total(), 0);
    }
}
