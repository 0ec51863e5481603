use crate::error::{Error, Result};
use std::{collections::hash_map::DefaultHasher, hash::Hasher};

/// Routes words to shards by a stable hash of their bytes.
///
/// Uses the std hasher with its fixed default keys, salted by `seed`. The same
/// word always lands on the same shard for a given seed and shard count.
#[derive(Debug, Clone, Copy)]
pub struct Partitioner {
    shards: usize,
    seed: u64,
}

impl Partitioner {
    pub fn new(shards: usize, seed: u64) -> Result<Self> {
        if shards == 0 {
            return Err(Error::Usage("shard count must be at least 1".into()));
        }
        Ok(Self { shards, seed })
    }

    pub fn shards(&self) -> usize {
        self.shards
    }

    pub fn shard_of(&self, word: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        hasher.write_u64(self.seed);
        hasher.write(word.as_bytes());
        (hasher.finish() % self.shards as u64) as usize
    }
}
