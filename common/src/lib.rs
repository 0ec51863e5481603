pub mod error;
pub mod merge;
pub mod output;
pub mod partition;
pub mod shard;
pub mod tokenizer;

pub use error::{Error, ErrorKind, Result};
pub use merge::{merge, WordCounts};
pub use output::{write_counts, Format, SortOrder};
pub use partition::Partitioner;
pub use shard::{ShardAggregator, ShardSnapshot};
pub use tokenizer::{tokenize_str, EmptyTokens, Tokens};
