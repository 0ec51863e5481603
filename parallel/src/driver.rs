use crate::Cancellation;
use common::{
    merge, EmptyTokens, Error, Partitioner, Result, ShardAggregator, ShardSnapshot, Tokens,
    WordCounts,
};
use crossbeam_channel::{bounded, Receiver, Sender};
use dashmap::DashMap;
use std::{
    fs::File,
    io::{self, BufReader},
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};
use tokio::task::JoinError;
use tracing::{debug, info, info_span, warn, Span};
use uuid::Uuid;

pub const DEFAULT_BATCH_SIZE: usize = 1024;
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

type Batch = Vec<String>;

#[derive(Debug, Clone)]
pub struct Config {
    pub inputs: Vec<PathBuf>,
    pub shards: usize,
    pub seed: u64,
    pub empty_tokens: EmptyTokens,
    /// Tokens buffered per shard before they are handed to its worker.
    pub batch_size: usize,
    /// Batches in flight per shard queue.
    pub queue_capacity: usize,
}

impl Config {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            inputs: vec![input.into()],
            shards: default_shards(),
            seed: 0,
            empty_tokens: EmptyTokens::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn with_shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }
}

pub fn default_shards() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}

#[derive(Debug)]
pub struct RunReport {
    pub counts: WordCounts,
    pub tokens: u64,
    pub shards: usize,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct Driver {
    config: Config,
    partitioner: Partitioner,
}

impl Driver {
    pub fn new(config: Config) -> Result<Self> {
        if config.inputs.is_empty() {
            return Err(Error::Usage("no input file given".into()));
        }
        if config.batch_size == 0 || config.queue_capacity == 0 {
            return Err(Error::Usage(
                "batch size and queue capacity must be at least 1".into(),
            ));
        }
        let partitioner = Partitioner::new(config.shards, config.seed)?;
        Ok(Self {
            config,
            partitioner,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Every input must be an openable regular file before any worker starts.
    fn open_inputs(&self) -> Result<Vec<(PathBuf, File)>> {
        self.config
            .inputs
            .iter()
            .map(|path| {
                let meta = path.metadata().map_err(|e| Error::io(path, e))?;
                if !meta.is_file() {
                    return Err(Error::io(
                        path,
                        io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
                    ));
                }
                let file = File::open(path).map_err(|e| Error::io(path, e))?;
                Ok((path.clone(), file))
            })
            .collect()
    }

    pub fn run(&self, cancel: &Cancellation) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id, shards = self.config.shards);
        let _enter = span.enter();
        let started = Instant::now();

        let inputs = self.open_inputs()?;
        info!(inputs = inputs.len(), "session started");

        let shards = self.config.shards;
        let registry: DashMap<usize, ShardSnapshot> = DashMap::with_capacity(shards);

        let (produced, joined) = thread::scope(|s| {
            let mut senders = Vec::with_capacity(shards);
            let mut handles = Vec::with_capacity(shards);
            for index in 0..shards {
                let (tx, rx) = bounded::<Batch>(self.config.queue_capacity);
                senders.push(tx);
                let registry = &registry;
                let span = Span::current();
                handles.push(s.spawn(move || {
                    span.in_scope(|| shard_worker(index, rx, cancel, registry))
                }));
            }

            // Senders move into the producer and drop when it returns, which
            // ends every worker's receive loop on success and failure alike.
            let produced = self.produce(inputs, senders, cancel);

            let joined = handles
                .into_iter()
                .enumerate()
                .map(|(shard, handle)| handle.join().map_err(|_| Error::WorkerFailed { shard }))
                .collect::<Result<Vec<()>>>();
            (produced, joined)
        });

        if cancel.is_cancelled() {
            warn!("run cancelled, discarding partial counts");
            return Err(Error::Cancelled);
        }
        let tokens = produced?;
        joined?;

        let snapshots = (0..shards)
            .map(|shard| {
                registry
                    .remove(&shard)
                    .map(|(_, snapshot)| snapshot)
                    .ok_or(Error::MissingShard { shard })
            })
            .collect::<Result<Vec<_>>>()?;

        let counts = merge(snapshots)?;
        let merged = counts.total();
        if merged != tokens {
            return Err(Error::TotalMismatch {
                emitted: tokens,
                merged,
            });
        }

        let elapsed = started.elapsed();
        info!(
            words = counts.len(),
            tokens,
            elapsed_ms = elapsed.as_millis() as u64,
            "word count completed"
        );
        Ok(RunReport {
            counts,
            tokens,
            shards,
            elapsed,
        })
    }

    /// Single reader: tokenizes every input and fans tokens out in batches.
    /// Returns the number of tokens emitted.
    fn produce(
        &self,
        inputs: Vec<(PathBuf, File)>,
        senders: Vec<Sender<Batch>>,
        cancel: &Cancellation,
    ) -> Result<u64> {
        let batch_size = self.config.batch_size;
        let mut batches: Vec<Batch> = (0..senders.len())
            .map(|_| Vec::with_capacity(batch_size))
            .collect();
        let mut emitted = 0u64;

        for (path, file) in inputs {
            let mut tokens = Tokens::new(BufReader::new(file), self.config.empty_tokens);
            let mut line = 0;

            while let Some(token) = tokens.next() {
                let token = token.map_err(|e| Error::io(&path, e))?;
                if tokens.lines_read() != line {
                    line = tokens.lines_read();
                    if cancel.is_cancelled() {
                        return Err(Error::Cancelled);
                    }
                }

                let shard = self.partitioner.shard_of(&token);
                batches[shard].push(token);
                emitted += 1;
                if batches[shard].len() >= batch_size {
                    let batch = std::mem::replace(
                        &mut batches[shard],
                        Vec::with_capacity(batch_size),
                    );
                    send(&senders[shard], shard, batch, cancel)?;
                }
            }
            info!(path = %path.display(), lines = tokens.lines_read(), "read input");
        }

        for (shard, batch) in batches.into_iter().enumerate() {
            if !batch.is_empty() {
                send(&senders[shard], shard, batch, cancel)?;
            }
        }
        Ok(emitted)
    }
}

fn send(tx: &Sender<Batch>, shard: usize, batch: Batch, cancel: &Cancellation) -> Result<()> {
    // A closed queue means the worker is gone: stopped on cancellation, or died.
    tx.send(batch).map_err(|_| {
        if cancel.is_cancelled() {
            Error::Cancelled
        } else {
            Error::WorkerFailed { shard }
        }
    })
}

fn shard_worker(
    index: usize,
    rx: Receiver<Batch>,
    cancel: &Cancellation,
    registry: &DashMap<usize, ShardSnapshot>,
) {
    let mut shard = ShardAggregator::new(index);
    for batch in rx {
        if cancel.is_cancelled() {
            debug!(shard = index, "worker stopping on cancellation");
            return;
        }
        for word in batch {
            shard.record_owned(word);
        }
    }
    debug!(
        shard = index,
        distinct = shard.distinct(),
        tokens = shard.total(),
        "shard drained"
    );
    registry.insert(index, shard.drain());
}

/// Runs the driver off the async runtime and cancels it on Ctrl-C or once
/// `timeout` elapses. A cancelled run yields `Error::Cancelled`, never counts.
pub async fn run_until_cancelled(driver: Driver, timeout: Option<Duration>) -> Result<RunReport> {
    let cancel = Cancellation::new();
    let worker_cancel = cancel.clone();
    let mut task = tokio::task::spawn_blocking(move || driver.run(&worker_cancel));

    let deadline = async move {
        match timeout {
            Some(timeout) => tokio::time::sleep(timeout).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        joined = &mut task => return flatten(joined),
        Ok(()) = tokio::signal::ctrl_c() => warn!("interrupted, cancelling run"),
        _ = deadline => warn!(?timeout, "timed out, cancelling run"),
    }
    cancel.cancel();
    flatten(task.await)
}

fn flatten(joined: std::result::Result<Result<RunReport>, JoinError>) -> Result<RunReport> {
    joined.map_err(|e| Error::DriverFailed(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn input(text: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn count(text: &str, shards: usize) -> WordCounts {
        let file = input(text);
        let driver = Driver::new(Config::new(file.path()).with_shards(shards)).unwrap();
        driver.run(&Cancellation::new()).unwrap().counts
    }

    const TEXT: &str = "the quick brown fox\njumps over  the lazy dog\n\nthe end \n";

    #[test]
    fn counts_example() {
        let counts = count("a b a c b a", 4);
        let pairs = counts.iter().collect_vec();
        assert_eq!(pairs, [("a", 3), ("b", 2), ("c", 1)]);
    }

    #[test]
    fn empty_file_is_empty_mapping() {
        let counts = count("", 4);
        assert!(counts.is_empty());
    }

    #[test]
    fn empty_tokens_kept_by_default() {
        let counts = count("x  y", 2);
        assert_eq!(counts.get(""), Some(1));
        assert_eq!(counts.get("x"), Some(1));
        assert_eq!(counts.get("y"), Some(1));
    }

    #[test]
    fn empty_tokens_skipped_on_request() {
        let file = input("x  y");
        let mut config = Config::new(file.path()).with_shards(2);
        config.empty_tokens = EmptyTokens::Skip;
        let report = Driver::new(config).unwrap().run(&Cancellation::new()).unwrap();
        assert_eq!(report.counts.get(""), None);
        assert_eq!(report.tokens, 2);
    }

    #[test]
    fn exact_counts_and_total() {
        let file = input(TEXT);
        let report = Driver::new(Config::new(file.path()).with_shards(3))
            .unwrap()
            .run(&Cancellation::new())
            .unwrap();
        let expected = common::tokenize_str(TEXT, EmptyTokens::Keep).into_iter().counts();

        assert_eq!(report.tokens, expected.values().sum::<usize>() as u64);
        assert_eq!(report.counts.total(), report.tokens);
        assert_eq!(report.counts.len(), expected.len());
        for (word, n) in expected {
            assert_eq!(report.counts.get(&word), Some(n as u64), "word {word:?}");
        }
        assert_eq!(report.counts.get("the"), Some(3));
        assert_eq!(report.counts.get(""), Some(3));
    }

    #[test]
    fn shard_count_invariance() {
        let one = count(TEXT, 1);
        for shards in [2, 16] {
            assert_eq!(count(TEXT, shards), one, "shards = {shards}");
        }
    }

    #[test]
    fn repeated_runs_agree() {
        let file = input(TEXT);
        let driver = Driver::new(Config::new(file.path()).with_shards(5)).unwrap();
        let first = driver.run(&Cancellation::new()).unwrap().counts;
        let second = driver.run(&Cancellation::new()).unwrap().counts;
        assert_eq!(first, second);
    }

    #[test]
    fn small_batches_and_queues() {
        let text = (0..2000).map(|i| format!("w{}", i % 37)).join(" ");
        let file = input(&text);
        let mut config = Config::new(file.path()).with_shards(4);
        config.batch_size = 1;
        config.queue_capacity = 1;
        let report = Driver::new(config).unwrap().run(&Cancellation::new()).unwrap();
        assert_eq!(report.tokens, 2000);
        assert_eq!(report.counts.len(), 37);
        assert_eq!(report.counts.get("w0"), Some(55));
    }

    #[test]
    fn several_inputs_are_counted_together() {
        let a = input("a b\n");
        let b = input("b c");
        let mut config = Config::new(a.path()).with_shards(2);
        config.inputs.push(b.path().to_path_buf());
        let counts = Driver::new(config).unwrap().run(&Cancellation::new()).unwrap().counts;
        assert_eq!(counts.iter().collect_vec(), [("a", 1), ("b", 2), ("c", 1)]);
    }

    #[test]
    fn missing_input_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let driver = Driver::new(Config::new(dir.path().join("nope.txt"))).unwrap();
        let err = driver.run(&Cancellation::new()).unwrap_err();
        assert!(matches!(err, Error::Io { .. }), "{err}");
        assert_eq!(err.exit_code(), 66);
    }

    #[test]
    fn directory_input_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let driver = Driver::new(Config::new(dir.path())).unwrap();
        assert!(matches!(
            driver.run(&Cancellation::new()),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn invalid_utf8_is_io_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"ok \xff\n").unwrap();
        let driver = Driver::new(Config::new(file.path()).with_shards(2)).unwrap();
        assert!(matches!(
            driver.run(&Cancellation::new()),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn invalid_config_is_usage_error() {
        assert!(matches!(
            Driver::new(Config::new("x").with_shards(0)),
            Err(Error::Usage(_))
        ));
        let mut config = Config::new("x");
        config.batch_size = 0;
        assert!(matches!(Driver::new(config), Err(Error::Usage(_))));
    }

    #[test]
    fn cancelled_run_reports_no_counts() {
        let cancel = Cancellation::new();
        cancel.cancel();
        for text in [TEXT, ""] {
            let file = input(text);
            let driver = Driver::new(Config::new(file.path()).with_shards(3)).unwrap();
            assert!(matches!(driver.run(&cancel), Err(Error::Cancelled)));
        }
    }

    #[tokio::test]
    async fn supervised_run_completes() {
        let file = input("a b a");
        let driver = Driver::new(Config::new(file.path()).with_shards(2)).unwrap();
        let report = run_until_cancelled(driver, Some(Duration::from_secs(60)))
            .await
            .unwrap();
        assert_eq!(report.counts.get("a"), Some(2));
        assert_eq!(report.shards, 2);
    }
}
