use clap::{error::ErrorKind, Parser};
use common::{write_counts, Error, Result};
use parallel::{
    driver::{DEFAULT_BATCH_SIZE, DEFAULT_QUEUE_CAPACITY},
    init_logger, run_until_cancelled, Config, Driver, OutputArgs,
};
use std::{
    io::{self, BufWriter},
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};
use tracing::{error, info};

/// Count word frequencies of a text file across sharded worker threads.
#[derive(Parser, Debug)]
#[command(version)]
pub struct Cli {
    /// Text file to count, words separated by single spaces
    input: PathBuf,
    /// Number of shards and worker threads [default: available parallelism]
    #[arg(short, long)]
    shards: Option<usize>,
    /// Salt for the word -> shard hash
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Abort the run after this many seconds
    #[arg(long)]
    timeout: Option<u64>,
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,
    #[command(flatten)]
    output: OutputArgs,
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::new(&self.input);
        if let Some(shards) = self.shards {
            config = config.with_shards(shards);
        }
        config.seed = self.seed;
        config.empty_tokens = self.output.empty_tokens();
        config.batch_size = self.batch_size;
        config.queue_capacity = self.queue_capacity;
        config
    }
}

async fn run(cli: Cli) -> Result<()> {
    let driver = Driver::new(cli.config())?;
    info!(
        input = %cli.input.display(),
        shards = driver.config().shards,
        "starting word count"
    );

    let report = run_until_cancelled(driver, cli.timeout.map(Duration::from_secs)).await?;

    let mut out = BufWriter::new(io::stdout().lock());
    write_counts(
        &mut out,
        &report.counts,
        cli.output.sort_order(),
        cli.output.format(),
        cli.output.limit,
    )
    .map_err(Error::Output)?;
    info!(words = report.counts.len(), "results written");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let _guard = init_logger();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _ = e.print();
            error!("Usage: wordcount <input_file>");
            return ExitCode::from(Error::Usage(e.to_string()).exit_code());
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(kind = ?e.kind(), "{e}");
            ExitCode::from(e.exit_code())
        }
    }
}
