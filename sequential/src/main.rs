use anyhow::Context;
use clap::Parser;
use common::{write_counts, Tokens, WordCounts};
use itertools::Itertools;
use parallel::{init_logger, OutputArgs};
use std::{
    fs::File,
    io::{self, BufReader, BufWriter},
    path::PathBuf,
};
use tracing::info;

/// Single-threaded reference count: sort every token, then count runs.
#[derive(Parser, Debug)]
struct Cli {
    #[arg(required = true)]
    input_files: Vec<PathBuf>,
    #[command(flatten)]
    output: OutputArgs,
}

fn main() -> anyhow::Result<()> {
    let _guard = init_logger();
    let cli = Cli::parse();

    let mut intermediate = Vec::new();
    for path in &cli.input_files {
        let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        let mut tokens = Tokens::new(BufReader::new(file), cli.output.empty_tokens());
        for token in tokens.by_ref() {
            intermediate.push(token.with_context(|| format!("cannot read {}", path.display()))?);
        }
        info!(path = %path.display(), lines = tokens.lines_read(), "read input");
    }

    intermediate.sort();
    let counts: WordCounts = intermediate
        .iter()
        .group_by(|word| *word)
        .into_iter()
        .map(|(word, run)| (word.clone(), run.count() as u64))
        .collect();

    let mut out = BufWriter::new(io::stdout().lock());
    write_counts(
        &mut out,
        &counts,
        cli.output.sort_order(),
        cli.output.format(),
        cli.output.limit,
    )?;
    info!(words = counts.len(), tokens = counts.total(), "sequential count completed");
    Ok(())
}
