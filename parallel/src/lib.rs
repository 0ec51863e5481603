use clap::{Args, ValueEnum};
use common::{EmptyTokens, Format, SortOrder};
use time::macros::format_description;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt::time::LocalTime, EnvFilter};

pub mod cancel;
pub mod driver;

pub use cancel::Cancellation;
pub use driver::{run_until_cancelled, Config, Driver, RunReport};

/// Logs go to stderr through a non-blocking writer; stdout is reserved for
/// the counts. Keep the guard alive until exit so buffered lines get flushed.
pub fn init_logger() -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    let timer = LocalTime::new(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
    ));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(timer)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    guard
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortArg {
    Word,
    Count,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    Tsv,
    Table,
}

/// Tokenizing and output flags shared by both binaries.
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Drop empty words produced by repeated spaces and empty lines
    #[arg(long)]
    pub skip_empty: bool,
    #[arg(long, value_enum, default_value_t = SortArg::Word)]
    pub sort: SortArg,
    #[arg(long, value_enum, default_value_t = FormatArg::Tsv)]
    pub format: FormatArg,
    /// Print at most this many rows
    #[arg(long)]
    pub limit: Option<usize>,
}

impl OutputArgs {
    pub fn empty_tokens(&self) -> EmptyTokens {
        if self.skip_empty {
            EmptyTokens::Skip
        } else {
            EmptyTokens::Keep
        }
    }

    pub fn sort_order(&self) -> SortOrder {
        match self.sort {
            SortArg::Word => SortOrder::Word,
            SortArg::Count => SortOrder::Count,
        }
    }

    pub fn format(&self) -> Format {
        match self.format {
            FormatArg::Tsv => Format::Tsv,
            FormatArg::Table => Format::Table,
        }
    }
}
