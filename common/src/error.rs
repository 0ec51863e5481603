use std::{io, path::PathBuf};
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse classification of an [`Error`], one per exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Usage,
    Io,
    Output,
    Consistency,
    Cancelled,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("usage error: {0}")]
    Usage(String),

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write output: {0}")]
    Output(#[source] io::Error),

    #[error("word {word:?} counted by both shard {first} and shard {second}")]
    Consistency {
        word: String,
        first: usize,
        second: usize,
    },

    #[error("merged total {merged} does not match {emitted} tokens read")]
    TotalMismatch { emitted: u64, merged: u64 },

    #[error("shard {shard} did not report")]
    MissingShard { shard: usize },

    #[error("worker for shard {shard} failed")]
    WorkerFailed { shard: usize },

    #[error("driver task failed: {0}")]
    DriverFailed(String),

    #[error("run cancelled before completion")]
    Cancelled,
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Usage(_) => ErrorKind::Usage,
            Error::Io { .. } => ErrorKind::Io,
            Error::Output(_) => ErrorKind::Output,
            Error::Consistency { .. }
            | Error::TotalMismatch { .. }
            | Error::MissingShard { .. }
            | Error::WorkerFailed { .. }
            | Error::DriverFailed(_) => ErrorKind::Consistency,
            Error::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Process exit status, sysexits-style where one fits.
    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::Usage => 64,
            ErrorKind::Io => 66,
            ErrorKind::Consistency => 70,
            ErrorKind::Output => 74,
            ErrorKind::Cancelled => 130,
        }
    }
}
