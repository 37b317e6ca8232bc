use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the analysis-and-instrumentation pipeline.
///
/// Mirrors ruff's split between typed library errors and the
/// `anyhow`-wrapped error the CLI binary ultimately prints.
#[derive(Debug, Error)]
pub enum AardError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Instrumentation introduced a statement the Analysis stage never saw.
    /// This is a fatal invariant violation per the ID-stability contract.
    #[error("instrumentation invariant violated: node id was freshly inserted during rewrite ({context})")]
    IdDivergence { context: String },
}

pub type Result<T> = std::result::Result<T, AardError>;
