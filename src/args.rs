//! Command-line argument parsing (§4.7).
//!
//! Scaled down from ruff's `args.rs` (`clap::Parser` derive, a `command!()`
//! macro, grouped flag structs): this crate has one job, so there is one
//! flat argument set rather than a `Command` subcommand enum.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    author,
    name = "aardwolf",
    about = "Static analysis and trace instrumentation for fault localization."
)]
#[command(version)]
pub struct Args {
    /// Source files to analyze and instrument.
    pub files: Vec<PathBuf>,

    /// Directory to write `.aard` static files into. Falls back to
    /// `AARDWOLF_DATA_DEST`, then the current directory (§4.7, §5).
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Increase logging verbosity; repeatable (`-v`, `-vv`, `-vvv`).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn out_dir(&self) -> PathBuf {
        self.out_dir.clone().unwrap_or_else(|| {
            std::env::var_os("AARDWOLF_DATA_DEST")
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
        })
    }

    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
