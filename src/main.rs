//! Binary entry point.
//!
//! Grounded in ruff's `main.rs`, scaled to this crate's dependency set: no
//! `colored`/`wild`/`argfile`/custom global allocator, since none of those
//! are in our stack, but the same broken-pipe-is-success handling and
//! `Cause:` chain printing.

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;

use aardwolf::args::Args;
use aardwolf::commands::check;

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::new().filter_level(args.log_level()).init();

    match check::run(&args.files, &args.out_dir()) {
        Ok(0) => ExitCode::from(0),
        Ok(_) => ExitCode::from(1),
        Err(err) => {
            for cause in err.chain() {
                if let Some(ioerr) = cause.downcast_ref::<std::io::Error>() {
                    if ioerr.kind() == std::io::ErrorKind::BrokenPipe {
                        return ExitCode::from(0);
                    }
                }
            }
            let mut stderr = std::io::stderr().lock();
            writeln!(stderr, "aardwolf failed").ok();
            for cause in err.chain() {
                writeln!(stderr, "  Cause: {cause}").ok();
            }
            ExitCode::from(2)
        }
    }
}
