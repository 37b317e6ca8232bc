//! The `check` pipeline (§2.1, §6): runs every stage over each input file.
//!
//! Grounded in `commands::check::check` (`crates/ruff/src/commands/
//! check.rs`): a top-level function that walks the file list and drives the
//! core engine per file, minus ruff's parallel resolver and package-root
//! discovery — this crate processes a flat list of paths, not a configured
//! workspace.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use log::{debug, error, info};

use crate::analysis::Analysis;
use crate::error::AardError;
use crate::instrument;
use crate::normalize::normalize;
use crate::static_writer::write_static_file;
use crate::symbols;

/// Processes every file in `files`, writing each one's `.aard` static file
/// into `out_dir`. Returns the count of files that failed.
pub fn run(files: &[PathBuf], out_dir: &Path) -> anyhow::Result<usize> {
    fs::create_dir_all(out_dir).with_context(|| format!("failed to create {}", out_dir.display()))?;

    let mut failures = 0;
    for path in files {
        let file_id = file_id_for(path);
        if let Err(err) = process_file(path, file_id, out_dir) {
            error!("{}: {err}", path.display());
            failures += 1;
        }
    }
    Ok(failures)
}

/// The file id is the inode number (`os.stat(...).st_ino` in
/// `analysis.py:18-21`), falling back to 0 if the file can't be stat'd.
#[cfg(unix)]
fn file_id_for(path: &Path) -> u64 {
    use std::os::unix::fs::MetadataExt;
    fs::metadata(path).map_or(0, |meta| meta.ino())
}

#[cfg(not(unix))]
fn file_id_for(_path: &Path) -> u64 {
    0
}

fn process_file(path: &Path, file_id: u64, out_dir: &Path) -> Result<(), AardError> {
    let source = fs::read_to_string(path).map_err(|source| AardError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut body = rustpython_parser::parser::parse_program(&source, &path.to_string_lossy())
        .map_err(|err| AardError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

    normalize(&mut body);
    let symbols = symbols::build(&body);
    let mut output = Analysis::new(&symbols, file_id).run(&body);

    let stem = path
        .file_stem()
        .map_or_else(|| "out".to_string(), |s| s.to_string_lossy().into_owned());
    let out_path = out_dir.join(format!("{stem}.aard"));
    write_static_file(
        output.file_id,
        &output.contexts,
        &output.statements,
        &mut output.values,
        path,
        &out_path,
    )?;

    // Rewriting here surfaces an id-divergence invariant violation before
    // the file is considered processed; the rewritten tree itself is a
    // library artifact (this crate has no target-language unparser to turn
    // it back into source).
    instrument::instrument(&body, &mut output.nodes, output.file_id)?;

    info!("wrote {}", out_path.display());
    debug!(
        "{} statements, {} values",
        output.statements.len(),
        output.values.len()
    );
    Ok(())
}
