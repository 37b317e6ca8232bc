//! Static Writer (§4.4): serializes an [`AnalysisOutput`] to the `.aard`
//! binary file.
//!
//! Grounded in `cache::Cache::persist` (`crates/ruff/src/cache.rs`):
//! serialize into an in-memory buffer, then perform a single `write_all`,
//! wrapping the io error in a typed variant rather than propagating it raw.
//! Unlike the cache (which hands off to `bincode`), the wire format here is
//! a fixed byte contract shared with the runtime, so encoding is
//! hand-rolled.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::access::Access;
use crate::analysis::{BasicBlock, FunctionContext, StatementRecord};
use crate::error::{AardError, Result};
use crate::ids::{Id, IdMap};

const MAGIC: &[u8; 7] = b"AARD/S1";

const TOKEN_STATEMENT: u8 = 0xFF;
const TOKEN_FUNCTION: u8 = 0xFE;
const TOKEN_FILENAMES: u8 = 0xFD;

const TAG_SCALAR: u8 = 0xE0;
const TAG_STRUCTURAL: u8 = 0xE1;
const TAG_ARRAY_LIKE: u8 = 0xE2;

const METADATA_TAG: u8 = 0x60;

/// Serializes one file's analysis to `out_path`. `values` is taken from the
/// [`AnalysisOutput`](crate::analysis::AnalysisOutput) this was built from;
/// the caller keeps the rest of the output (in particular `nodes`) alive for
/// the Instrumenter stage, so this function takes only what it consumes.
pub fn write_static_file(
    file_id: u64,
    contexts: &[FunctionContext],
    statements: &FxHashMap<Id, StatementRecord>,
    values: &mut IdMap<Access>,
    source_path: &Path,
    out_path: &Path,
) -> Result<()> {
    let buf = encode(file_id, contexts, statements, values, source_path);
    File::create(out_path)
        .and_then(|mut file| file.write_all(&buf))
        .map_err(|source| AardError::Write {
            path: out_path.to_path_buf(),
            source,
        })
}

fn encode(
    file_id: u64,
    contexts: &[FunctionContext],
    statements: &FxHashMap<Id, StatementRecord>,
    values: &mut IdMap<Access>,
    source_path: &Path,
) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(MAGIC);

    for context in contexts {
        if is_empty_context(context) {
            continue;
        }
        encode_function(file_id, context, statements, values, &mut buf);
    }

    encode_filenames(file_id, source_path, &mut buf);
    buf
}

// A context can have an empty entry block and still carry statements further
// in (e.g. a call-style decorator opens a fresh block before the body is
// visited, §4.3), so every block is checked rather than just the first.
fn is_empty_context(context: &FunctionContext) -> bool {
    context.blocks.iter().all(|block| block.statements.is_empty())
}

fn encode_function(
    file_id: u64,
    context: &FunctionContext,
    statements: &FxHashMap<Id, StatementRecord>,
    values: &mut IdMap<Access>,
    buf: &mut Vec<u8>,
) {
    buf.push(TOKEN_FUNCTION);
    push_cstr(&context.name, buf);
    for block in &context.blocks {
        encode_block(file_id, block, statements, values, buf);
    }
}

fn encode_block(
    file_id: u64,
    block: &BasicBlock,
    statements: &FxHashMap<Id, StatementRecord>,
    values: &mut IdMap<Access>,
    buf: &mut Vec<u8>,
) {
    for &stmt_id in &block.statements {
        let record = statements
            .get(&stmt_id)
            .expect("block references a statement id registered during analysis");
        encode_statement(file_id, record, values, buf);
    }
}

fn encode_statement(file_id: u64, record: &StatementRecord, values: &mut IdMap<Access>, buf: &mut Vec<u8>) {
    buf.push(TOKEN_STATEMENT);
    buf.extend_from_slice(&file_id.to_le_bytes());
    buf.extend_from_slice(&record.id.to_le_bytes());

    debug_assert!(
        record.successors.len() <= u8::MAX as usize,
        "too many successors for a u8 count"
    );
    buf.push(record.successors.len() as u8);
    for &succ in &record.successors {
        buf.extend_from_slice(&file_id.to_le_bytes());
        buf.extend_from_slice(&succ.to_le_bytes());
    }

    debug_assert!(record.defs.len() <= u8::MAX as usize, "too many defs for a u8 count");
    buf.push(record.defs.len() as u8);
    for access in &record.defs {
        encode_access(access, values, buf);
    }

    debug_assert!(record.uses.len() <= u8::MAX as usize, "too many uses for a u8 count");
    buf.push(record.uses.len() as u8);
    for access in &record.uses {
        encode_access(access, values, buf);
    }

    buf.extend_from_slice(&file_id.to_le_bytes());
    buf.extend_from_slice(&record.start_line.to_le_bytes());
    buf.extend_from_slice(&record.start_col.to_le_bytes());
    buf.extend_from_slice(&record.end_line.to_le_bytes());
    buf.extend_from_slice(&record.end_col.to_le_bytes());

    buf.push(if record.meta == 0 { 0 } else { METADATA_TAG | record.meta });
}

fn encode_access(access: &Access, values: &mut IdMap<Access>, buf: &mut Vec<u8>) {
    match access {
        Access::Scalar { .. } => {
            let value_id = values.get(access.clone());
            buf.push(TAG_SCALAR);
            buf.extend_from_slice(&value_id.to_le_bytes());
        }
        Access::Structural { base, field } => {
            buf.push(TAG_STRUCTURAL);
            encode_access(base, values, buf);
            encode_access(field, values, buf);
        }
        Access::ArrayLike { base, indices } => {
            buf.push(TAG_ARRAY_LIKE);
            encode_access(base, values, buf);
            debug_assert!(indices.len() <= u32::MAX as usize, "too many indices for a u32 count");
            buf.extend_from_slice(&(indices.len() as u32).to_le_bytes());
            for index in indices {
                encode_access(index, values, buf);
            }
        }
    }
}

fn encode_filenames(file_id: u64, source_path: &Path, buf: &mut Vec<u8>) {
    buf.push(TOKEN_FILENAMES);
    buf.extend_from_slice(&1u32.to_le_bytes());
    buf.extend_from_slice(&file_id.to_le_bytes());
    push_cstr(&source_path.to_string_lossy(), buf);
}

fn push_cstr(s: &str, buf: &mut Vec<u8>) {
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Analysis;
    use crate::normalize::normalize;
    use crate::symbols;
    use rustpython_parser::parser::parse_program;

    #[test]
    fn magic_and_filenames_always_present() {
        let mut body = parse_program("x = 1\n", "<test>").unwrap();
        normalize(&mut body);
        let symbols = symbols::build(&body);
        let mut output = Analysis::new(&symbols, 1).run(&body);
        let buf = encode(
            output.file_id,
            &output.contexts,
            &output.statements,
            &mut output.values,
            Path::new("mod.py"),
        );
        assert_eq!(&buf[..7], MAGIC);
        assert!(buf.contains(&TOKEN_FILENAMES));
        assert!(buf.ends_with(b"mod.py\0"));
    }

    #[test]
    fn empty_function_is_skipped_but_normalized_return_is_not() {
        let mut body = parse_program("def foo():\n    pass\n", "<test>").unwrap();
        normalize(&mut body);
        let symbols = symbols::build(&body);
        let mut output = Analysis::new(&symbols, 1).run(&body);
        let buf = encode(
            output.file_id,
            &output.contexts,
            &output.statements,
            &mut output.values,
            Path::new("mod.py"),
        );
        // `pass` contributes no statement, but the Normalizer appends an
        // explicit `return None`, so the context's first block is non-empty
        // and FUNCTION must still appear.
        assert!(buf.contains(&TOKEN_FUNCTION));
    }

    #[test]
    fn writes_file_to_disk() {
        let mut body = parse_program("def foo(bar):\n    return bar\n", "<test>").unwrap();
        normalize(&mut body);
        let symbols = symbols::build(&body);
        let mut output = Analysis::new(&symbols, 1).run(&body);

        let out_path =
            std::env::temp_dir().join(format!("aardwolf-static-writer-test-{}.aard", std::process::id()));
        write_static_file(
            output.file_id,
            &output.contexts,
            &output.statements,
            &mut output.values,
            Path::new("mod.py"),
            &out_path,
        )
        .unwrap();
        let bytes = std::fs::read(&out_path).unwrap();
        assert_eq!(&bytes[..7], MAGIC);
        let _ = std::fs::remove_file(&out_path);
    }
}
