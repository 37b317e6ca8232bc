//! Aardwolf: a static-analysis and trace-instrumentation frontend for fault
//! localization in a dynamically-typed scripting language.
//!
//! Mirrors `ruff_linter`'s top-level module list (`crates/ruff_linter/src/
//! lib.rs`): one module per pipeline stage, a shared `error` module, and a
//! `commands` module the binary drives.

pub mod access;
pub mod analysis;
pub mod args;
pub mod commands;
pub mod error;
pub mod ids;
pub mod instrument;
pub mod normalize;
pub mod runtime;
pub mod static_writer;
pub mod symbols;
