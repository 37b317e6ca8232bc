//! Subcommand glue the binary drives (mirrors ruff's `commands` module
//! layout, one file per subcommand; this crate has only one).

pub mod check;
