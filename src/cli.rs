//! Command-line surface (spec.md §6, informative — not part of the core
//! engine). Flag layout follows `chkbit_cli/main.py`'s newer `Context`-based
//! CLI; the `#[derive(Parser)]` style itself is adopted from the
//! `codescope` pack example, since the teacher's own `clap` dependency goes
//! unused by its binary.

use std::path::PathBuf;

use clap::Parser;

use crate::engine::EngineError;

#[derive(Parser, Debug)]
#[command(name = "bitwatch", version, about = "Detects silent data corruption in files at rest")]
pub struct Cli {
    /// One or more directory trees to check.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Update indexes on disk instead of running read-only.
    #[arg(short = 'u', long)]
    pub update: bool,

    /// When damage is found, overwrite the stored record with the new hash.
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Don't descend into symlinked directories.
    #[arg(short = 's', long = "skip-symlinks")]
    pub skip_symlinks: bool,

    /// Hash algorithm for newly seen files.
    #[arg(long, default_value = "blake3", value_parser = ["md5", "sha512", "blake3"])]
    pub algo: String,

    /// Report what would be ignored and do nothing else.
    #[arg(long = "show-ignored-only")]
    pub show_ignored_only: bool,

    /// Filename used for the per-directory index.
    #[arg(long = "index-name", default_value = ".chkbit")]
    pub index_name: String,

    /// Filename used for per-directory ignore patterns.
    #[arg(long = "ignore-name", default_value = ".chkbitignore")]
    pub ignore_name: String,

    /// Number of worker threads.
    #[arg(short = 'w', long, default_value_t = 5)]
    pub workers: usize,

    /// Suppress per-file status lines; only print the final summary.
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Print every classification, including `ok`/`ign`.
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Disable ANSI styling regardless of terminal support.
    #[arg(long)]
    pub plain: bool,

    /// Append status lines to this file as the run proceeds.
    #[arg(short = 'l', long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// Include `ok`/`ign` lines in the log file too.
    #[arg(long = "log-verbose")]
    pub log_verbose: bool,
}

impl Cli {
    /// Validates cross-flag constraints clap's own derive can't express
    /// (spec.md §7's "mutually exclusive flags" configuration error).
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.update && self.show_ignored_only {
            return Err(EngineError::MutuallyExclusiveFlags {
                a: "update",
                b: "show-ignored-only",
            });
        }
        Ok(())
    }
}
