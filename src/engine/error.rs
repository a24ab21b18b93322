//! Engine-level errors.
//!
//! These are reserved for fatal, pre-work configuration failures (unknown
//! algorithm, mutually exclusive flags, a root path that doesn't exist).
//! Per-directory and per-file failures never reach this type: they are
//! caught at the worker boundary and turned into
//! `Event::Classification { status: Status::InternalException, .. }` so one
//! bad directory can't take down the run.

use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum EngineError {
    UnsupportedAlgorithm {
        algorithm: String,
    },
    MutuallyExclusiveFlags {
        a: &'static str,
        b: &'static str,
    },
    RootNotFound {
        path: PathBuf,
    },
    RootNotADirectory {
        path: PathBuf,
    },
    IoError {
        path: Option<PathBuf>,
        operation: String,
        source: io::Error,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::UnsupportedAlgorithm { algorithm } => {
                write!(f, "unsupported hash algorithm: {algorithm}\n")?;
                write!(f, "suggestion: use one of md5, sha512, blake3")
            }
            EngineError::MutuallyExclusiveFlags { a, b } => {
                write!(f, "--{a} and --{b} cannot be used together")
            }
            EngineError::RootNotFound { path } => {
                write!(f, "path not found: {}", path.display())
            }
            EngineError::RootNotADirectory { path } => {
                write!(f, "not a directory: {}", path.display())
            }
            EngineError::IoError {
                path,
                operation,
                source,
            } => {
                if let Some(p) = path {
                    write!(f, "I/O error while {operation} {}: {source}", p.display())
                } else {
                    write!(f, "I/O error while {operation}: {source}")
                }
            }
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::IoError { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl EngineError {
    pub fn from_io_error(err: io::Error, operation: &str, path: Option<PathBuf>) -> Self {
        match (err.kind(), path) {
            (io::ErrorKind::NotFound, Some(p)) => EngineError::RootNotFound { path: p },
            (_, path) => EngineError::IoError {
                path,
                operation: operation.to_string(),
                source: err,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
