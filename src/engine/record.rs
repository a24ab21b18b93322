//! Core data model: hash algorithms, per-file records, classification
//! status codes, and the events workers publish to the result sink.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::EngineError;

/// Hash algorithm tag stored alongside a file's digest.
///
/// Different files in the same index may use different algorithms: an
/// existing record's algorithm is honored on re-hash even if the engine's
/// configured default differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algo {
    Md5,
    Sha512,
    Blake3,
}

impl Algo {
    pub fn parse(name: &str) -> Result<Self, EngineError> {
        match name {
            "md5" => Ok(Algo::Md5),
            "sha512" => Ok(Algo::Sha512),
            "blake3" => Ok(Algo::Blake3),
            other => Err(EngineError::UnsupportedAlgorithm {
                algorithm: other.to_string(),
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Algo::Md5 => "md5",
            Algo::Sha512 => "sha512",
            Algo::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for Algo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file's stored state: the mtime observed when it was last hashed, the
/// algorithm used, and the resulting digest.
///
/// `mtime_ms`/`hash` are `None` only for placeholder records written in
/// read-only mode for files the engine has never seen before (it avoids
/// hashing them, but still has to record that they exist).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(rename = "mod")]
    pub mtime_ms: Option<i64>,
    #[serde(rename = "a")]
    pub algo: Algo,
    #[serde(rename = "h")]
    pub hash: Option<String>,
}

/// Human-visible classification of a single file, or of the worker pool
/// hitting an unexpected error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    ErrDmg,
    ErrIdx,
    WarnOld,
    New,
    Update,
    Ok,
    Ignore,
    UpdateIndex,
    InternalException,
}

impl Status {
    /// The fixed-width status code printed by the CLI renderer.
    pub fn code(self) -> &'static str {
        match self {
            Status::ErrDmg => "DMG",
            Status::ErrIdx => "EIX",
            Status::WarnOld => "old",
            Status::New => "new",
            Status::Update => "upd",
            Status::Ok => "ok ",
            Status::Ignore => "ign",
            Status::UpdateIndex => "iup",
            Status::InternalException => "EXC",
        }
    }
}

/// Published by workers to the [`super::sink::ResultSink`].
#[derive(Debug, Clone)]
pub enum Event {
    Classification { status: Status, path: String },
    Throughput { files_delta: u64, bytes_delta: u64 },
}

impl Event {
    pub fn classification(status: Status, path: impl Into<String>) -> Self {
        Event::Classification {
            status,
            path: path.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algo_round_trips_through_strings() {
        for algo in [Algo::Md5, Algo::Sha512, Algo::Blake3] {
            assert_eq!(Algo::parse(algo.as_str()).unwrap(), algo);
        }
    }

    #[test]
    fn unknown_algo_is_a_config_error() {
        assert!(Algo::parse("sha256").is_err());
    }

    #[test]
    fn file_record_serializes_with_short_field_names() {
        let record = FileRecord {
            mtime_ms: Some(1000),
            algo: Algo::Blake3,
            hash: Some("abcd".to_string()),
        };
        let text = serde_json::to_string(&record).unwrap();
        assert_eq!(text, r#"{"mod":1000,"a":"blake3","h":"abcd"}"#);
    }

    #[test]
    fn placeholder_record_serializes_nulls() {
        let record = FileRecord {
            mtime_ms: None,
            algo: Algo::Md5,
            hash: None,
        };
        let text = serde_json::to_string(&record).unwrap();
        assert_eq!(text, r#"{"mod":null,"a":"md5","h":null}"#);
    }
}
