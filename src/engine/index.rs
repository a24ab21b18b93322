//! Per-directory index: load, hash, classify, and persist.
//!
//! Grounded on `examples/original_source/chkbit/index.py`'s `Index` class for
//! the classification table and the load/update/check_fix/save lifecycle,
//! and on the teacher's `hash/error.rs` style for surfacing I/O failures.
//! The on-disk canonical encoding relies on `serde_json`'s `preserve_order`
//! feature: parsed `idx` objects keep the key order they were written in, so
//! re-serializing for `idx_hash` verification reproduces the original bytes
//! exactly, and newly built indexes keep directory-listing order the same
//! way.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde_json::Value;

use super::error::EngineError;
use super::hash::{hash_file, hash_text};
use super::ignore::IgnoreScope;
use super::record::{Algo, Event, FileRecord, Status};

pub struct DirectoryIndex {
    dir: PathBuf,
    index_filename: String,
    old: HashMap<String, FileRecord>,
    new: Vec<(String, FileRecord)>,
    modified: bool,
    readonly: bool,
}

#[derive(Deserialize)]
struct LegacyEntry {
    name: String,
    #[serde(rename = "mod")]
    mtime_ms: i64,
    md5: String,
}

enum ParsedIndex {
    Current(HashMap<String, FileRecord>),
    Legacy(HashMap<String, FileRecord>),
    Malformed,
}

impl DirectoryIndex {
    /// Loads `<dir>/<index_filename>` if present. A missing file is not an
    /// error — `old` stays empty. A present but unparsable or tampered file
    /// produces one `ErrIdx` event and also leaves `old` empty, forcing
    /// every file in the directory to classify as `New` on this run and the
    /// index to be rewritten on save.
    pub fn load(dir: &Path, index_filename: &str, readonly: bool) -> Result<(Self, Vec<Event>), EngineError> {
        let path = dir.join(index_filename);
        let empty = || Self {
            dir: dir.to_path_buf(),
            index_filename: index_filename.to_string(),
            old: HashMap::new(),
            new: Vec::new(),
            modified: false,
            readonly,
        };

        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((empty(), Vec::new())),
            Err(e) => return Err(EngineError::from_io_error(e, "reading index", Some(path))),
        };

        match parse_index(&text) {
            ParsedIndex::Current(old) => {
                let mut index = empty();
                index.old = old;
                Ok((index, Vec::new()))
            }
            ParsedIndex::Legacy(old) => {
                let mut index = empty();
                index.old = old;
                Ok((index, Vec::new()))
            }
            ParsedIndex::Malformed => {
                let mut index = empty();
                index.modified = true;
                let event = Event::classification(Status::ErrIdx, path.display().to_string());
                Ok((index, vec![event]))
            }
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn full_path(&self, name: &str) -> String {
        self.dir.join(name).display().to_string()
    }

    /// Hashes every non-ignored name in `files`, appending to `new`.
    /// Ignored names never enter `new` at all — they are simply absent from
    /// the rewritten index.
    pub fn calc_hashes(
        &mut self,
        scope: &IgnoreScope,
        files: &[String],
        default_algo: Algo,
    ) -> Result<Vec<Event>, EngineError> {
        let mut events = Vec::new();

        for name in files {
            if scope.should_ignore(name, None) {
                events.push(Event::classification(Status::Ignore, self.full_path(name)));
                continue;
            }

            let algo = match self.old.get(name) {
                Some(record) => record.algo,
                None => default_algo,
            };

            if self.readonly && !self.old.contains_key(name) {
                self.new.push((
                    name.clone(),
                    FileRecord {
                        mtime_ms: None,
                        algo,
                        hash: None,
                    },
                ));
                continue;
            }

            let path = self.dir.join(name);
            let metadata = fs::metadata(&path)
                .map_err(|e| EngineError::from_io_error(e, "reading metadata for", Some(path.clone())))?;
            let mtime = metadata
                .modified()
                .map_err(|e| EngineError::from_io_error(e, "reading mtime for", Some(path.clone())))?;
            let mtime_ms = mtime
                .duration_since(UNIX_EPOCH)
                .map(|d| (d.as_secs_f64() * 1000.0).floor() as i64)
                .unwrap_or(0);

            let hash = hash_file(&path, algo, |bytes| {
                events.push(Event::Throughput {
                    files_delta: 0,
                    bytes_delta: bytes,
                });
            })?;
            events.push(Event::Throughput {
                files_delta: 1,
                bytes_delta: 0,
            });

            self.new.push((
                name.clone(),
                FileRecord {
                    mtime_ms: Some(mtime_ms),
                    algo,
                    hash: Some(hash),
                },
            ));
        }

        Ok(events)
    }

    /// Compares every entry in `new` against `old`, classifying each and
    /// deciding whether the index needs rewriting.
    pub fn check_fix(&mut self, force: bool) -> Vec<Event> {
        let mut events = Vec::new();
        let dir = self.dir.clone();

        for (name, new_record) in self.new.iter_mut() {
            let full = dir.join(name.as_str()).display().to_string();

            match self.old.get(name) {
                None => {
                    events.push(Event::classification(Status::New, full));
                    self.modified = true;
                }
                Some(old_record) => {
                    let hash_matches = old_record.hash == new_record.hash;
                    let mtime_matches = old_record.mtime_ms == new_record.mtime_ms;

                    if hash_matches {
                        events.push(Event::classification(Status::Ok, full));
                        if !mtime_matches {
                            self.modified = true;
                        }
                    } else if mtime_matches {
                        events.push(Event::classification(Status::ErrDmg, full));
                        if force {
                            self.modified = true;
                        } else {
                            *new_record = old_record.clone();
                        }
                    } else if old_record.mtime_ms < new_record.mtime_ms {
                        events.push(Event::classification(Status::Update, full));
                        self.modified = true;
                    } else {
                        events.push(Event::classification(Status::WarnOld, full));
                        self.modified = true;
                    }
                }
            }
        }

        events
    }

    /// Emits an `Ignore` event for every name the scope would exclude,
    /// touching neither the filesystem nor the index file.
    pub fn show_ignored_only(&self, scope: &IgnoreScope, files: &[String]) -> Vec<Event> {
        files
            .iter()
            .filter(|name| scope.should_ignore(name, None))
            .map(|name| Event::classification(Status::Ignore, self.full_path(name)))
            .collect()
    }

    /// No-op if nothing changed. Otherwise writes the canonical `{v, idx,
    /// idx_hash}` document to a temp file and renames it into place, so a
    /// crash mid-write never leaves a half-written index behind.
    pub fn save(&mut self) -> Result<bool, EngineError> {
        if !self.modified {
            return Ok(false);
        }
        debug_assert!(!self.readonly, "save() must never run in read-only mode");

        let idx_text = canonical_idx_text(&self.new)?;
        let idx_hash = hash_text(&idx_text);
        let body = format!(r#"{{"v":2,"idx":{idx_text},"idx_hash":"{idx_hash}"}}"#);

        let path = self.dir.join(&self.index_filename);
        let tmp_path = self.dir.join(format!("{}.tmp", self.index_filename));

        fs::write(&tmp_path, body.as_bytes())
            .map_err(|e| EngineError::from_io_error(e, "writing index", Some(tmp_path.clone())))?;
        fs::rename(&tmp_path, &path)
            .map_err(|e| EngineError::from_io_error(e, "renaming index", Some(path.clone())))?;

        self.modified = false;
        Ok(true)
    }
}

/// Builds the compact, insertion-ordered JSON text of `new` that both the
/// on-disk `idx` field and its `idx_hash` are computed from.
fn canonical_idx_text(new: &[(String, FileRecord)]) -> Result<String, EngineError> {
    let mut map = serde_json::Map::new();
    for (name, record) in new {
        let value = serde_json::to_value(record).map_err(|e| {
            EngineError::IoError {
                path: None,
                operation: "encoding index record".to_string(),
                source: io::Error::new(io::ErrorKind::InvalidData, e),
            }
        })?;
        map.insert(name.clone(), value);
    }
    serde_json::to_string(&Value::Object(map)).map_err(|e| EngineError::IoError {
        path: None,
        operation: "encoding index".to_string(),
        source: io::Error::new(io::ErrorKind::InvalidData, e),
    })
}

fn parse_index(text: &str) -> ParsedIndex {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => return ParsedIndex::Malformed,
    };

    let Value::Object(obj) = &value else {
        return ParsedIndex::Malformed;
    };

    if obj.get("v").and_then(Value::as_i64) == Some(2) {
        let Some(idx_value) = obj.get("idx") else {
            return ParsedIndex::Malformed;
        };
        let Value::Object(idx_obj) = idx_value else {
            return ParsedIndex::Malformed;
        };

        let canonical = match serde_json::to_string(idx_value) {
            Ok(text) => text,
            Err(_) => return ParsedIndex::Malformed,
        };
        let computed = hash_text(&canonical);
        if obj.get("idx_hash").and_then(Value::as_str) != Some(computed.as_str()) {
            return ParsedIndex::Malformed;
        }

        let mut old = HashMap::new();
        for (name, record_value) in idx_obj {
            match serde_json::from_value::<FileRecord>(record_value.clone()) {
                Ok(record) => {
                    old.insert(name.clone(), record);
                }
                Err(_) => return ParsedIndex::Malformed,
            }
        }
        return ParsedIndex::Current(old);
    }

    if let Some(Value::String(data_str)) = obj.get("data") {
        return match serde_json::from_str::<Vec<LegacyEntry>>(data_str) {
            Ok(entries) => {
                let mut old = HashMap::new();
                for entry in entries {
                    old.insert(
                        entry.name,
                        FileRecord {
                            mtime_ms: Some(entry.mtime_ms),
                            algo: Algo::Md5,
                            hash: Some(entry.md5),
                        },
                    );
                }
                ParsedIndex::Legacy(old)
            }
            Err(_) => ParsedIndex::Malformed,
        };
    }

    ParsedIndex::Malformed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(mtime_ms: i64, algo: Algo, hash: &str) -> FileRecord {
        FileRecord {
            mtime_ms: Some(mtime_ms),
            algo,
            hash: Some(hash.to_string()),
        }
    }

    #[test]
    fn missing_index_loads_as_empty() {
        let dir = tempdir().unwrap();
        let (index, events) = DirectoryIndex::load(dir.path(), ".chkbit", false).unwrap();
        assert!(events.is_empty());
        assert!(index.old.is_empty());
        assert!(!index.modified);
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = tempdir().unwrap();
        let mut index = DirectoryIndex {
            dir: dir.path().to_path_buf(),
            index_filename: ".chkbit".to_string(),
            old: HashMap::new(),
            new: vec![
                ("a.bin".to_string(), record(1000, Algo::Blake3, "abcd")),
                ("b.bin".to_string(), record(2000, Algo::Md5, "ef01")),
            ],
            modified: true,
            readonly: false,
        };
        index.save().unwrap();

        let (loaded, events) = DirectoryIndex::load(dir.path(), ".chkbit", false).unwrap();
        assert!(events.is_empty());
        assert_eq!(loaded.old.get("a.bin"), Some(&record(1000, Algo::Blake3, "abcd")));
        assert_eq!(loaded.old.get("b.bin"), Some(&record(2000, Algo::Md5, "ef01")));
    }

    #[test]
    fn tampered_idx_hash_reports_err_idx_and_loads_as_empty() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(".chkbit"),
            r#"{"v":2,"idx":{"a.bin":{"mod":1,"a":"md5","h":"x"}},"idx_hash":"0000"}"#,
        )
        .unwrap();

        let (index, events) = DirectoryIndex::load(dir.path(), ".chkbit", false).unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::Classification { status, .. } => assert_eq!(*status, Status::ErrIdx),
            _ => panic!("expected a classification event"),
        }
        assert!(index.old.is_empty());
        assert!(index.modified);
    }

    #[test]
    fn legacy_format_migrates_to_md5_records() {
        let dir = tempdir().unwrap();
        let data = r#"[{"name":"a.bin","mod":1234,"md5":"deadbeef"}]"#;
        let body = serde_json::json!({ "data": data }).to_string();
        fs::write(dir.path().join(".chkbit"), body).unwrap();

        let (index, events) = DirectoryIndex::load(dir.path(), ".chkbit", false).unwrap();
        assert!(events.is_empty());
        assert_eq!(
            index.old.get("a.bin"),
            Some(&record(1234, Algo::Md5, "deadbeef"))
        );
    }

    #[test]
    fn check_fix_classifies_new_ok_damage_update_and_rollback() {
        let dir = tempdir().unwrap();
        let mut old = HashMap::new();
        old.insert("ok.bin".to_string(), record(100, Algo::Md5, "same"));
        old.insert("dmg.bin".to_string(), record(100, Algo::Md5, "before"));
        old.insert("upd.bin".to_string(), record(100, Algo::Md5, "before"));
        old.insert("rollback.bin".to_string(), record(200, Algo::Md5, "before"));

        let mut index = DirectoryIndex {
            dir: dir.path().to_path_buf(),
            index_filename: ".chkbit".to_string(),
            old,
            new: vec![
                ("new.bin".to_string(), record(100, Algo::Md5, "fresh")),
                ("ok.bin".to_string(), record(100, Algo::Md5, "same")),
                ("dmg.bin".to_string(), record(100, Algo::Md5, "after")),
                ("upd.bin".to_string(), record(200, Algo::Md5, "after")),
                ("rollback.bin".to_string(), record(100, Algo::Md5, "after")),
            ],
            modified: false,
            readonly: false,
        };

        let events = index.check_fix(false);
        let statuses: Vec<Status> = events
            .iter()
            .map(|e| match e {
                Event::Classification { status, .. } => *status,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(
            statuses,
            vec![
                Status::New,
                Status::Ok,
                Status::ErrDmg,
                Status::Update,
                Status::WarnOld,
            ]
        );
        assert!(index.modified);
        // Damage is preserved verbatim, not overwritten with the new (bad) hash.
        assert_eq!(
            index.new.iter().find(|(n, _)| n == "dmg.bin").map(|(_, r)| r),
            Some(&record(100, Algo::Md5, "before"))
        );
    }

    #[test]
    fn check_fix_with_force_keeps_new_hash_for_damage() {
        let dir = tempdir().unwrap();
        let mut old = HashMap::new();
        old.insert("dmg.bin".to_string(), record(100, Algo::Md5, "before"));

        let mut index = DirectoryIndex {
            dir: dir.path().to_path_buf(),
            index_filename: ".chkbit".to_string(),
            old,
            new: vec![("dmg.bin".to_string(), record(100, Algo::Md5, "after"))],
            modified: false,
            readonly: false,
        };

        index.check_fix(true);
        assert_eq!(
            index.new.iter().find(|(n, _)| n == "dmg.bin").map(|(_, r)| r),
            Some(&record(100, Algo::Md5, "after"))
        );
    }
}
