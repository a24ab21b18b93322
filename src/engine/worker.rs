//! Fixed-size worker pool that drains directory jobs from one queue and
//! fans newly discovered subdirectories back onto it.
//!
//! Grounded on `examples/original_source/chkbit/indexthread.py`'s per-
//! directory loop (list → build index → update → check_fix → save → enqueue
//! children, with the whole body wrapped in one exception handler per
//! directory) and on the teacher's `hash/scan.rs` producer/consumer use of
//! `crossbeam_channel`, generalized from a single walker thread feeding a
//! rayon bridge to N symmetric workers that both consume and produce jobs
//! on the same queue.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use super::engine::EngineConfig;
use super::error::EngineError;
use super::ignore::IgnoreScope;
use super::index::DirectoryIndex;
use super::record::{Event, Status};

/// A unit of work: a directory to process, plus the ignore scope of its
/// parent (`None` for a user-supplied root).
pub struct InputItem {
    pub path: PathBuf,
    pub parent_scope: Option<Arc<IgnoreScope>>,
}

pub enum Job {
    Process(InputItem),
    Shutdown,
}

pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(
        num_workers: usize,
        job_tx: Sender<Job>,
        job_rx: Receiver<Job>,
        event_tx: Sender<Event>,
        pending: Arc<AtomicUsize>,
        config: Arc<EngineConfig>,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        let handles = (0..num_workers)
            .map(|_| {
                let job_tx = job_tx.clone();
                let job_rx = job_rx.clone();
                let event_tx = event_tx.clone();
                let pending = Arc::clone(&pending);
                let config = Arc::clone(&config);
                let cancel = Arc::clone(&cancel);
                thread::spawn(move || worker_loop(num_workers, job_tx, job_rx, event_tx, pending, config, cancel))
            })
            .collect();

        Self { handles }
    }

    pub fn join(self) {
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    num_workers: usize,
    job_tx: Sender<Job>,
    job_rx: Receiver<Job>,
    event_tx: Sender<Event>,
    pending: Arc<AtomicUsize>,
    config: Arc<EngineConfig>,
    cancel: Arc<AtomicBool>,
) {
    loop {
        let job = match job_rx.recv() {
            Ok(job) => job,
            Err(_) => break,
        };

        let item = match job {
            Job::Shutdown => break,
            Job::Process(item) => item,
        };

        // On cancellation, the remaining queue is discarded rather than
        // processed: each worker keeps draining jobs (so the pending
        // counter still reaches zero and the shutdown sentinels still go
        // out) but stops doing real work immediately.
        if !cancel.load(Ordering::SeqCst) {
            let dir = item.path.clone();
            match process_job(&dir, item.parent_scope.clone(), &config) {
                Ok((events, subdirs)) => {
                    for event in events {
                        let _ = event_tx.send(event);
                    }
                    for (path, scope) in subdirs {
                        pending.fetch_add(1, Ordering::SeqCst);
                        let _ = job_tx.send(Job::Process(InputItem {
                            path,
                            parent_scope: Some(scope),
                        }));
                    }
                }
                Err(err) => {
                    let _ = event_tx.send(Event::classification(
                        Status::InternalException,
                        format!("{}: {err}", dir.display()),
                    ));
                }
            }
        }

        if pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            for _ in 0..num_workers {
                let _ = job_tx.send(Job::Shutdown);
            }
        }
    }
}

/// Lists `dir`, loads its index, hashes and classifies its files, saves if
/// needed, and works out which subdirectories should be enqueued next.
///
/// Everything from listing through saving runs inside this one call; any
/// failure anywhere in it is surfaced as a single `Err` so the caller can
/// report it as one `InternalException` for the whole directory, matching
/// the reference implementation's per-directory exception boundary.
fn process_job(
    dir: &Path,
    parent_scope: Option<Arc<IgnoreScope>>,
    config: &EngineConfig,
) -> Result<(Vec<Event>, Vec<(PathBuf, Arc<IgnoreScope>)>), EngineError> {
    let mut events = Vec::new();
    let mut file_names = Vec::new();
    let mut subdir_names = Vec::new();

    let entries = fs::read_dir(dir).map_err(|e| EngineError::from_io_error(e, "listing", Some(dir.to_path_buf())))?;
    for entry in entries {
        let entry = entry.map_err(|e| EngineError::from_io_error(e, "listing", Some(dir.to_path_buf())))?;
        let name = entry.file_name().to_string_lossy().into_owned();

        if name == config.index_filename || name == config.ignore_filename {
            continue;
        }

        if name.starts_with('.') {
            if config.show_ignored_only {
                events.push(Event::classification(Status::Ignore, dir.join(&name).display().to_string()));
            }
            continue;
        }

        let file_type = entry
            .file_type()
            .map_err(|e| EngineError::from_io_error(e, "reading file type for", Some(entry.path())))?;

        if file_type.is_dir() {
            subdir_names.push(name);
        } else if file_type.is_symlink() {
            let target_is_dir = fs::metadata(entry.path()).map(|m| m.is_dir()).unwrap_or(false);
            if target_is_dir {
                if !config.skip_symlinks {
                    subdir_names.push(name);
                }
            } else {
                file_names.push(name);
            }
        } else {
            file_names.push(name);
        }
    }

    let scope = Arc::new(match &parent_scope {
        Some(parent) => IgnoreScope::child(dir, &config.ignore_filename, Arc::clone(parent)),
        None => IgnoreScope::root(dir, &config.ignore_filename),
    });

    let (mut index, load_events) = DirectoryIndex::load(dir, &config.index_filename, !config.update)?;
    events.extend(load_events);

    if config.show_ignored_only {
        events.extend(index.show_ignored_only(&scope, &file_names));
    } else {
        events.extend(index.calc_hashes(&scope, &file_names, config.default_algo)?);
        events.extend(index.check_fix(config.force));

        if config.update && index.save()? {
            events.push(Event::classification(Status::UpdateIndex, dir.display().to_string()));
        }
    }

    let mut subdirs = Vec::new();
    for name in subdir_names {
        if scope.should_ignore(&name, None) {
            events.push(Event::classification(
                Status::Ignore,
                format!("{}/", dir.join(&name).display()),
            ));
        } else {
            subdirs.push((dir.join(&name), Arc::clone(&scope)));
        }
    }

    Ok((events, subdirs))
}
