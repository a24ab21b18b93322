//! Immutable run configuration plus the top-level orchestration that wires
//! the input queue, worker pool, and result sink together and returns one
//! aggregated report.
//!
//! Grounded on spec.md §9's guidance to split immutable configuration from
//! the mutable coordination channels (no `Context` god-object bundling
//! queues and counters together, unlike `chkbit/context.py`), and on the
//! teacher's `hash/scan.rs` for spawning a channel-fed worker set and
//! joining it before handing back a summary.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use super::error::EngineError;
use super::record::Algo;
use super::sink::{ResultSink, RunReport};
use super::worker::{InputItem, Job, WorkerPool};

/// Immutable settings shared by every worker for the lifetime of one run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub num_workers: usize,
    pub force: bool,
    pub update: bool,
    pub default_algo: Algo,
    pub skip_symlinks: bool,
    pub index_filename: String,
    pub ignore_filename: String,
    pub show_ignored_only: bool,
}

impl EngineConfig {
    /// Validates the mutually-exclusive-flags and algorithm-name
    /// configuration errors from spec.md §7 up front, before any worker
    /// starts.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        num_workers: usize,
        force: bool,
        update: bool,
        algo: &str,
        skip_symlinks: bool,
        index_filename: impl Into<String>,
        ignore_filename: impl Into<String>,
        show_ignored_only: bool,
    ) -> Result<Self, EngineError> {
        if update && show_ignored_only {
            return Err(EngineError::MutuallyExclusiveFlags {
                a: "update",
                b: "show-ignored-only",
            });
        }

        Ok(Self {
            num_workers: num_workers.max(1),
            force,
            update,
            default_algo: Algo::parse(algo)?,
            skip_symlinks,
            index_filename: index_filename.into(),
            ignore_filename: ignore_filename.into(),
            show_ignored_only,
        })
    }
}

/// Runs the engine to completion over `roots`, returning the aggregated
/// report once every directory has been visited.
///
/// Cancellation (spec.md §5) is cooperative and lives at the CLI layer: the
/// caller can run this on its own thread and, on a signal, stop feeding new
/// work and let in-flight jobs drain — the queue and pending counter here
/// don't need to know anything about signals.
/// `on_event` is invoked once per event, in the sink thread, before it's
/// folded into the aggregate — this is the hook the CLI layer uses to print
/// live status lines without the engine itself ever touching stdout.
///
/// `cancel` is shared with the caller's signal handler: setting it mid-run
/// makes every worker discard its remaining queued jobs instead of
/// processing them (spec.md §5's cooperative cancellation), while still
/// letting the pending-job accounting unwind cleanly so `run` returns
/// instead of hanging.
pub fn run(
    config: EngineConfig,
    roots: Vec<PathBuf>,
    mut on_event: impl FnMut(&super::record::Event) + Send + 'static,
    cancel: Arc<AtomicBool>,
) -> Result<RunReport, EngineError> {
    for root in &roots {
        let metadata = fs::metadata(root).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                EngineError::RootNotFound { path: root.clone() }
            } else {
                EngineError::from_io_error(e, "reading", Some(root.clone()))
            }
        })?;
        if !metadata.is_dir() {
            return Err(EngineError::RootNotADirectory { path: root.clone() });
        }
    }

    let config = Arc::new(config);
    let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job>();
    let (event_tx, event_rx) = crossbeam_channel::unbounded();
    let pending = Arc::new(AtomicUsize::new(0));
    let started = Instant::now();

    let sink_handle = thread::spawn(move || {
        let mut sink = ResultSink::new();
        while let Ok(event) = event_rx.recv() {
            on_event(&event);
            sink.record(event);
        }
        sink
    });

    pending.fetch_add(roots.len(), Ordering::SeqCst);
    for root in roots {
        let _ = job_tx.send(Job::Process(InputItem {
            path: root,
            parent_scope: None,
        }));
    }

    let pool = WorkerPool::spawn(
        config.num_workers,
        job_tx.clone(),
        job_rx,
        event_tx.clone(),
        Arc::clone(&pending),
        Arc::clone(&config),
        cancel,
    );
    drop(job_tx);
    drop(event_tx);
    pool.join();

    let sink = sink_handle.join().expect("result sink thread panicked");
    Ok(sink.into_report(started.elapsed()))
}
