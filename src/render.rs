//! Terminal rendering: per-file status lines, an `indicatif` progress
//! spinner driven by `Throughput` events, and an optional plain-text log
//! file. External to the engine core per spec.md §1/§6 — replaceable,
//! and the only place in this crate that prints.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use chrono::Local;
use indicatif::ProgressBar;

use crate::engine::{Event, RunReport, Status};

pub struct Renderer {
    quiet: bool,
    verbose: bool,
    use_color: bool,
    log_file: Option<File>,
    log_verbose: bool,
    progress: Option<ProgressBar>,
}

impl Renderer {
    pub fn new(
        quiet: bool,
        verbose: bool,
        plain: bool,
        log_path: Option<&Path>,
        log_verbose: bool,
    ) -> io::Result<Self> {
        let use_color = !plain && std::env::var_os("NO_COLOR").is_none();

        let log_file = match log_path {
            Some(path) => Some(OpenOptions::new().create(true).append(true).open(path)?),
            None => None,
        };

        let progress = if quiet {
            None
        } else {
            let bar = ProgressBar::new_spinner();
            bar.enable_steady_tick(Duration::from_millis(120));
            Some(bar)
        };

        Ok(Self {
            quiet,
            verbose,
            use_color,
            log_file,
            log_verbose,
            progress,
        })
    }

    /// Called from the engine's per-event hook as the run proceeds.
    pub fn handle_event(&mut self, event: &Event) {
        match event {
            Event::Classification { status, path } => self.handle_classification(*status, path),
            Event::Throughput { bytes_delta, .. } => {
                if let Some(bar) = &self.progress {
                    bar.inc(*bytes_delta);
                }
            }
        }
    }

    fn handle_classification(&mut self, status: Status, path: &str) {
        let line = format!("{} {}", status.code(), path);
        let quiet_in_terminal = matches!(status, Status::Ok | Status::Ignore) && !self.verbose;

        if !self.quiet && !quiet_in_terminal {
            let styled = self.style(status, &line);
            match &self.progress {
                Some(bar) => bar.println(styled),
                None => println!("{styled}"),
            }
        }

        if let Some(file) = &mut self.log_file {
            let quiet_in_log = matches!(status, Status::Ok | Status::Ignore) && !self.log_verbose;
            if !quiet_in_log {
                let stamp = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f");
                let _ = writeln!(file, "{stamp} {line}");
            }
        }
    }

    fn style(&self, status: Status, line: &str) -> String {
        if !self.use_color {
            return line.to_string();
        }
        let color = match status {
            Status::ErrDmg | Status::ErrIdx | Status::InternalException => "\x1b[31m",
            Status::WarnOld => "\x1b[33m",
            Status::New | Status::Update | Status::UpdateIndex => "\x1b[36m",
            Status::Ok | Status::Ignore => "\x1b[90m",
        };
        format!("{color}{line}\x1b[0m")
    }

    /// Prints the run summary (B.1/B.2) and, for read-only runs, what
    /// *would* have changed instead of what did.
    pub fn finish(&mut self, report: &RunReport, update: bool) {
        if let Some(bar) = self.progress.take() {
            bar.finish_and_clear();
        }

        if !self.quiet {
            println!(
                "total={} new={} upd={} idx_upd={} elapsed={:.2}s {:.1} files/s {:.2} MB/s",
                report.total,
                report.num_new,
                report.num_upd,
                report.num_idx_upd,
                report.elapsed.as_secs_f64(),
                report.files_per_second(),
                report.bytes_per_second() / (1024.0 * 1024.0),
            );

            if !update && (report.num_new > 0 || report.num_upd > 0) {
                println!(
                    "{} file hash(es) would be added, {} would be updated (re-run with -u to apply)",
                    report.num_new, report.num_upd
                );
            }

            if !report.damage_list.is_empty() {
                println!("damaged files:");
                for path in &report.damage_list {
                    println!("  {path}");
                }
            }

            if !report.err_list.is_empty() {
                println!("errors:");
                for path in &report.err_list {
                    println!("  {path}");
                }
            }
        }

        if let Some(file) = &mut self.log_file {
            let stamp = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f");
            let _ = writeln!(
                file,
                "{stamp} total={} new={} upd={} idx_upd={} elapsed={:.2}s",
                report.total,
                report.num_new,
                report.num_upd,
                report.num_idx_upd,
                report.elapsed.as_secs_f64(),
            );
        }
    }
}
