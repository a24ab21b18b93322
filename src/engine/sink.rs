//! Single consumer of the event stream: aggregates counters, the damage
//! list, and the error list into one report the caller inspects after the
//! run finishes.
//!
//! Grounded on spec.md §4.5 for the core aggregation duties and on
//! `chkbit_cli/main.py`'s `num_idx_upd`/`num_new`/`num_upd` counters and
//! elapsed/throughput bookkeeping for the breakdown the CLI prints.

use std::time::Duration;

use super::record::{Event, Status};

#[derive(Debug, Default)]
pub struct ResultSink {
    total: u64,
    num_new: u64,
    num_upd: u64,
    num_idx_upd: u64,
    damage_list: Vec<String>,
    err_list: Vec<String>,
    bytes_hashed: u64,
    files_hashed: u64,
}

impl ResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: Event) {
        match event {
            Event::Classification { status, path } => match status {
                Status::Ok => self.total += 1,
                Status::New => {
                    self.total += 1;
                    self.num_new += 1;
                }
                Status::Update => {
                    self.total += 1;
                    self.num_upd += 1;
                }
                Status::ErrDmg => self.damage_list.push(path),
                Status::InternalException => self.err_list.push(path),
                Status::UpdateIndex => self.num_idx_upd += 1,
                Status::WarnOld | Status::ErrIdx | Status::Ignore => {}
            },
            Event::Throughput {
                files_delta,
                bytes_delta,
            } => {
                self.files_hashed += files_delta;
                self.bytes_hashed += bytes_delta;
            }
        }
    }

    pub fn into_report(self, elapsed: Duration) -> RunReport {
        RunReport {
            total: self.total,
            num_new: self.num_new,
            num_upd: self.num_upd,
            num_idx_upd: self.num_idx_upd,
            damage_list: self.damage_list,
            err_list: self.err_list,
            bytes_hashed: self.bytes_hashed,
            files_hashed: self.files_hashed,
            elapsed,
        }
    }
}

/// Final aggregate handed back to the caller once a run completes.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub total: u64,
    pub num_new: u64,
    pub num_upd: u64,
    pub num_idx_upd: u64,
    pub damage_list: Vec<String>,
    pub err_list: Vec<String>,
    pub bytes_hashed: u64,
    pub files_hashed: u64,
    pub elapsed: Duration,
}

impl RunReport {
    /// 0 on a clean run, 1 if anything was damaged or raised an internal
    /// exception, per spec.md §6's exit-code rule.
    pub fn exit_code(&self) -> i32 {
        if self.damage_list.is_empty() && self.err_list.is_empty() {
            0
        } else {
            1
        }
    }

    pub fn files_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.files_hashed as f64 / secs
        } else {
            0.0
        }
    }

    pub fn bytes_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.bytes_hashed as f64 / secs
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_new_update_and_ok_toward_total() {
        let mut sink = ResultSink::new();
        sink.record(Event::classification(Status::New, "a".to_string()));
        sink.record(Event::classification(Status::Update, "b".to_string()));
        sink.record(Event::classification(Status::Ok, "c".to_string()));
        let report = sink.into_report(Duration::from_secs(1));
        assert_eq!(report.total, 3);
        assert_eq!(report.num_new, 1);
        assert_eq!(report.num_upd, 1);
    }

    #[test]
    fn damage_and_exceptions_flag_a_nonzero_exit_code() {
        let mut sink = ResultSink::new();
        sink.record(Event::classification(Status::ErrDmg, "dmg.bin".to_string()));
        let report = sink.into_report(Duration::from_secs(1));
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.damage_list, vec!["dmg.bin".to_string()]);
    }

    #[test]
    fn clean_run_exits_zero() {
        let sink = ResultSink::new();
        let report = sink.into_report(Duration::from_secs(1));
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn throughput_events_accumulate_bytes_and_files() {
        let mut sink = ResultSink::new();
        sink.record(Event::Throughput {
            files_delta: 0,
            bytes_delta: 1000,
        });
        sink.record(Event::Throughput {
            files_delta: 1,
            bytes_delta: 0,
        });
        let report = sink.into_report(Duration::from_secs(1));
        assert_eq!(report.bytes_hashed, 1000);
        assert_eq!(report.files_hashed, 1);
    }
}
