//! Operator event log.
//!
//! Every record is one `YYYY-MM-DD HH:MM:SS <message>` line appended to the
//! configured file and mirrored through `tracing` under the `rvgen::event`
//! target. The most recent lines are kept in memory as alert context.
//! Writing is best-effort: a file failure is reported once and the control
//! loop carries on.

use chrono::Local;
use heapless::Deque;
use rvgen_common::consts::MAX_ALERT_TAIL_LINES;
use rvgen_common::hal::config::LoggingSettings;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

/// Tracing target for mirrored event lines.
pub const EVENT_TARGET: &str = "rvgen::event";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Destination for operator-facing log lines.
pub trait EventSink {
    /// Persist one message. Never fails from the caller's point of view.
    fn record(&mut self, message: &str);

    /// Most recent lines, oldest first, formatted as written.
    fn recent(&self) -> Vec<String>;
}

/// File-backed [`EventSink`] with an in-memory tail.
pub struct EventLog {
    path: Option<PathBuf>,
    tail: Deque<String, MAX_ALERT_TAIL_LINES>,
    tail_limit: usize,
    write_failing: bool,
}

impl EventLog {
    /// Event log from the logging settings.
    pub fn new(settings: &LoggingSettings) -> Self {
        Self {
            path: settings.log_file.clone(),
            tail: Deque::new(),
            tail_limit: settings.alert_tail_lines.min(MAX_ALERT_TAIL_LINES),
            write_failing: false,
        }
    }

    fn append_to_file(&mut self, line: &str) {
        let Some(path) = &self.path else {
            return;
        };
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| writeln!(file, "{line}"));

        match result {
            Ok(()) if self.write_failing => {
                self.write_failing = false;
                info!("Event log {} writable again", path.display());
            }
            Ok(()) => {}
            Err(e) if !self.write_failing => {
                self.write_failing = true;
                warn!("Event log {} not writable: {e}", path.display());
            }
            Err(_) => {}
        }
    }

    fn remember(&mut self, line: String) {
        if self.tail_limit == 0 {
            return;
        }
        while self.tail.len() >= self.tail_limit {
            self.tail.pop_front();
        }
        // Capacity is at least `tail_limit`, so this cannot overflow.
        let _ = self.tail.push_back(line);
    }
}

impl EventSink for EventLog {
    fn record(&mut self, message: &str) {
        let line = format_line(&Local::now().format(TIMESTAMP_FORMAT).to_string(), message);
        info!(target: EVENT_TARGET, "{message}");
        self.append_to_file(&line);
        self.remember(line);
    }

    fn recent(&self) -> Vec<String> {
        self.tail.iter().cloned().collect()
    }
}

fn format_line(timestamp: &str, message: &str) -> String {
    format!("{timestamp} {message}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn settings(path: Option<PathBuf>, tail: usize) -> LoggingSettings {
        LoggingSettings {
            log_file: path,
            log_interval_secs: 30.0,
            alert_tail_lines: tail,
        }
    }

    #[test]
    fn appends_timestamped_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.log");
        let mut log = EventLog::new(&settings(Some(path.clone()), 20));

        log.record("Starting generator");
        log.record("Generator confirmed running");

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" Starting generator"));
        // "YYYY-MM-DD HH:MM:SS " prefix.
        let (date, rest) = lines[1].split_at(10);
        assert_eq!(date.len(), 10);
        assert_eq!(&date[4..5], "-");
        assert_eq!(&rest[3..4], ":");
        assert_eq!(&rest[9..10], " ");
    }

    #[test]
    fn tail_keeps_most_recent_lines() {
        let mut log = EventLog::new(&settings(None, 3));
        for i in 0..5 {
            log.record(&format!("event {i}"));
        }
        let recent = log.recent();
        assert_eq!(recent.len(), 3);
        assert!(recent[0].ends_with("event 2"));
        assert!(recent[2].ends_with("event 4"));
    }

    #[test]
    fn zero_tail_keeps_nothing() {
        let mut log = EventLog::new(&settings(None, 0));
        log.record("event");
        assert!(log.recent().is_empty());
    }

    #[test]
    fn unwritable_file_is_not_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("events.log");
        let mut log = EventLog::new(&settings(Some(path), 5));

        log.record("first");
        log.record("second");
        assert!(log.write_failing);
        assert_eq!(log.recent().len(), 2);
    }

    #[test]
    fn line_format() {
        assert_eq!(
            format_line("2024-05-01 07:30:00", "Battery Voltage: 12.34 V"),
            "2024-05-01 07:30:00 Battery Voltage: 12.34 V"
        );
    }
}
