// src/event_log.rs
//
// Append-only CSV audit log of crossing events.
//
//   TrackID,Action,Frame,Time(sec)
//   7,ENTER,18,0.6
//
// The header is written only when the file did not exist when the log was
// opened. An existing file is appended to as-is. Each `append` writes one
// row and flushes it to the OS before returning.

use crate::error::GateError;
use crate::types::CrossingEvent;
use csv::{Writer, WriterBuilder};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const LOG_HEADER: [&str; 4] = ["TrackID", "Action", "Frame", "Time(sec)"];

pub struct EventLog {
    path: PathBuf,
    writer: Writer<File>,
    rows_written: u64,
}

impl EventLog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GateError> {
        let path = path.as_ref().to_path_buf();
        let existed = path.exists();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| GateError::io(parent, e))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| GateError::io(&path, e))?;

        let mut log = Self {
            writer: WriterBuilder::new().has_headers(false).from_writer(file),
            path,
            rows_written: 0,
        };

        if existed {
            info!("Appending to existing event log {}", log.path.display());
        } else {
            log.writer.write_record(LOG_HEADER)?;
            log.sync()?;
            info!("Created event log {}", log.path.display());
        }

        Ok(log)
    }

    pub fn append(&mut self, event: &CrossingEvent) -> Result<(), GateError> {
        self.writer.write_record([
            event.track_id.to_string(),
            event.action.as_str().to_string(),
            event.frame_index.to_string(),
            format_seconds(event.timestamp_secs),
        ])?;
        self.sync()?;
        self.rows_written += 1;

        debug!(
            "Logged {} {} at frame {}",
            event.track_id,
            event.action.as_str(),
            event.frame_index
        );
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows appended through this handle (header excluded).
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    fn sync(&mut self) -> Result<(), GateError> {
        self.writer
            .flush()
            .map_err(|e| GateError::io(&self.path, e))?;
        self.writer
            .get_ref()
            .sync_data()
            .map_err(|e| GateError::io(&self.path, e))
    }
}

impl Drop for EventLog {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            warn!("Failed to flush event log {}: {}", self.path.display(), e);
        }
    }
}

/// Seconds rounded to two decimals, printed without trailing zeros
/// but always with a fractional part (`0.6`, `12.0`).
///
/// Rounds the exact binary value with ties to even, so `0.125` → `0.12`
/// and `2.675` (stored just below) → `2.67`.
pub fn format_seconds(secs: f64) -> String {
    let fixed = format!("{:.2}", secs);
    match fixed.parse::<f64>() {
        Ok(rounded) => format!("{:?}", rounded),
        Err(_) => fixed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Action, TrackId};

    fn event(id: i64, action: Action, frame: u64, secs: f64) -> CrossingEvent {
        CrossingEvent {
            track_id: TrackId::Num(id),
            action,
            frame_index: frame,
            timestamp_secs: secs,
        }
    }

    fn lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_new_log_gets_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people_log.csv");

        let mut log = EventLog::open(&path).unwrap();
        log.append(&event(7, Action::Enter, 18, 0.60)).unwrap();

        assert_eq!(
            lines(&path),
            vec!["TrackID,Action,Frame,Time(sec)", "7,ENTER,18,0.6"]
        );
        assert_eq!(log.rows_written(), 1);
    }

    #[test]
    fn test_existing_log_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people_log.csv");
        fs::write(&path, "TrackID,Action,Frame,Time(sec)\n3,EXIT,8,0.27\n").unwrap();

        let mut log = EventLog::open(&path).unwrap();
        log.append(&event(4, Action::Enter, 16, 0.53)).unwrap();
        drop(log);

        let rows = lines(&path);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.iter().filter(|r| r.starts_with("TrackID")).count(), 1);
        assert_eq!(rows[2], "4,ENTER,16,0.53");
    }

    #[test]
    fn test_reopen_does_not_repeat_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");

        EventLog::open(&path)
            .unwrap()
            .append(&event(1, Action::Enter, 8, 0.27))
            .unwrap();
        EventLog::open(&path)
            .unwrap()
            .append(&event(1, Action::Exit, 16, 0.53))
            .unwrap();

        assert_eq!(
            lines(&path),
            vec![
                "TrackID,Action,Frame,Time(sec)",
                "1,ENTER,8,0.27",
                "1,EXIT,16,0.53"
            ]
        );
    }

    #[test]
    fn test_rows_keep_call_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let mut log = EventLog::open(&path).unwrap();

        for (i, id) in [5, 2, 9].iter().enumerate() {
            log.append(&event(*id, Action::Exit, 8 * (i as u64 + 1), 0.0))
                .unwrap();
        }

        let ids: Vec<String> = lines(&path)[1..]
            .iter()
            .map(|r| r.split(',').next().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["5", "2", "9"]);
    }

    #[test]
    fn test_string_ids_are_quoted_when_needed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let mut log = EventLog::open(&path).unwrap();

        let mut e = event(0, Action::Enter, 8, 1.0);
        e.track_id = TrackId::Name("a,b".to_string());
        log.append(&e).unwrap();

        assert_eq!(lines(&path)[1], "\"a,b\",ENTER,8,1.0");
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("gate").join("log.csv");
        EventLog::open(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_open_fails_on_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = EventLog::open(dir.path()).err().unwrap();
        assert!(matches!(err, GateError::Io { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0.6), "0.6");
        assert_eq!(format_seconds(0.333), "0.33");
        assert_eq!(format_seconds(12.0), "12.0");
        assert_eq!(format_seconds(1.005 + 0.001), "1.01");
        assert_eq!(format_seconds(0.1 + 0.2), "0.3");
    }

    #[test]
    fn test_format_seconds_ties_follow_binary_value() {
        assert_eq!(format_seconds(0.015), "0.01");
        assert_eq!(format_seconds(0.125), "0.12");
        assert_eq!(format_seconds(2.675), "2.67");
        assert_eq!(format_seconds(0.375), "0.38");
        assert_eq!(format_seconds(45.0 / 1000.0), "0.04");
        assert_eq!(format_seconds(105.0 / 1000.0), "0.1");
    }
}
