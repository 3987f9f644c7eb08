// 📝 Progress Log
// Append-only stage log ("<timestamp> : <message>") plus tracing setup

use crate::error::{EtlError, Result};
use chrono::{DateTime, Local, TimeZone};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Year-Month-Day-Hour:Minute:Second, zero padded so lines sort by time
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H:%M:%S";

/// ProgressLogger - explicit handle to the run's log file
///
/// Passed to every stage instead of a process-wide path. The file is only
/// ever opened in append mode.
#[derive(Debug, Clone)]
pub struct ProgressLogger {
    path: PathBuf,
}

impl ProgressLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ProgressLogger { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line stamped with the current local time
    pub fn log(&self, message: &str) -> Result<()> {
        self.log_at(Local::now(), message)
    }

    /// Append one line stamped with the given time
    pub fn log_at<Tz: TimeZone>(&self, timestamp: DateTime<Tz>, message: &str) -> Result<()>
    where
        Tz::Offset: std::fmt::Display,
    {
        let line = format_entry(&timestamp, message);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| EtlError::io(&self.path, e))?;

        writeln!(file, "{}", line).map_err(|e| EtlError::io(&self.path, e))?;

        tracing::debug!(target: "largest_banks::progress", "{}", line);
        Ok(())
    }

    /// Whole log contents (empty if nothing has been logged yet)
    pub fn read_all(&self) -> Result<String> {
        if !self.path.exists() {
            return Ok(String::new());
        }
        fs::read_to_string(&self.path).map_err(|e| EtlError::io(&self.path, e))
    }
}

fn format_entry<Tz: TimeZone>(timestamp: &DateTime<Tz>, message: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{} : {}", timestamp.format(TIMESTAMP_FORMAT), message)
}

/// Install the stderr tracing subscriber used by the binary
///
/// `RUST_LOG` overrides the default `largest_banks=info` filter.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("largest_banks=info"));

    // A second init (e.g. from tests) is not an error worth surfacing
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_entry_format() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap();
        let line = format_entry(&ts, "Data extraction completed");
        assert_eq!(line, "2024-03-07-09:05:02 : Data extraction completed");
    }

    #[test]
    fn test_log_appends_never_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let logger = ProgressLogger::new(dir.path().join("code_log.txt"));

        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 5).unwrap();
        logger.log_at(t1, "first").unwrap();
        logger.log_at(t2, "second").unwrap();

        let contents = logger.read_all().unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines,
            vec![
                "2024-01-01-10:00:00 : first",
                "2024-01-01-10:00:05 : second",
            ]
        );

        // A fresh handle on the same path keeps appending
        ProgressLogger::new(logger.path()).log("third").unwrap();
        let contents = logger.read_all().unwrap();
        assert_eq!(contents.lines().count(), 3);
        assert!(contents.lines().last().unwrap().ends_with(" : third"));
    }

    #[test]
    fn test_log_to_unwritable_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let logger = ProgressLogger::new(dir.path().join("missing_dir").join("log.txt"));

        let err = logger.log("anything").unwrap_err();
        assert!(matches!(err, EtlError::Io { .. }));
    }

    #[test]
    fn test_read_all_before_first_write() {
        let dir = tempfile::tempdir().unwrap();
        let logger = ProgressLogger::new(dir.path().join("never_written.txt"));
        assert_eq!(logger.read_all().unwrap(), "");
    }
}
