//! Capped audit log
//!
//! One timestamped line per administrative action. Only the newest `cap`
//! lines are kept; older lines are dropped on each append.

use chrono::Local;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Default number of retained lines
pub const DEFAULT_LOG_CAP: usize = 200;

/// Append-only log file with a line cap
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
    cap: usize,
}

impl AuditLog {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, cap: usize) -> Self {
        Self {
            path: path.into(),
            cap,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Append `message` with the current local time.
    ///
    /// # Errors
    /// Returns an error if the log file cannot be read or replaced
    pub fn append(&self, message: &str) -> io::Result<()> {
        let ts = Local::now().format("%Y-%m-%d %H:%M:%S");
        self.append_line(&format!("[{ts}] {message}"))
    }

    /// Append, logging a warning instead of failing
    pub fn record(&self, message: &str) {
        if let Err(e) = self.append(message) {
            tracing::warn!(path = %self.path.display(), error = %e, "audit log write failed");
        }
    }

    /// Retained lines, oldest first
    ///
    /// # Errors
    /// Returns an error if the log exists but cannot be read
    pub fn lines(&self) -> io::Result<Vec<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content.lines().map(str::to_string).collect()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    fn append_line(&self, entry: &str) -> io::Result<()> {
        let mut lines = self.lines()?;
        lines.push(entry.replace('\n', " "));
        let excess = lines.len().saturating_sub(self.cap);
        lines.drain(..excess);

        // Replace atomically so a crash never leaves a truncated log
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        for line in &lines {
            writeln!(tmp, "{line}")?;
        }
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_append_creates_file() {
        let temp = TempDir::new().unwrap();
        let log = AuditLog::new(temp.path().join("audit.log"), 10);

        log.append("Created group s23ativ").unwrap();

        let lines = log.lines().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] Created group s23ativ"));
    }

    #[test]
    fn test_cap_drops_oldest() {
        let temp = TempDir::new().unwrap();
        let log = AuditLog::new(temp.path().join("audit.log"), 3);

        for i in 0..7 {
            log.append(&format!("entry {i}")).unwrap();
        }

        let lines = log.lines().unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("entry 4"));
        assert!(lines[2].ends_with("entry 6"));
    }

    #[test]
    fn test_existing_overlong_log_is_trimmed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("audit.log");
        let old: String = (0..10).map(|i| format!("old {i}\n")).collect();
        fs::write(&path, old).unwrap();

        let log = AuditLog::new(&path, 4);
        log.append("new").unwrap();

        let lines = log.lines().unwrap();
        assert_eq!(lines.len(), 4);
        assert_eq!(&lines[..3], ["old 7", "old 8", "old 9"]);
        assert!(lines[3].ends_with("new"));
    }

    #[test]
    fn test_newlines_in_message_stay_on_one_line() {
        let temp = TempDir::new().unwrap();
        let log = AuditLog::new(temp.path().join("audit.log"), 10);
        log.append("a\nb").unwrap();
        assert_eq!(log.lines().unwrap().len(), 1);
    }

    #[test]
    fn test_record_swallows_errors() {
        let temp = TempDir::new().unwrap();
        // A directory where the file should be makes the rename fail
        let path = temp.path().join("audit.log");
        fs::create_dir(&path).unwrap();
        let log = AuditLog::new(&path, 10);
        log.record("ignored");
        assert!(log.append("fails").is_err());
    }
}
