use chrono::{Local, NaiveDateTime};
use log::{debug, warn};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// The append-only log of administrative actions.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

/// One log line, newline included.
pub fn format_entry(timestamp: &NaiveDateTime, message: &str) -> String {
    format!("[{}] {}\n", timestamp.format("%Y-%m-%d %H:%M:%S"), message)
}

impl AuditLog {
    pub fn new(path: &Path) -> AuditLog {
        AuditLog {
            path: path.to_path_buf(),
        }
    }

    /// Appends one entry stamped with the local time.
    ///
    /// Failures only reach the diagnostic log: the action being recorded has already happened.
    pub fn append(&self, message: &str) {
        let entry = format_entry(&Local::now().naive_local(), message);
        match self.write_entry(&entry) {
            Ok(()) => debug!("append: {}", entry.trim_end()),
            Err(e) => warn!(
                "append: could not write to the audit log {:?}: {} (entry: {})",
                self.path,
                e,
                entry.trim_end()
            ),
        }
    }

    fn write_entry(&self, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(entry.as_bytes())
    }
}
