//! Query failure log
//!
//! Failed statements are written as a caller-identity/timestamp prefixed entry
//! followed by the backend error text. The entry goes to the configured log
//! file when it exists and is writable, and to stderr otherwise.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the caller identity written in log entries
pub const CALLER_ENV: &str = "SQLBRIDGE_CALLER";

/// Append-only sink for failed queries and free-form diagnostics
#[derive(Debug, Clone, Default)]
pub struct QueryLog {
    path: Option<PathBuf>,
}

impl QueryLog {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: Option<PathBuf>) {
        self.path = path;
    }

    /// Identity of the running program: `SQLBRIDGE_CALLER` or the executable path
    pub fn caller_identity() -> String {
        if let Ok(caller) = std::env::var(CALLER_ENV) {
            if !caller.is_empty() {
                return caller;
            }
        }
        std::env::current_exe()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    }

    /// `<caller>: <RFC 2822 timestamp>: <text>`
    pub fn format_line(text: &str) -> String {
        format!(
            "{}: {}: {}",
            Self::caller_identity(),
            chrono::Local::now().to_rfc2822(),
            text
        )
    }

    /// Record a failed statement and return the entry that was written
    pub fn record_failure(&self, sql: &str, error: &str) -> String {
        let entry = format!("{}\n{}\n\n", Self::format_line(sql), error);
        log::warn!("Query failed: {} ({})", sql, error);

        if !self.write_to_file(&entry) {
            eprint!("{}", entry);
        }

        entry
    }

    /// Append one diagnostic line; returns false when no writable log file is configured
    pub fn append_line(&self, text: &str) -> bool {
        let line = format!("{}\n", Self::format_line(text));
        self.write_to_file(&line)
    }

    fn write_to_file(&self, entry: &str) -> bool {
        let Some(path) = &self.path else {
            return false;
        };

        // Only append to a log file that already exists
        let file = OpenOptions::new().append(true).open(path);
        match file {
            Ok(mut file) => match file.write_all(entry.as_bytes()) {
                Ok(()) => true,
                Err(e) => {
                    log::debug!("Failed to write query log {}: {}", path.display(), e);
                    false
                }
            },
            Err(e) => {
                log::debug!("Query log {} is not writable: {}", path.display(), e);
                false
            }
        }
    }
}
