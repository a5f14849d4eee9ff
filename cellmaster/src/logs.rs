// Copyright (c) The cellmaster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The operator-visible log buffer.
//!
//! Every message is recorded as a `date|level|description` line and mirrored
//! to [`tracing`] for local diagnostics. The UI loop pushes new lines to
//! connected clients once a second and sends (then clears) the whole buffer
//! when the operator asks for it.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::fmt;

/// Severity of a buffered log line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LogLevel {
    /// Diagnostic detail.
    Debug,
    /// Normal operation.
    Info,
    /// Suspicious but tolerated.
    Warning,
    /// Operation failed.
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// A structured log line as pushed to operator clients.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LogEntry {
    /// Timestamp in local time.
    pub date: String,
    /// The level string.
    #[serde(rename = "type")]
    pub level: String,
    /// The message.
    pub description: String,
}

/// Append-only buffer of formatted log lines.
#[derive(Debug, Default)]
pub struct LogBuffer {
    lines: Vec<String>,
    // Index of the first line not yet pushed incrementally.
    peeked: usize,
    file_path: Option<Utf8PathBuf>,
}

impl LogBuffer {
    /// Creates an empty buffer without a backing log file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty buffer and remembers the log file served by the
    /// `getlogfile` command.
    pub fn with_file(path: Utf8PathBuf) -> Self {
        Self {
            file_path: Some(path),
            ..Self::default()
        }
    }

    /// The path served by `getlogfile`, if configured.
    pub fn file_path(&self) -> Option<&Utf8Path> {
        self.file_path.as_deref()
    }

    /// Records a message and mirrors it to `tracing`.
    pub fn log(&mut self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!("{message}"),
            LogLevel::Info => tracing::info!("{message}"),
            LogLevel::Warning => tracing::warn!("{message}"),
            LogLevel::Error => tracing::error!("{message}"),
        }
        let date = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        self.lines.push(format!("{date}|{level}|{message}"));
    }

    /// Whether lines were appended since the last [`Self::drain_new`].
    pub fn has_new(&self) -> bool {
        self.peeked < self.lines.len()
    }

    /// Returns the lines appended since the last call, leaving the buffer
    /// itself intact.
    pub fn drain_new(&mut self) -> Vec<LogEntry> {
        let entries = self.lines[self.peeked..]
            .iter()
            .map(|line| parse_line(line))
            .collect();
        self.peeked = self.lines.len();
        entries
    }

    /// Returns and clears the whole buffer.
    pub fn drain_all(&mut self) -> Vec<LogEntry> {
        let entries = self.lines.iter().map(|line| parse_line(line)).collect();
        self.lines.clear();
        self.peeked = 0;
        entries
    }
}

fn parse_line(line: &str) -> LogEntry {
    let mut parts = line.splitn(3, '|');
    let date = parts.next().unwrap_or_default();
    let level = parts.next().unwrap_or_default();
    let description = parts.next().unwrap_or_default();
    LogEntry {
        date: date.to_owned(),
        level: level.to_owned(),
        description: description.trim().to_owned(),
    }
}
