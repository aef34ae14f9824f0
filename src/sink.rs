// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! User-facing message output
//!
//! Each message goes to exactly one place: the console, or the end of a log file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Destination for progress and per-file messages
pub trait Sink: Send + Sync {
    fn emit(&self, message: &str);
}

/// Prints to stdout
pub struct ConsoleSink;

impl Sink for ConsoleSink {
    fn emit(&self, message: &str) {
        println!("{}", message);
    }
}

/// Appends one line per message; the file is opened and closed on every write
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for FileSink {
    fn emit(&self, message: &str) {
        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{}", message));
        if let Err(e) = written {
            tracing::warn!("Failed to append to {:?}: {}", self.path, e);
        }
    }
}

/// Console or log file, picked by the silent-mode flag
pub fn for_mode(silent: bool, log_file: &Path) -> Box<dyn Sink> {
    if silent {
        Box::new(FileSink::new(log_file))
    } else {
        Box::new(ConsoleSink)
    }
}

/// Keeps messages in memory
#[derive(Default)]
pub struct MemorySink {
    messages: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

impl Sink for MemorySink {
    fn emit(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}
