// src/sink.rs
//! Injected output sink for user-facing report text.
//!
//! Diagnostics go through `tracing`; anything a person is meant to read
//! goes through an [`OutputSink`] so tests can capture it.

use std::sync::{Arc, Mutex};

pub trait OutputSink: Send + Sync {
    fn line(&self, text: &str);
}

/// Default sink for the binary.
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn line(&self, text: &str) {
        println!("{text}");
    }
}

/// Test double that records every line.
#[derive(Default, Clone)]
pub struct CaptureSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("sink poisoned").clone()
    }

    pub fn joined(&self) -> String {
        self.lines().join("\n")
    }
}

impl OutputSink for CaptureSink {
    fn line(&self, text: &str) {
        self.lines
            .lock()
            .expect("sink poisoned")
            .push(text.to_string());
    }
}
