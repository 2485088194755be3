//! Progress event stream.
//!
//! The pipeline routes phase transitions and per-item failures through a
//! channel rather than printing directly, so the CLI (or any other
//! caller) decides how to render them. `Phase::pct` ranges are fixed:
//! discovery 0-20, partial hash 20-60, full hash 60-85, decision 85-95,
//! execute 95-100.

use chrono::{DateTime, Utc};
use std::sync::mpsc::Sender;

/// One phase of the pipeline, matching the wire vocabulary reported to
/// callers and in JSON audit output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Discover,
    SizeGroup,
    PartialHash,
    FullHash,
    Cluster,
    Score,
    Decide,
    ConfirmDelete,
    Delete,
    Record,
    Complete,
    Failed,
    Cancelled,
}

/// A single progress/event record.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub message: String,
    /// Monotone 0-100 within a run; consumers must not assume a
    /// specific relationship between two events of different phases
    /// beyond "later phase implies later pct".
    pub pct: u8,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(phase: Phase, message: impl Into<String>, pct: u8) -> Self {
        Self {
            phase,
            message: message.into(),
            pct: pct.min(100),
            timestamp: Utc::now(),
        }
    }
}

/// Sink for progress events. Cloneable, and safe to drop without
/// consuming: if no receiver is attached, events are silently discarded.
#[derive(Clone, Default)]
pub struct ProgressSink {
    sender: Option<Sender<ProgressEvent>>,
}

impl ProgressSink {
    /// A sink with nothing attached; every `emit` is a no-op.
    pub fn null() -> Self {
        Self { sender: None }
    }

    pub fn new(sender: Sender<ProgressEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    pub fn emit(&self, phase: Phase, message: impl Into<String>, pct: u8) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(ProgressEvent::new(phase, message, pct));
        }
    }
}

impl std::fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSink")
            .field("attached", &self.sender.is_some())
            .finish()
    }
}
