//! Bounded log of dropped frames and agent-reported errors.
//!
//! Decode failures never reach the caller; they land here (and in the
//! tracing output) so they can still be inspected.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

/// Default number of diagnostics kept per channel.
pub const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// An inbound frame was dropped.
    MalformedFrame { code: &'static str, detail: String },
    /// The agent sent an `error` command.
    AgentError { message: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Sender of the offending frame, when known.
    pub participant: Option<String>,
    pub at: DateTime<Utc>,
}

/// Ring buffer of diagnostics. Oldest entries are evicted first.
#[derive(Debug)]
pub struct DiagnosticLog {
    entries: VecDeque<Diagnostic>,
    capacity: usize,
}

impl DiagnosticLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, kind: DiagnosticKind, participant: Option<String>) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(Diagnostic {
            kind,
            participant,
            at: Utc::now(),
        });
    }

    /// Entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
