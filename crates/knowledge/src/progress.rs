//! Structured progress reporting for index builds.
//!
//! Progress is an observable side effect for operators: documents scanned,
//! chunks produced, vectors produced. It never affects build results.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Build phase a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Scan,
    Chunk,
    Embed,
    Index,
    Persist,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scan => "scan",
            Self::Chunk => "chunk",
            Self::Embed => "embed",
            Self::Index => "index",
            Self::Persist => "persist",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress event emitted during a build.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub phase: Phase,

    /// Work done so far in this phase
    pub current: u64,

    /// Total expected work, if known
    pub total: Option<u64>,

    /// Percentage complete (0.0 - 100.0)
    pub percentage: Option<f64>,

    /// Human-readable message
    pub message: String,

    /// Seconds since the reporter was created
    pub elapsed_secs: Option<f64>,
}

impl ProgressEvent {
    pub fn new(phase: Phase, current: u64, total: Option<u64>, message: impl Into<String>) -> Self {
        let percentage = total.map(|t| {
            if t > 0 {
                (current as f64 / t as f64) * 100.0
            } else {
                0.0
            }
        });

        Self {
            phase,
            current,
            total,
            percentage,
            message: message.into(),
            elapsed_secs: None,
        }
    }

    pub fn with_elapsed(mut self, elapsed_secs: f64) -> Self {
        self.elapsed_secs = Some(elapsed_secs);
        self
    }

    /// Format as a simple user-facing line.
    pub fn format_simple(&self) -> String {
        let progress = match self.total {
            Some(total) => format!("{}/{}", self.current, total),
            None => self.current.to_string(),
        };

        let pct = self
            .percentage
            .map(|p| format!(" ({:.0}%)", p))
            .unwrap_or_default();

        format!("[{}] {}{} - {}", self.phase, progress, pct, self.message)
    }
}

/// Callback for progress events.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Emits progress events through an optional callback.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    start_time: Instant,
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::noop()
    }
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            start_time: Instant::now(),
        }
    }

    /// Reporter that drops every event.
    pub fn noop() -> Self {
        Self {
            callback: None,
            start_time: Instant::now(),
        }
    }

    pub fn emit(&self, event: ProgressEvent) {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let event = event.with_elapsed(elapsed);

        tracing::debug!(
            phase = %event.phase,
            current = event.current,
            total = ?event.total,
            percentage = ?event.percentage,
            message = %event.message,
            elapsed_secs = elapsed,
            "Progress event"
        );

        if let Some(callback) = &self.callback {
            callback(event);
        }
    }

    pub fn scan(&self, current: u64, total: Option<u64>, source: &str) {
        self.emit(ProgressEvent::new(
            Phase::Scan,
            current,
            total,
            format!("read {}", source),
        ));
    }

    pub fn chunk(&self, current: u64, total: Option<u64>, chunks_created: u64) {
        self.emit(ProgressEvent::new(
            Phase::Chunk,
            current,
            total,
            format!("{} chunks created", chunks_created),
        ));
    }

    pub fn embed(&self, current: u64, total: Option<u64>, vectorizer: &str) {
        self.emit(ProgressEvent::new(
            Phase::Embed,
            current,
            total,
            format!("vectorizer={}", vectorizer),
        ));
    }

    pub fn index(&self, vectors: u64, dimensions: usize) {
        self.emit(ProgressEvent::new(
            Phase::Index,
            vectors,
            Some(vectors),
            format!("flat index, dim={}", dimensions),
        ));
    }

    pub fn persist(&self, chunks: u64, path: &str) {
        self.emit(ProgressEvent::new(
            Phase::Persist,
            chunks,
            Some(chunks),
            format!("writing {}", path),
        ));
    }
}
