//! Pipeline events and the sinks that receive them.
//!
//! The pipeline never logs directly; it reports to an injected [`EventSink`].
//! [`TracingSink`] is the production sink.

use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{error, info, warn};

use crate::pipeline::types::{BatchSummary, RejectionKind};

/// Something worth reporting during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    BatchStarted {
        rows: usize,
        email_configured: bool,
    },
    RecordRejected {
        row: usize,
        kind: RejectionKind,
        name: String,
        detail: String,
    },
    CertificateRendered {
        row: usize,
        name: String,
        path: PathBuf,
    },
    BatchFinished {
        summary: BatchSummary,
    },
    NotificationSent {
        recipient: String,
        name: String,
    },
    NotificationFailed {
        recipient: String,
        name: String,
        reason: String,
    },
}

/// Receives pipeline events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

/// Forwards events to `tracing` at a level matching their severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::BatchStarted {
                rows,
                email_configured,
            } => info!(rows, email_configured, "Generating certificates"),
            PipelineEvent::RecordRejected {
                row,
                kind: RejectionKind::InvalidEmail,
                name,
                detail,
            } => warn!(row, name = %name, email = %detail, "Invalid email format, skipping"),
            PipelineEvent::RecordRejected {
                row,
                kind,
                name,
                detail,
            } => error!(row, kind = kind.label(), name = %name, error = %detail, "Skipping record"),
            PipelineEvent::CertificateRendered { row, name, path } => {
                info!(row, name = %name, path = %path.display(), "Certificate created")
            }
            PipelineEvent::BatchFinished { summary } => info!(
                generated = summary.generated,
                total = summary.total,
                invalid_email = summary.invalid_email,
                invalid_name = summary.invalid_name,
                render_failed = summary.render_failed,
                "Batch complete"
            ),
            PipelineEvent::NotificationSent { recipient, name } => {
                info!(recipient = %recipient, name = %name, "Certificate sent")
            }
            PipelineEvent::NotificationFailed {
                recipient,
                name,
                reason,
            } => error!(recipient = %recipient, name = %name, error = %reason, "Failed to send certificate"),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far.
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
