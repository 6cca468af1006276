//! Shared types for the certificate pipeline.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::table::Cell;

// ── Records ─────────────────────────────────────────────────────────

/// One participant row as read from the table.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantRecord {
    /// 1-based position among data rows (the header is not counted).
    pub row: usize,
    pub raw_name: Cell,
    /// `None` when no email column is configured.
    pub raw_email: Option<Cell>,
}

/// A record that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRecord {
    pub row: usize,
    /// Title-cased, at most three words, never empty.
    pub formatted_name: String,
    pub email: Option<String>,
}

/// A generated PDF on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateArtifact {
    pub file_path: PathBuf,
    pub owner_name: String,
}

/// A successfully rendered record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCertificate {
    pub row: usize,
    pub artifact: CertificateArtifact,
    pub name: String,
    pub email: Option<String>,
}

// ── Rejections ──────────────────────────────────────────────────────

/// Why a record produced no certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    InvalidEmail,
    InvalidName,
    RenderFailed,
}

impl RejectionKind {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::InvalidEmail => "invalid_email",
            Self::InvalidName => "invalid_name",
            Self::RenderFailed => "render_failed",
        }
    }
}

/// A record excluded from the result, with enough context to find it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub row: usize,
    pub kind: RejectionKind,
    /// The raw name (or formatted name once available).
    pub name: String,
    pub detail: String,
}

// ── Batch result ────────────────────────────────────────────────────

/// Everything one pipeline run produced, in table order.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub certificates: Vec<GeneratedCertificate>,
    pub rejections: Vec<Rejection>,
    /// Whether an email column was configured for this run.
    pub email_configured: bool,
}

impl BatchResult {
    pub fn artifacts(&self) -> Vec<&CertificateArtifact> {
        self.certificates.iter().map(|c| &c.artifact).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.certificates.iter().map(|c| c.name.as_str()).collect()
    }

    /// Parallel to [`artifacts`](Self::artifacts) when an email column was
    /// configured, empty otherwise.
    pub fn emails(&self) -> Vec<&str> {
        self.certificates
            .iter()
            .filter_map(|c| c.email.as_deref())
            .collect()
    }

    pub fn count(&self, kind: RejectionKind) -> usize {
        self.rejections.iter().filter(|r| r.kind == kind).count()
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            total: self.certificates.len() + self.rejections.len(),
            generated: self.certificates.len(),
            invalid_email: self.count(RejectionKind::InvalidEmail),
            invalid_name: self.count(RejectionKind::InvalidName),
            render_failed: self.count(RejectionKind::RenderFailed),
        }
    }
}

/// Counts for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub generated: usize,
    pub invalid_email: usize,
    pub invalid_name: usize,
    pub render_failed: usize,
}

// ── Delivery ────────────────────────────────────────────────────────

/// A notification that could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryFailure {
    pub recipient: String,
    pub name: String,
    pub reason: String,
}

/// Outcome of the notification stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub sent: Vec<String>,
    pub failed: Vec<DeliveryFailure>,
    /// Certificates with no recipient address.
    pub skipped: usize,
}

// ── Run report ──────────────────────────────────────────────────────

/// What the driver shows the user at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub output_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub batch: BatchSummary,
    pub rejections: Vec<Rejection>,
    pub delivery: Option<DeliveryReport>,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = self.finished_at - self.started_at;
        writeln!(
            f,
            "Certificates: {} of {} generated in {}s -> {}",
            self.batch.generated,
            self.batch.total,
            elapsed.num_seconds(),
            self.output_dir.display()
        )?;
        writeln!(f, "  skipped (invalid email): {}", self.batch.invalid_email)?;
        writeln!(f, "  skipped (invalid name):  {}", self.batch.invalid_name)?;
        writeln!(f, "  skipped (render failed): {}", self.batch.render_failed)?;
        for r in &self.rejections {
            writeln!(f, "    row {} [{}] {}: {}", r.row, r.kind.label(), r.name, r.detail)?;
        }
        if let Some(delivery) = &self.delivery {
            writeln!(
                f,
                "Emails: {} sent, {} failed",
                delivery.sent.len(),
                delivery.failed.len()
            )?;
            for failure in &delivery.failed {
                writeln!(
                    f,
                    "    {} ({}): {}",
                    failure.recipient, failure.name, failure.reason
                )?;
            }
        }
        Ok(())
    }
}
