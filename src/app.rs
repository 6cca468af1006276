//! One certificate run, end to end.
//!
//! Fatal problems (bad paths, unreadable table, missing column, missing mail
//! configuration) return `Err` before any certificate is produced. Everything
//! after that is reported through the returned [`RunReport`].

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::{RenderConfig, RunRequest};
use crate::error::{ConfigError, Result};
use crate::notifier::Notifier;
use crate::pipeline::{CertificatePipeline, EventSink, RunReport, deliver_certificates};
use crate::render::{DocxRenderer, PdfConverter, SofficeConverter};
use crate::table::{Table, validate_paths};

/// File name of the JSON run report written into the run directory.
pub const REPORT_FILE: &str = "report.json";

/// Run with LibreOffice as the PDF converter.
pub async fn run(
    request: &RunRequest,
    config: &RenderConfig,
    notifier: Option<&dyn Notifier>,
    sink: Arc<dyn EventSink>,
) -> Result<RunReport> {
    let converter = Arc::new(SofficeConverter::new(
        &config.soffice_bin,
        config.convert_timeout,
    ));
    run_with_converter(request, config, converter, notifier, sink).await
}

/// Run with an explicit converter.
pub async fn run_with_converter(
    request: &RunRequest,
    config: &RenderConfig,
    converter: Arc<dyn PdfConverter>,
    notifier: Option<&dyn Notifier>,
    sink: Arc<dyn EventSink>,
) -> Result<RunReport> {
    let started_at = Utc::now();

    if request.wants_delivery() && notifier.is_none() {
        return Err(ConfigError::MissingRequired {
            key: "notifier".into(),
            hint: "sending certificates needs a configured mail sender".into(),
        }
        .into());
    }

    validate_paths(&request.table_path, &request.template_path)?;
    let table = Table::load(&request.table_path)?;

    let output_dir = config.run_dir(&request.table_path);
    info!(
        table = %request.table_path.display(),
        template = %request.template_path.display(),
        output = %output_dir.display(),
        "Starting certificate run"
    );

    let renderer = Arc::new(DocxRenderer::new(
        &request.template_path,
        &output_dir,
        converter,
    ));
    let pipeline = CertificatePipeline::new(renderer, sink.clone());
    let batch = pipeline
        .generate_certificates(
            &table,
            &request.name_column,
            request.email_column.as_deref(),
        )
        .await?;

    let delivery = match (notifier, &request.announcement) {
        (Some(notifier), Some(announcement)) if request.wants_delivery() => {
            Some(deliver_certificates(notifier, &batch, announcement, sink.as_ref()).await)
        }
        _ => None,
    };

    let report = RunReport {
        output_dir,
        started_at,
        finished_at: Utc::now(),
        batch: batch.summary(),
        rejections: batch.rejections,
        delivery,
    };

    match write_report(&report).await {
        Ok(path) => info!(path = %path.display(), "Run report written"),
        Err(e) => warn!(error = %e, "Failed to write run report"),
    }
    Ok(report)
}

/// Persist `report` as pretty JSON next to the certificates.
async fn write_report(report: &RunReport) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(&report.output_dir).await?;
    let path = report.output_dir.join(REPORT_FILE);
    let json = serde_json::to_vec_pretty(report)?;
    tokio::fs::write(&path, json).await?;
    Ok(path)
}
