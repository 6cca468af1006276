//! Batch certificate generation.
//!
//! Per record: `Pending -> Validated -> Rendered`, or `Pending -> Rejected`
//! (bad email or name), or `Validated -> RenderFailed`. Rejections are
//! collected and reported; they never stop the batch.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::SchemaError;
use crate::pipeline::events::{EventSink, PipelineEvent};
use crate::pipeline::types::{
    BatchResult, GeneratedCertificate, ParticipantRecord, Rejection, RejectionKind,
    ValidatedRecord,
};
use crate::render::Renderer;
use crate::table::Table;
use crate::validate::{file_stem, format_name, validate_email};

/// Drives validation and rendering over a participant table.
pub struct CertificatePipeline {
    renderer: Arc<dyn Renderer>,
    sink: Arc<dyn EventSink>,
}

impl CertificatePipeline {
    pub fn new(renderer: Arc<dyn Renderer>, sink: Arc<dyn EventSink>) -> Self {
        Self { renderer, sink }
    }

    /// Generate one certificate per valid row, in table order.
    ///
    /// Fails only when a configured column is missing. With an email column,
    /// rows whose address fails [`validate_email`] are rejected before their
    /// name is looked at.
    pub async fn generate_certificates(
        &self,
        table: &Table,
        name_column: &str,
        email_column: Option<&str>,
    ) -> Result<BatchResult, SchemaError> {
        let name_idx = table.column_index(name_column)?;
        let email_idx = email_column
            .map(|column| table.column_index(column))
            .transpose()?;

        self.sink.emit(PipelineEvent::BatchStarted {
            rows: table.row_count(),
            email_configured: email_idx.is_some(),
        });

        let mut result = BatchResult {
            email_configured: email_idx.is_some(),
            ..BatchResult::default()
        };
        let mut used_stems = HashSet::new();

        for row in table.rows() {
            let record = ParticipantRecord {
                row: row.number,
                raw_name: row.cells[name_idx].clone(),
                raw_email: email_idx.map(|idx| row.cells[idx].clone()),
            };

            let validated = match validate_record(&record) {
                Ok(validated) => validated,
                Err(rejection) => {
                    self.reject(&mut result, rejection);
                    continue;
                }
            };

            let stem = unique_stem(&mut used_stems, &validated);
            match self
                .renderer
                .render(&validated.formatted_name, &stem)
                .await
            {
                Ok(artifact) => {
                    self.sink.emit(PipelineEvent::CertificateRendered {
                        row: validated.row,
                        name: validated.formatted_name.clone(),
                        path: artifact.file_path.clone(),
                    });
                    result.certificates.push(GeneratedCertificate {
                        row: validated.row,
                        artifact,
                        name: validated.formatted_name,
                        email: validated.email,
                    });
                }
                Err(e) => self.reject(
                    &mut result,
                    Rejection {
                        row: validated.row,
                        kind: RejectionKind::RenderFailed,
                        name: validated.formatted_name,
                        detail: e.to_string(),
                    },
                ),
            }
        }

        self.sink.emit(PipelineEvent::BatchFinished {
            summary: result.summary(),
        });
        Ok(result)
    }

    fn reject(&self, result: &mut BatchResult, rejection: Rejection) {
        self.sink.emit(PipelineEvent::RecordRejected {
            row: rejection.row,
            kind: rejection.kind,
            name: rejection.name.clone(),
            detail: rejection.detail.clone(),
        });
        result.rejections.push(rejection);
    }
}

/// Apply the email check (when configured), then name formatting.
pub fn validate_record(record: &ParticipantRecord) -> Result<ValidatedRecord, Rejection> {
    let email = match &record.raw_email {
        None => None,
        Some(cell) => {
            let candidate = cell.to_string().trim().to_string();
            if !validate_email(&candidate) {
                return Err(Rejection {
                    row: record.row,
                    kind: RejectionKind::InvalidEmail,
                    name: record.raw_name.to_string(),
                    detail: candidate,
                });
            }
            Some(candidate)
        }
    };

    let formatted_name = format_name(record.raw_name.as_text()).map_err(|e| Rejection {
        row: record.row,
        kind: RejectionKind::InvalidName,
        name: record.raw_name.to_string(),
        detail: e.to_string(),
    })?;

    Ok(ValidatedRecord {
        row: record.row,
        formatted_name,
        email,
    })
}

/// File stem for a record; repeated names within a run get the row appended.
fn unique_stem(used: &mut HashSet<String>, record: &ValidatedRecord) -> String {
    let base = file_stem(&record.formatted_name);
    if used.insert(base.clone()) {
        return base;
    }
    let stem = format!("{base} (row {})", record.row);
    used.insert(stem.clone());
    stem
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::RenderError;
    use crate::pipeline::events::MemorySink;
    use crate::pipeline::types::CertificateArtifact;
    use crate::table::Cell;

    /// Records calls; fails for names listed in `fail_for`.
    struct StubRenderer {
        fail_for: Vec<&'static str>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl StubRenderer {
        fn new(fail_for: Vec<&'static str>) -> Self {
            Self {
                fail_for,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Renderer for StubRenderer {
        async fn render(
            &self,
            field_value: &str,
            file_stem: &str,
        ) -> Result<CertificateArtifact, RenderError> {
            self.calls
                .lock()
                .unwrap()
                .push((field_value.to_string(), file_stem.to_string()));
            if self.fail_for.iter().any(|name| *name == field_value) {
                return Err(RenderError::Conversion {
                    name: field_value.to_string(),
                    reason: "stub failure".into(),
                });
            }
            Ok(CertificateArtifact {
                file_path: PathBuf::from(format!("out/{file_stem}.pdf")),
                owner_name: field_value.to_string(),
            })
        }
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn table(rows: Vec<Vec<Cell>>) -> Table {
        Table::from_parts("peserta.csv", vec!["Nama".into(), "Email".into()], rows).unwrap()
    }

    fn pipeline(renderer: Arc<StubRenderer>) -> (CertificatePipeline, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        (CertificatePipeline::new(renderer, sink.clone()), sink)
    }

    #[tokio::test]
    async fn mixed_batch_skips_bad_email() {
        let renderer = Arc::new(StubRenderer::new(vec![]));
        let (pipeline, sink) = pipeline(renderer.clone());
        let table = table(vec![
            vec![text("maria garcia"), text("maria@test.com")],
            vec![text("john"), text("not-an-email")],
            vec![text("ana lee"), text("ana@test.co")],
        ]);

        let result = pipeline
            .generate_certificates(&table, "Nama", Some("Email"))
            .await
            .unwrap();

        assert_eq!(result.names(), ["Maria Garcia", "Ana Lee"]);
        assert_eq!(result.emails(), ["maria@test.com", "ana@test.co"]);
        assert_eq!(result.artifacts().len(), 2);
        assert_eq!(result.count(RejectionKind::InvalidEmail), 1);
        assert_eq!(result.rejections[0].row, 2);
        assert_eq!(result.rejections[0].name, "john");

        let events = sink.events();
        assert!(events.iter().any(|e| matches!(
            e,
            PipelineEvent::RecordRejected { kind: RejectionKind::InvalidEmail, row: 2, .. }
        )));
        assert_eq!(renderer.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn invalid_emails_excluded_exactly() {
        let renderer = Arc::new(StubRenderer::new(vec![]));
        let (pipeline, _sink) = pipeline(renderer);
        let table = table(vec![
            vec![text("a one"), text("a@x.io")],
            vec![text("b two"), text("b@x")],
            vec![text("c three"), Cell::Empty],
            vec![text("d four"), Cell::Number(7.0)],
            vec![text("e five"), text(" e@x.io ")],
        ]);

        let result = pipeline
            .generate_certificates(&table, "Nama", Some("Email"))
            .await
            .unwrap();

        assert_eq!(result.certificates.len(), 5 - 3);
        assert_eq!(result.names(), ["A One", "E Five"]);
        assert_eq!(result.emails(), ["a@x.io", "e@x.io"]);
        for rejected in ["b two", "c three", "d four"] {
            assert!(!result.names().iter().any(|n| n.eq_ignore_ascii_case(rejected)));
        }
    }

    #[tokio::test]
    async fn without_email_column_emails_are_empty() {
        let renderer = Arc::new(StubRenderer::new(vec![]));
        let (pipeline, _sink) = pipeline(renderer);
        let table = table(vec![
            vec![text("maria garcia"), text("garbage")],
            vec![Cell::Number(12.0), text("x")],
            vec![text("ana lee"), Cell::Empty],
        ]);

        let result = pipeline
            .generate_certificates(&table, "Nama", None)
            .await
            .unwrap();

        assert_eq!(result.names(), ["Maria Garcia", "Ana Lee"]);
        assert!(result.emails().is_empty());
        assert!(!result.email_configured);
        assert_eq!(result.count(RejectionKind::InvalidName), 1);
    }

    #[tokio::test]
    async fn render_failure_is_isolated() {
        let renderer = Arc::new(StubRenderer::new(vec!["Budi Santoso"]));
        let (pipeline, _sink) = pipeline(renderer.clone());
        let table = table(vec![
            vec![text("budi santoso"), text("budi@test.com")],
            vec![text("maria garcia"), text("maria@test.com")],
        ]);

        let result = pipeline
            .generate_certificates(&table, "Nama", Some("Email"))
            .await
            .unwrap();

        assert_eq!(result.names(), ["Maria Garcia"]);
        assert_eq!(result.count(RejectionKind::RenderFailed), 1);
        assert_eq!(result.rejections[0].name, "Budi Santoso");
        assert_eq!(renderer.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn missing_column_is_schema_error() {
        let renderer = Arc::new(StubRenderer::new(vec![]));
        let (pipeline, sink) = pipeline(renderer.clone());
        let table = table(vec![vec![text("ana"), text("ana@test.co")]]);

        let err = pipeline
            .generate_certificates(&table, "Nama", Some("Surel"))
            .await
            .unwrap_err();
        assert!(matches!(err, SchemaError::MissingColumn { ref column, .. } if column == "Surel"));

        let err = pipeline
            .generate_certificates(&table, "Name", None)
            .await
            .unwrap_err();
        assert!(matches!(err, SchemaError::MissingColumn { .. }));

        assert!(renderer.calls.lock().unwrap().is_empty());
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn duplicate_names_get_distinct_files() {
        let renderer = Arc::new(StubRenderer::new(vec![]));
        let (pipeline, _sink) = pipeline(renderer.clone());
        let table = table(vec![
            vec![text("ana lee"), text("ana1@test.co")],
            vec![text("ANA   LEE"), text("ana2@test.co")],
        ]);

        let result = pipeline
            .generate_certificates(&table, "Nama", Some("Email"))
            .await
            .unwrap();

        let paths: Vec<_> = result.artifacts().iter().map(|a| a.file_path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("out/Ana Lee.pdf"),
                PathBuf::from("out/Ana Lee (row 2).pdf"),
            ]
        );
        assert_eq!(result.names(), ["Ana Lee", "Ana Lee"]);
    }

    #[tokio::test]
    async fn row_numbers_survive_blank_lines() {
        let renderer = Arc::new(StubRenderer::new(vec![]));
        let (pipeline, _sink) = pipeline(renderer);
        let table = table(vec![
            vec![text("ana lee"), text("ana@test.co")],
            vec![Cell::Empty, Cell::Empty],
            vec![text("ana lee"), text("ana2@test.co")],
            vec![text("john"), text("not-an-email")],
        ]);

        let result = pipeline
            .generate_certificates(&table, "Nama", Some("Email"))
            .await
            .unwrap();

        assert_eq!(result.certificates[1].row, 3);
        assert_eq!(
            result.artifacts()[1].file_path,
            PathBuf::from("out/Ana Lee (row 3).pdf")
        );
        assert_eq!(result.rejections[0].row, 4);
    }

    #[test]
    fn validate_record_checks_email_before_name() {
        let record = ParticipantRecord {
            row: 4,
            raw_name: Cell::Empty,
            raw_email: Some(text("bad")),
        };
        let rejection = validate_record(&record).unwrap_err();
        assert_eq!(rejection.kind, RejectionKind::InvalidEmail);
        assert_eq!(rejection.detail, "bad");
    }
}
