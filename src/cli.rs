//! Interactive prompts that assemble a [`RunRequest`].
//!
//! Reads one answer per line from any `AsyncBufRead` and writes prompts to
//! any `AsyncWrite`; the binary wires these to stdin and stderr.

use std::io;
use std::path::PathBuf;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::{Announcement, RunRequest};
use crate::error::Result;
use crate::table::{Table, validate_paths};

/// Answer that skips the email column.
const SKIP: &str = "-";

/// Line-oriented question/answer over async streams.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R, W> Prompter<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print `question`, read one line, return it trimmed.
    ///
    /// End of input is an error: a run cannot start half-configured.
    pub async fn ask(&mut self, question: &str) -> io::Result<String> {
        self.output.write_all(question.as_bytes()).await?;
        self.output.write_all(b" ").await?;
        self.output.flush().await?;

        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("input closed while waiting for: {question}"),
            ));
        }
        Ok(line.trim().to_string())
    }

    pub async fn say(&mut self, text: &str) -> io::Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await
    }
}

/// Ask for everything a run needs.
///
/// Paths are checked and the table is opened here so the column list can be
/// shown before the user picks columns.
pub async fn collect_request<R, W>(prompter: &mut Prompter<R, W>) -> Result<RunRequest>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let table_path = PathBuf::from(prompter.ask("Participant table (.csv/.xlsx):").await?);
    let template_path = PathBuf::from(prompter.ask("Certificate template (.docx):").await?);
    validate_paths(&table_path, &template_path)?;

    let table = Table::load(&table_path)?;
    prompter
        .say(&format!("Columns in {}:", table_path.display()))
        .await?;
    for (idx, column) in table.columns().iter().enumerate() {
        prompter.say(&format!("  [{idx}] {column}")).await?;
    }

    let name_answer = prompter.ask("Name column (name or index):").await?;
    let name_column = table.resolve_column(&name_answer)?;

    let email_answer = prompter
        .ask("Email column (name or index, '-' to skip sending):")
        .await?;
    let email_column = if email_answer.is_empty() || email_answer == SKIP {
        None
    } else {
        Some(table.resolve_column(&email_answer)?)
    };

    let announcement = match email_column {
        Some(_) => {
            let subject = prompter.ask("Email subject:").await?;
            let body = prompter.ask("Email body:").await?;
            Some(Announcement { subject, body })
        }
        None => None,
    };

    Ok(RunRequest {
        table_path,
        template_path,
        name_column,
        email_column,
        announcement,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, SchemaError};
    use crate::render::template::tests::certificate_docx;

    struct Fixture {
        _dir: tempfile::TempDir,
        table: PathBuf,
        template: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let table = dir.path().join("peserta.csv");
        std::fs::write(&table, "Nama,Email\nmaria garcia,maria@test.com\n").unwrap();
        let template = dir.path().join("template.docx");
        std::fs::write(&template, certificate_docx()).unwrap();
        Fixture {
            _dir: dir,
            table,
            template,
        }
    }

    async fn run(answers: String) -> (Result<RunRequest>, String) {
        let mut out = Vec::new();
        let result = {
            let mut prompter = Prompter::new(answers.as_bytes(), &mut out);
            collect_request(&mut prompter).await
        };
        (result, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn collects_request_with_delivery() {
        let f = fixture();
        let answers = format!(
            "{}\n{}\nNama\n1\nSertifikat Seminar\nTerima kasih.\n",
            f.table.display(),
            f.template.display()
        );

        let (request, transcript) = run(answers).await;
        let request = request.unwrap();

        assert_eq!(request.table_path, f.table);
        assert_eq!(request.name_column, "Nama");
        assert_eq!(request.email_column.as_deref(), Some("Email"));
        assert_eq!(
            request.announcement,
            Some(Announcement {
                subject: "Sertifikat Seminar".into(),
                body: "Terima kasih.".into(),
            })
        );
        assert!(request.wants_delivery());
        assert!(transcript.contains("[0] Nama"));
        assert!(transcript.contains("[1] Email"));
    }

    #[tokio::test]
    async fn dash_skips_delivery_prompts() {
        let f = fixture();
        let answers = format!("{}\n{}\n0\n-\n", f.table.display(), f.template.display());

        let (request, transcript) = run(answers).await;
        let request = request.unwrap();

        assert_eq!(request.name_column, "Nama");
        assert_eq!(request.email_column, None);
        assert_eq!(request.announcement, None);
        assert!(!transcript.contains("subject"));
    }

    #[tokio::test]
    async fn unknown_column_is_fatal() {
        let f = fixture();
        let answers = format!("{}\n{}\nNama Lengkap\n", f.table.display(), f.template.display());

        let (request, _) = run(answers).await;
        assert!(matches!(
            request,
            Err(Error::Schema(SchemaError::MissingColumn { .. }))
        ));
    }

    #[tokio::test]
    async fn missing_table_fails_before_column_prompts() {
        let f = fixture();
        let answers = format!("/nonexistent/peserta.csv\n{}\n", f.template.display());

        let (request, transcript) = run(answers).await;
        assert!(matches!(
            request,
            Err(Error::Schema(SchemaError::NotFound(_)))
        ));
        assert!(!transcript.contains("Columns"));
    }

    #[tokio::test]
    async fn eof_is_an_error() {
        let f = fixture();
        let answers = format!("{}\n", f.table.display());

        let (request, _) = run(answers).await;
        let e = match request {
            Err(Error::Io(e)) => e,
            other => panic!("expected io error, got {other:?}"),
        };
        assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof);
    }
}
