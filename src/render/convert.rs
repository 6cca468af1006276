//! DOCX to PDF conversion.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::RenderError;

/// Converts a filled `.docx` into a PDF next to it.
#[async_trait]
pub trait PdfConverter: Send + Sync {
    /// Convert `docx` and write `<out_dir>/<docx stem>.pdf`, returning that path.
    async fn convert(&self, docx: &Path, out_dir: &Path) -> Result<PathBuf, RenderError>;
}

/// LibreOffice in headless mode.
#[derive(Debug, Clone)]
pub struct SofficeConverter {
    binary: PathBuf,
    timeout: Duration,
}

impl SofficeConverter {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

#[async_trait]
impl PdfConverter for SofficeConverter {
    async fn convert(&self, docx: &Path, out_dir: &Path) -> Result<PathBuf, RenderError> {
        let name = stem(docx);
        let expected = out_dir.join(format!("{name}.pdf"));

        debug!(
            binary = %self.binary.display(),
            input = %docx.display(),
            "Converting to PDF"
        );

        let output = Command::new(&self.binary)
            .arg("--headless")
            .arg("--norestore")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(out_dir)
            .arg(docx)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| RenderError::Timeout {
                name: name.clone(),
                timeout: self.timeout,
            })?
            .map_err(|e| RenderError::Conversion {
                name: name.clone(),
                reason: format!("failed to run {}: {e}", self.binary.display()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RenderError::Conversion {
                name,
                reason: format!(
                    "{} exited with {}: {}",
                    self.binary.display(),
                    output.status,
                    stderr.trim()
                ),
            });
        }

        // soffice exits 0 on some failures (e.g. unreadable input), so check
        // for the file instead of trusting the status alone.
        if !tokio::fs::try_exists(&expected).await.unwrap_or(false) {
            return Err(RenderError::Conversion {
                name,
                reason: format!("no PDF produced at {}", expected.display()),
            });
        }
        Ok(expected)
    }
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
