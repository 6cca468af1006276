//! Certificate rendering: template fill, then PDF conversion.
//!
//! The intermediate `.docx` is written into a scoped temporary directory
//! inside the output directory, so it is removed whether conversion
//! succeeds or fails. Only the final `<stem>.pdf` is left behind.

pub mod convert;
pub mod template;

pub use convert::{PdfConverter, SofficeConverter};
pub use template::DocxTemplate;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::RenderError;
use crate::pipeline::types::CertificateArtifact;

/// Produces one certificate PDF for one participant.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Fill the template with `field_value` and write `<file_stem>.pdf`.
    async fn render(
        &self,
        field_value: &str,
        file_stem: &str,
    ) -> Result<CertificateArtifact, RenderError>;
}

/// Renderer backed by a `.docx` template and a [`PdfConverter`].
pub struct DocxRenderer {
    template_path: PathBuf,
    output_dir: PathBuf,
    converter: Arc<dyn PdfConverter>,
}

impl DocxRenderer {
    pub fn new(
        template_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        converter: Arc<dyn PdfConverter>,
    ) -> Self {
        Self {
            template_path: template_path.into(),
            output_dir: output_dir.into(),
            converter,
        }
    }
}

#[async_trait]
impl Renderer for DocxRenderer {
    async fn render(
        &self,
        field_value: &str,
        file_stem: &str,
    ) -> Result<CertificateArtifact, RenderError> {
        // Re-read per record: a broken template fails each record on its own
        // instead of aborting the batch.
        let template = DocxTemplate::open(&self.template_path)?;
        let filled = template.render(field_value)?;

        // create_dir_all is a no-op when the directory already exists.
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| RenderError::OutputDir {
                path: self.output_dir.clone(),
                source,
            })?;

        let scratch = tempfile::Builder::new()
            .prefix(".certgen-")
            .tempdir_in(&self.output_dir)
            .map_err(|source| RenderError::OutputDir {
                path: self.output_dir.clone(),
                source,
            })?;

        let docx_path = scratch.path().join(format!("{file_stem}.docx"));
        tokio::fs::write(&docx_path, &filled).await?;

        let converted = self.converter.convert(&docx_path, scratch.path()).await?;

        let pdf_path = self.output_dir.join(format!("{file_stem}.pdf"));
        tokio::fs::rename(&converted, &pdf_path).await?;

        debug!(name = %field_value, path = %pdf_path.display(), "Certificate rendered");

        // Dropping `scratch` removes the intermediate document.
        Ok(CertificateArtifact {
            file_path: pdf_path,
            owner_name: field_value.to_string(),
        })
    }
}
