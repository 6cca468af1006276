//! DOCX template filling.
//!
//! A `.docx` is a zip archive; the visible text lives in `word/document.xml`
//! plus optional header/footer parts. Those parts are rendered as Tera
//! templates (Jinja syntax, `{{ NAMA }}`), every other entry is copied as-is.

use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tera::{Context, Tera};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::RenderError;

/// The single placeholder a certificate template fills.
pub const PLACEHOLDER: &str = "NAMA";

/// `{<w:r><w:t>{` → `{{` when Word splits the opening braces across runs.
static SPLIT_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(?:<[^>]*>)+\{").expect("valid regex"));
static SPLIT_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\}(?:<[^>]*>)+\}").expect("valid regex"));
/// A whole `{{ ... }}` expression, possibly with XML tags inside.
static EXPRESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{\{(.*?)\}\}").expect("valid regex"));
static XML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// A loaded certificate template.
#[derive(Debug, Clone)]
pub struct DocxTemplate {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl DocxTemplate {
    /// Read a template from disk.
    pub fn open(path: &Path) -> Result<Self, RenderError> {
        let bytes = std::fs::read(path).map_err(|e| RenderError::Template {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_bytes(path, bytes))
    }

    pub fn from_bytes(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            bytes,
        }
    }

    /// Fill the placeholder with `value` and return the new document bytes.
    pub fn render(&self, value: &str) -> Result<Vec<u8>, RenderError> {
        let mut context = Context::new();
        context.insert(PLACEHOLDER, value);

        let mut archive = ZipArchive::new(Cursor::new(self.bytes.as_slice()))
            .map_err(|e| self.invalid(format!("not a docx archive: {e}")))?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let mut saw_document = false;

        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| self.invalid(format!("unreadable entry #{i}: {e}")))?;
            let name = entry.name().to_string();

            if !is_text_part(&name) {
                writer
                    .raw_copy_file(entry)
                    .map_err(|e| self.invalid(format!("failed to copy {name}: {e}")))?;
                continue;
            }

            saw_document |= name == "word/document.xml";
            let mut xml = String::new();
            entry
                .read_to_string(&mut xml)
                .map_err(|e| self.invalid(format!("{name} is not UTF-8 XML: {e}")))?;

            let rendered = render_part(&xml, &context)
                .map_err(|e| self.invalid(format!("{name}: {}", describe(&e))))?;

            let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            writer
                .start_file(name.as_str(), options)
                .and_then(|()| writer.write_all(rendered.as_bytes()).map_err(Into::into))
                .map_err(|e| self.invalid(format!("failed to write {name}: {e}")))?;
        }

        if !saw_document {
            return Err(self.invalid("missing word/document.xml".into()));
        }

        let cursor = writer
            .finish()
            .map_err(|e| self.invalid(format!("failed to finish archive: {e}")))?;
        Ok(cursor.into_inner())
    }

    fn invalid(&self, reason: String) -> RenderError {
        RenderError::Template {
            path: self.path.clone(),
            reason,
        }
    }
}

fn is_text_part(name: &str) -> bool {
    name == "word/document.xml"
        || (name.starts_with("word/header") && name.ends_with(".xml"))
        || (name.starts_with("word/footer") && name.ends_with(".xml"))
}

/// Render one XML part. Autoescaping keeps the value well-formed XML.
fn render_part(xml: &str, context: &Context) -> Result<String, tera::Error> {
    let cleaned = repair_split_placeholders(xml);
    Tera::one_off(&cleaned, context, true)
}

/// Remove the run/formatting tags Word inserts inside `{{ ... }}`.
pub fn repair_split_placeholders(xml: &str) -> String {
    let joined = SPLIT_OPEN.replace_all(xml, "{{");
    let joined = SPLIT_CLOSE.replace_all(&joined, "}}");
    EXPRESSION
        .replace_all(&joined, |caps: &regex::Captures<'_>| {
            format!("{{{{{}}}}}", XML_TAG.replace_all(&caps[1], ""))
        })
        .into_owned()
}

/// Tera hides the useful part of parse errors in the source chain.
fn describe(err: &tera::Error) -> String {
    let mut msg = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        msg.push_str(": ");
        msg.push_str(&inner.to_string());
        source = inner.source();
    }
    msg
}
