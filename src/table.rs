//! Participant table loading.
//!
//! The whole table is read into memory before any record is processed.
//! CSV goes through the `csv` crate, spreadsheets through `calamine`
//! (first worksheet only). The first row is the header.

use std::fmt;
use std::path::{Path, PathBuf};

use calamine::{Data, Reader, open_workbook_auto};
use tracing::debug;

use crate::error::SchemaError;

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

/// A single table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Dates, durations and spreadsheet error values, kept as displayed.
    Other(String),
}

impl Cell {
    /// The cell's text, only when the cell actually holds text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(s) | Self::Other(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Self::Empty,
            Data::String(s) => Self::Text(s.clone()),
            Data::Int(i) => Self::Number(*i as f64),
            Data::Float(f) => Self::Number(*f),
            Data::Bool(b) => Self::Bool(*b),
            other => Self::Other(other.to_string()),
        }
    }
}

/// One data row, numbered by its position in the source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// 1-based among data rows (the header is not counted). Blank rows keep
    /// their number even though they are dropped.
    pub number: usize,
    pub cells: Vec<Cell>,
}

/// An in-memory participant table.
#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Build a table from already-parsed parts.
    ///
    /// Short rows are padded with [`Cell::Empty`]; entirely blank rows are
    /// dropped. Fails with [`SchemaError::Empty`] when no data row remains.
    pub fn from_parts(
        source: impl Into<PathBuf>,
        columns: Vec<String>,
        rows: Vec<Vec<Cell>>,
    ) -> Result<Self, SchemaError> {
        let width = columns.len();
        let rows: Vec<Row> = rows
            .into_iter()
            .enumerate()
            .filter(|(_, cells)| !cells.iter().all(Cell::is_empty))
            .map(|(i, mut cells)| {
                cells.resize(width.max(cells.len()), Cell::Empty);
                Row {
                    number: i + 1,
                    cells,
                }
            })
            .collect();

        if rows.is_empty() {
            return Err(SchemaError::Empty(source.into()));
        }

        Ok(Self {
            columns: columns.into_iter().map(|c| c.trim().to_string()).collect(),
            rows,
        })
    }

    /// Load a table from a `.csv` or spreadsheet file.
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        if !path.is_file() {
            return Err(SchemaError::NotFound(path.to_path_buf()));
        }
        let table = match extension(path).as_deref() {
            Some("csv") => Self::load_csv(path)?,
            Some(ext) if SPREADSHEET_EXTENSIONS.contains(&ext) => Self::load_spreadsheet(path)?,
            _ => {
                return Err(SchemaError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    expected: "csv, xlsx, xlsm, xls or ods".into(),
                });
            }
        };
        debug!(
            path = %path.display(),
            columns = table.columns.len(),
            rows = table.rows.len(),
            "Loaded participant table"
        );
        Ok(table)
    }

    fn load_csv(path: &Path) -> Result<Self, SchemaError> {
        let parse_err = |e: csv::Error| SchemaError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(parse_err)?;

        let columns = reader
            .headers()
            .map_err(parse_err)?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(parse_err)?;
            rows.push(
                record
                    .iter()
                    .map(|field| {
                        if field.is_empty() {
                            Cell::Empty
                        } else {
                            Cell::Text(field.to_string())
                        }
                    })
                    .collect(),
            );
        }

        Self::from_parts(path, columns, rows)
    }

    fn load_spreadsheet(path: &Path) -> Result<Self, SchemaError> {
        let parse_err = |reason: String| SchemaError::Parse {
            path: path.to_path_buf(),
            reason,
        };

        let mut workbook = open_workbook_auto(path).map_err(|e| parse_err(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| parse_err("workbook has no worksheets".into()))?
            .map_err(|e| parse_err(e.to_string()))?;

        let mut raw_rows = range.rows();
        let Some(header) = raw_rows.next() else {
            return Err(SchemaError::Empty(path.to_path_buf()));
        };
        let columns = header.iter().map(|d| Cell::from(d).to_string()).collect();
        let rows = raw_rows
            .map(|row| row.iter().map(Cell::from).collect())
            .collect();

        Self::from_parts(path, columns, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of non-blank data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Index of a column by exact (trimmed) name.
    pub fn column_index(&self, name: &str) -> Result<usize, SchemaError> {
        let name = name.trim();
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| SchemaError::MissingColumn {
                column: name.to_string(),
                available: self.columns.clone(),
            })
    }

    /// Resolve user input to a column name.
    ///
    /// Accepts an exact column name, or a 0-based index as listed by the CLI.
    /// A name that looks like a number wins over the index.
    pub fn resolve_column(&self, input: &str) -> Result<String, SchemaError> {
        if let Ok(idx) = self.column_index(input) {
            return Ok(self.columns[idx].clone());
        }
        input
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|idx| self.columns.get(idx).cloned())
            .ok_or_else(|| SchemaError::MissingColumn {
                column: input.trim().to_string(),
                available: self.columns.clone(),
            })
    }
}

/// Check the input table and template before a run starts.
pub fn validate_paths(table: &Path, template: &Path) -> Result<(), SchemaError> {
    if !table.is_file() {
        return Err(SchemaError::NotFound(table.to_path_buf()));
    }
    match extension(table).as_deref() {
        Some("csv") => {}
        Some(ext) if SPREADSHEET_EXTENSIONS.contains(&ext) => {}
        _ => {
            return Err(SchemaError::UnsupportedFormat {
                path: table.to_path_buf(),
                expected: "csv, xlsx, xlsm, xls or ods".into(),
            });
        }
    }

    if !template.is_file() {
        return Err(SchemaError::NotFound(template.to_path_buf()));
    }
    if extension(template).as_deref() != Some("docx") {
        return Err(SchemaError::UnsupportedFormat {
            path: template.to_path_buf(),
            expected: "docx".into(),
        });
    }
    Ok(())
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
}
