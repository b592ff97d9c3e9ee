use std::io::Read;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use tracing::debug;

use pheno_common::is_missing_with;
use pheno_model::{Cell, Table};

use crate::error::{IngestError, Result};

/// How a delimited export is read.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    pub delimiter: char,
    /// Cohort-specific tokens treated as missing on top of the defaults.
    pub missing_tokens: Vec<String>,
    /// Rows between the header and the data that are discarded.
    pub skip_rows_after_header: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            missing_tokens: Vec::new(),
            skip_rows_after_header: 0,
        }
    }
}

impl ReadOptions {
    pub fn tsv() -> Self {
        Self {
            delimiter: '\t',
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    #[must_use]
    pub fn with_missing_tokens(mut self, tokens: &[String]) -> Self {
        self.missing_tokens = tokens.to_vec();
        self
    }

    #[must_use]
    pub fn with_skipped_rows(mut self, rows: usize) -> Self {
        self.skip_rows_after_header = rows;
        self
    }
}

fn normalize_header(raw: &str, index: usize) -> String {
    let trimmed = raw.trim().trim_matches('\u{feff}');
    let normalized = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        // Blank header cells, usually a written-out row index.
        format!("Unnamed: {index}")
    } else {
        normalized
    }
}

fn normalize_cell(raw: &str, missing_tokens: &[String]) -> Cell {
    let trimmed = raw.trim().trim_matches('\u{feff}');
    if is_missing_with(trimmed, missing_tokens) {
        Cell::Missing
    } else {
        Cell::text(trimmed)
    }
}

fn delimiter_byte(delimiter: char) -> Result<u8> {
    if delimiter.is_ascii() {
        Ok(delimiter as u8)
    } else {
        Err(IngestError::Delimiter { delimiter })
    }
}

/// Reads a delimited export into a [`Table`] named after the file stem.
pub fn read_table(path: &Path, options: &ReadOptions) -> Result<Table> {
    let file = std::fs::File::open(path).map_err(|e| IngestError::io(path, e))?;
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("table");
    let table = read_table_from_reader(name, path, file, options)?;
    debug!(
        path = %path.display(),
        rows = table.len(),
        columns = table.columns.len(),
        "read table"
    );
    Ok(table)
}

/// Reads delimited text from any reader; `origin` is only used in errors.
pub fn read_table_from_reader<R: Read>(
    name: &str,
    origin: &Path,
    reader: R,
    options: &ReadOptions,
) -> Result<Table> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter_byte(options.delimiter)?)
        .from_reader(reader);
    let csv_error = |source: csv::Error| IngestError::Csv {
        path: PathBuf::from(origin),
        source,
    };

    let mut records = csv_reader.records();
    let header = loop {
        match records.next() {
            Some(record) => {
                let record = record.map_err(csv_error)?;
                if record.iter().any(|cell| !cell.trim().is_empty()) {
                    break record;
                }
            }
            None => {
                return Err(IngestError::EmptyFile {
                    path: PathBuf::from(origin),
                });
            }
        }
    };
    let columns = header
        .iter()
        .enumerate()
        .map(|(idx, raw)| normalize_header(raw, idx))
        .collect();
    let mut table = Table::new(name, columns);

    let mut skipped = 0usize;
    for record in records {
        let record = record.map_err(csv_error)?;
        if skipped < options.skip_rows_after_header {
            skipped += 1;
            continue;
        }
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let row = record
            .iter()
            .map(|cell| normalize_cell(cell, &options.missing_tokens))
            .collect();
        table.push_row(row);
    }
    Ok(table)
}
