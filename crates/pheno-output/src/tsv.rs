//! Tab-separated table writer.
//!
//! Missing cells are written as `n/a`; numbers drop trailing zeros.

use std::fs;
use std::io::Write;
use std::path::Path;

use polars::prelude::{AnyValue, DataFrame};
use tracing::debug;

use pheno_common::any_to_output;
use pheno_model::Table;

use crate::error::{OutputError, Result};
use crate::frame::table_to_frame;

fn write_records<W: Write>(frame: &DataFrame, writer: &mut csv::Writer<W>) -> csv::Result<()> {
    writer.write_record(frame.get_column_names_str())?;
    let columns = frame.get_columns();
    for row in 0..frame.height() {
        let record: Vec<String> = columns
            .iter()
            .map(|column| any_to_output(column.get(row).unwrap_or(AnyValue::Null)))
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn tsv_writer<W: Write>(inner: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(inner)
}

/// Renders a frame as TSV text.
pub fn render_tsv(frame: &DataFrame) -> Result<String> {
    let mut writer = tsv_writer(Vec::new());
    write_records(frame, &mut writer).map_err(|source| OutputError::Csv {
        path: "<memory>".into(),
        source,
    })?;
    let bytes = writer
        .into_inner()
        .map_err(|e| OutputError::io("<memory>", e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Writes a frame to `path`, creating parent directories.
pub fn write_tsv(frame: &DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| OutputError::io(parent, e))?;
    }
    let file = fs::File::create(path).map_err(|e| OutputError::io(path, e))?;
    let mut writer = tsv_writer(file);
    write_records(frame, &mut writer).map_err(|source| OutputError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        path = %path.display(),
        rows = frame.height(),
        columns = frame.width(),
        "table written"
    );
    Ok(())
}

/// Converts and writes a table in one step.
pub fn write_table(table: &Table, path: &Path) -> Result<()> {
    write_tsv(&table_to_frame(table)?, path)
}
