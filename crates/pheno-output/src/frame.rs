//! Typed Polars frames from phenotype tables.

use polars::prelude::{Column, DataFrame, NamedFrom, Series};

use pheno_model::{Cell, Table};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Integer,
    Float,
    Boolean,
    Text,
}

/// Picks the narrowest type holding every present cell; all-missing columns are text.
fn column_kind(cells: &[&Cell]) -> ColumnKind {
    let present: Vec<&Cell> = cells.iter().copied().filter(|cell| !cell.is_missing()).collect();
    if present.is_empty() {
        return ColumnKind::Text;
    }
    if present.iter().all(|cell| matches!(cell, Cell::Flag(_))) {
        return ColumnKind::Boolean;
    }
    let numbers: Option<Vec<f64>> = present
        .iter()
        .map(|cell| match cell {
            Cell::Number(value) => Some(*value),
            _ => None,
        })
        .collect();
    match numbers {
        Some(values)
            if values
                .iter()
                .all(|v| v.fract() == 0.0 && v.abs() < i64::MAX as f64) =>
        {
            ColumnKind::Integer
        }
        Some(_) => ColumnKind::Float,
        None => ColumnKind::Text,
    }
}

fn to_column(name: &str, cells: &[&Cell]) -> Column {
    let series = match column_kind(cells) {
        ColumnKind::Integer => {
            let values: Vec<Option<i64>> = cells.iter().map(|cell| cell.as_i64()).collect();
            Series::new(name.into(), values)
        }
        ColumnKind::Float => {
            let values: Vec<Option<f64>> = cells.iter().map(|cell| cell.as_f64()).collect();
            Series::new(name.into(), values)
        }
        ColumnKind::Boolean => {
            let values: Vec<Option<bool>> = cells.iter().map(|cell| cell.as_flag()).collect();
            Series::new(name.into(), values)
        }
        ColumnKind::Text => {
            let values: Vec<Option<String>> = cells.iter().map(|cell| cell.as_text()).collect();
            Series::new(name.into(), values)
        }
    };
    series.into()
}

/// Converts a table into a frame, one typed column per table column.
pub fn table_to_frame(table: &Table) -> Result<DataFrame> {
    let columns = table
        .columns
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let cells: Vec<&Cell> = table.rows.iter().map(|row| &row[idx]).collect();
            to_column(name, &cells)
        })
        .collect();
    Ok(DataFrame::new(columns)?)
}
