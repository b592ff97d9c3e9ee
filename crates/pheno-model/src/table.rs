#![deny(unsafe_code)]

use std::collections::BTreeMap;

use pheno_common::{format_numeric, parse_f64, parse_i64};

use crate::error::{PhenoError, Result};

/// One cell of a phenotype table.
///
/// Every stage reads and writes the same missing state; readers collapse
/// all missing spellings into [`Cell::Missing`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Cell {
    Text(String),
    Number(f64),
    Flag(bool),
    Missing,
}

static MISSING_CELL: Cell = Cell::Missing;

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Wraps an optional number, mapping `None` to [`Cell::Missing`].
    pub fn number(value: Option<f64>) -> Self {
        value.map_or(Self::Missing, Self::Number)
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Text rendering of the cell, `None` when missing.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Text(value) => Some(value.clone()),
            Self::Number(value) => Some(format_numeric(*value)),
            Self::Flag(value) => Some(if *value { "True" } else { "False" }.to_string()),
            Self::Missing => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(value) => parse_f64(value),
            Self::Flag(_) | Self::Missing => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(value) => parse_i64(&format_numeric(*value)),
            Self::Text(value) => parse_i64(value),
            Self::Flag(_) | Self::Missing => None,
        }
    }

    /// Interprets the cell as a QC flag.
    ///
    /// Accepts the spellings found in QC exports (`True`, `true`, `1`, `yes`).
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(value) => Some(*value),
            Self::Number(value) if *value == 1.0 => Some(true),
            Self::Number(value) if *value == 0.0 => Some(false),
            Self::Text(value) => match value.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "1.0" | "yes" | "y" => Some(true),
                "false" | "0" | "0.0" | "no" | "n" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

/// A named table of cells with row-aligned columns.
///
/// Stages never mutate their input; the helpers below return new tables.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Builds a table from string literals; `None` cells are missing.
    pub fn from_rows(name: &str, columns: &[&str], rows: &[Vec<Option<&str>>]) -> Self {
        let mut table = Self::new(name, columns.iter().map(|c| (*c).to_string()).collect());
        for row in rows {
            table.push_row(
                row.iter()
                    .map(|value| value.map_or(Cell::Missing, Cell::text))
                    .collect(),
            );
        }
        table
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends a row, padding with missing cells or truncating to the column count.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Missing);
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Looks up a required column; absence is a schema violation.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| PhenoError::missing_column(&self.name, name))
    }

    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .unwrap_or(&MISSING_CELL)
    }

    /// Cells of a required column in row order.
    pub fn column_cells(&self, name: &str) -> Result<Vec<&Cell>> {
        let idx = self.require_column(name)?;
        Ok((0..self.len()).map(|row| self.cell(row, idx)).collect())
    }

    /// Text values of a required column in row order.
    pub fn column_text(&self, name: &str) -> Result<Vec<Option<String>>> {
        Ok(self
            .column_cells(name)?
            .into_iter()
            .map(Cell::as_text)
            .collect())
    }

    /// Returns the rows at `indices`, in the given order.
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        let mut out = Self::new(&self.name, self.columns.clone());
        for &idx in indices {
            if let Some(row) = self.rows.get(idx) {
                out.rows.push(row.clone());
            }
        }
        out
    }

    pub fn filter_rows(&self, mut keep: impl FnMut(&[Cell]) -> bool) -> Self {
        let mut out = Self::new(&self.name, self.columns.clone());
        out.rows = self
            .rows
            .iter()
            .filter(|row| keep(row))
            .cloned()
            .collect();
        out
    }

    /// Returns a copy with `name` set to `cells`, replacing an existing column in place.
    pub fn with_column(&self, name: &str, cells: Vec<Cell>) -> Self {
        let mut out = self.clone();
        out.set_column(name, cells);
        out
    }

    /// Sets a column on an owned table; used by builders that own their output.
    pub fn set_column(&mut self, name: &str, mut cells: Vec<Cell>) {
        cells.resize(self.rows.len(), Cell::Missing);
        match self.column_index(name) {
            Some(idx) => {
                for (row, cell) in self.rows.iter_mut().zip(cells) {
                    row[idx] = cell;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, cell) in self.rows.iter_mut().zip(cells) {
                    row.push(cell);
                }
            }
        }
    }

    /// Drops the named columns; names that are absent are ignored.
    pub fn drop_columns(&self, names: &[&str]) -> Self {
        let keep: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, column)| !names.contains(&column.as_str()))
            .map(|(idx, _)| idx)
            .collect();
        self.project(&keep)
    }

    /// Keeps the named columns that exist, in the order given.
    pub fn select_columns(&self, names: &[&str]) -> Self {
        let keep: Vec<usize> = names
            .iter()
            .filter_map(|name| self.column_index(name))
            .collect();
        self.project(&keep)
    }

    pub fn rename(&self, name: impl Into<String>) -> Self {
        let mut out = self.clone();
        out.name = name.into();
        out
    }

    fn project(&self, keep: &[usize]) -> Self {
        let columns = keep.iter().map(|&idx| self.columns[idx].clone()).collect();
        let mut out = Self::new(&self.name, columns);
        out.rows = self
            .rows
            .iter()
            .map(|row| keep.iter().map(|&idx| row[idx].clone()).collect())
            .collect();
        out
    }

    /// Stacks tables over the union of their columns in first-seen order.
    ///
    /// Cells for columns a table lacks are missing.
    pub fn concat(name: impl Into<String>, tables: &[Table]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for table in tables {
            for column in &table.columns {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }
        let positions: BTreeMap<&str, usize> = columns
            .iter()
            .enumerate()
            .map(|(idx, column)| (column.as_str(), idx))
            .collect();
        let mut out = Self::new(name, columns.clone());
        for table in tables {
            let targets: Vec<usize> = table
                .columns
                .iter()
                .map(|column| positions[column.as_str()])
                .collect();
            for row in &table.rows {
                let mut cells = vec![Cell::Missing; columns.len()];
                for (cell, &target) in row.iter().zip(&targets) {
                    cells[target] = cell.clone();
                }
                out.rows.push(cells);
            }
        }
        out
    }
}
