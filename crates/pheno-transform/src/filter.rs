use regex::Regex;

use pheno_model::{Cell, FilterOp, Result, RowFilter, Table};

use crate::text::compile_regex;

#[derive(Debug, Clone)]
enum Test {
    Equals(String),
    NotEquals(String),
    Matches(Regex),
    NotMatches(Regex),
}

/// A row filter with its regex compiled.
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    column: String,
    test: Test,
}

impl CompiledFilter {
    pub fn compile(filter: &RowFilter, cohort: &str) -> Result<Self> {
        let test = match filter.op {
            FilterOp::Equals => Test::Equals(filter.value.clone()),
            FilterOp::NotEquals => Test::NotEquals(filter.value.clone()),
            FilterOp::Matches => Test::Matches(compile_regex(&filter.value, cohort)?),
            FilterOp::NotMatches => Test::NotMatches(compile_regex(&filter.value, cohort)?),
        };
        Ok(Self {
            column: filter.column.clone(),
            test,
        })
    }

    /// Missing cells never equal or match anything.
    fn keeps(&self, cell: &Cell) -> bool {
        let text = cell.as_text();
        match (&self.test, text.as_deref()) {
            (Test::Equals(value), Some(text)) => text == value,
            (Test::NotEquals(value), Some(text)) => text != value,
            (Test::Matches(regex), Some(text)) => regex.is_match(text),
            (Test::NotMatches(regex), Some(text)) => !regex.is_match(text),
            (Test::Equals(_) | Test::Matches(_), None) => false,
            (Test::NotEquals(_) | Test::NotMatches(_), None) => true,
        }
    }
}

pub fn compile_filters(filters: &[RowFilter], cohort: &str) -> Result<Vec<CompiledFilter>> {
    filters
        .iter()
        .map(|filter| CompiledFilter::compile(filter, cohort))
        .collect()
}

/// Keeps rows that pass every filter.
pub fn apply_filters(table: &Table, filters: &[CompiledFilter]) -> Result<Table> {
    let indices = filters
        .iter()
        .map(|filter| table.require_column(&filter.column))
        .collect::<Result<Vec<_>>>()?;
    Ok(table.filter_rows(|row| {
        filters
            .iter()
            .zip(&indices)
            .all(|(filter, &idx)| filter.keeps(&row[idx]))
    }))
}
