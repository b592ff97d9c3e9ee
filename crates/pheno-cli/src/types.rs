use std::collections::BTreeMap;
use std::path::PathBuf;

use pheno_transform::QcSummary;

#[derive(Debug)]
pub struct NormalizeResult {
    pub cohort: String,
    pub input_rows: usize,
    pub output_rows: usize,
    pub columns: Vec<String>,
    pub table_path: PathBuf,
    pub dictionary_path: PathBuf,
}

#[derive(Debug)]
pub struct QcResult {
    pub summaries: BTreeMap<String, QcSummary>,
    pub master_rows: usize,
    pub passed_rows: usize,
    pub summary_path: PathBuf,
    pub passed_path: PathBuf,
    pub errors: Vec<String>,
}

#[derive(Debug)]
pub struct GroupSummary {
    pub name: String,
    pub rows: usize,
    /// Rows per group label; unlabelled rows count under `n/a`.
    pub labels: BTreeMap<String, usize>,
    pub severity_path: Option<PathBuf>,
}

#[derive(Debug)]
pub struct PoolResult {
    pub groups: Vec<GroupSummary>,
    pub pooled_rows: usize,
    pub pooled_path: PathBuf,
    pub errors: Vec<String>,
}
