//! Merging phenotype tables into QC rows, and the master-table filters.

use std::collections::BTreeSet;

use tracing::debug;

use pheno_model::{CohortConfig, PARTICIPANT_ID, Result, Table};

use crate::matcher::asof_join;
use crate::qc::DATASET_COLUMN;

/// Columns of the pooled QC/phenotype master table, in output order.
pub const MASTER_COLUMNS: &[&str] = &[
    "identifier",
    PARTICIPANT_ID,
    "ses",
    "run",
    "age",
    "sex",
    "site",
    "diagnosis",
    DATASET_COLUMN,
    "mean_fd_raw",
    "mean_fd_scrubbed",
    "proportion_kept",
    "functional_dice",
    "pass_func_qc",
    "anatomical_dice",
    "pass_anat_qc",
    "pass_all_qc",
    "different_func_affine",
];

/// [`MASTER_COLUMNS`] plus `qc_column` when it is not one of them.
pub fn master_columns(qc_column: &str) -> Vec<&str> {
    let mut columns: Vec<&str> = MASTER_COLUMNS.to_vec();
    if !columns.contains(&qc_column) {
        columns.push(qc_column);
    }
    columns
}

/// QC rows of the cohort's dataset with its phenotype merged in.
///
/// The phenotype value wins where both tables carry a column (`site`).
/// Only [`MASTER_COLUMNS`] that exist are kept.
pub fn merge_qc_pheno(
    qc: &Table,
    pheno: &Table,
    config: &CohortConfig,
    qc_column: &str,
) -> Result<Table> {
    qc.require_column(PARTICIPANT_ID)?;
    qc.require_column(qc_column)?;
    let dataset_idx = qc.require_column(DATASET_COLUMN)?;
    let dataset = config.dataset();
    let rows = qc
        .filter_rows(|row| row[dataset_idx].as_text().as_deref() == Some(dataset))
        .rename(config.name());

    let merged = asof_join(&rows, pheno, &config.qc_merge, &[], None)?;
    let out = merged.select_columns(&master_columns(qc_column));
    debug!(
        dataset,
        qc_rows = rows.len(),
        pheno_rows = pheno.len(),
        "qc and phenotype merged"
    );
    Ok(out)
}

/// Rows whose QC flag is true; missing flags fail.
pub fn filter_passed(table: &Table, qc_column: &str) -> Result<Table> {
    let idx = table.require_column(qc_column)?;
    Ok(table.filter_rows(|row| row[idx].as_flag() == Some(true)))
}

/// Rows whose diagnosis is one of `diagnoses`.
pub fn filter_diagnoses(table: &Table, diagnoses: &[String]) -> Result<Table> {
    let idx = table.require_column("diagnosis")?;
    let wanted: BTreeSet<&str> = diagnoses.iter().map(String::as_str).collect();
    Ok(table.filter_rows(|row| {
        row[idx]
            .as_text()
            .is_some_and(|diagnosis| wanted.contains(diagnosis.as_str()))
    }))
}

/// Rows belonging to any of `datasets`.
pub fn filter_datasets(table: &Table, datasets: &[String]) -> Result<Table> {
    let idx = table.require_column(DATASET_COLUMN)?;
    Ok(table.filter_rows(|row| {
        row[idx]
            .as_text()
            .is_some_and(|dataset| datasets.contains(&dataset))
    }))
}
