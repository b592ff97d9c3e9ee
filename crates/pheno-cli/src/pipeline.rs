//! Pooling pipeline with explicit stages.
//!
//! 1. **Normalize**: read a cohort export and its auxiliary files, map them to
//!    the canonical phenotype table
//! 2. **Merge**: attach each dataset's phenotype to its QC rows and roll up pass
//!    rates
//! 3. **Pool**: score and align symptom inventories, select sessions, relabel and
//!    group the pooled rows
//!
//! Stages collect per-cohort failures in `errors` and carry on with the
//! remaining cohorts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, info, info_span, trace, warn};

use pheno_ingest::{CohortRegistry, ReadOptions, read_table};
use pheno_model::{CohortConfig, PARTICIPANT_ID, PoolConfig, Table};
use pheno_transform::qc::DATASET_COLUMN;
use pheno_transform::{
    GROUP_COLUMN, NormalizedCohort, QcSummary, drop_severity_columns, filter_datasets,
    filter_diagnoses, filter_passed, finish_group, group_rows, master_columns, merge_qc_pheno,
    normalize, prepare_severity_cohort, runs_from_table, summarize_by_dataset,
};

use crate::logging::redact_value;

/// A `NAME=PATH` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedPath {
    pub name: String,
    pub path: PathBuf,
}

impl FromStr for NamedPath {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.split_once('=') {
            Some((name, path)) if !name.trim().is_empty() && !path.trim().is_empty() => Ok(Self {
                name: name.trim().to_string(),
                path: PathBuf::from(path.trim()),
            }),
            _ => Err(format!("expected NAME=PATH, got {value:?}")),
        }
    }
}

/// `<cohort>_pheno.tsv` and its JSON sidecar.
pub fn pheno_paths(dir: &Path, cohort: &str) -> (PathBuf, PathBuf) {
    (
        dir.join(format!("{cohort}_pheno.tsv")),
        dir.join(format!("{cohort}_pheno.json")),
    )
}

// ============================================================================
// Stage 1: Normalize
// ============================================================================

pub fn read_cohort_input(config: &CohortConfig, path: &Path) -> Result<Table> {
    let options = ReadOptions::default()
        .with_delimiter(config.source.delimiter)
        .with_missing_tokens(&config.source.missing_tokens)
        .with_skipped_rows(config.source.skip_rows_after_header);
    read_table(path, &options).with_context(|| format!("read {} export", config.name()))
}

/// Reads the files named by the cohort's joins; unknown names are rejected.
///
/// Joins without a supplied file are left for the adapter to report.
pub fn read_aux_inputs(
    config: &CohortConfig,
    inputs: &[NamedPath],
) -> Result<BTreeMap<String, Table>> {
    let mut tables = BTreeMap::new();
    for input in inputs {
        let Some(join) = config.joins.iter().find(|join| join.source == input.name) else {
            let known: Vec<&str> = config.joins.iter().map(|join| join.source.as_str()).collect();
            bail!(
                "{} has no auxiliary input named {} (expected one of: {})",
                config.name(),
                input.name,
                known.join(", ")
            );
        };
        let tokens = if join.missing_tokens.is_empty() {
            &config.source.missing_tokens
        } else {
            &join.missing_tokens
        };
        let options = ReadOptions::default()
            .with_delimiter(join.delimiter.unwrap_or(config.source.delimiter))
            .with_missing_tokens(tokens);
        let table = read_table(&input.path, &options)
            .with_context(|| format!("read {} input {}", config.name(), input.name))?;
        tables.insert(input.name.clone(), table);
    }
    Ok(tables)
}

/// Result of the normalize stage.
#[derive(Debug)]
pub struct NormalizeOutput {
    pub input_rows: usize,
    pub cohort: NormalizedCohort,
}

pub fn normalize_cohort(
    config: &CohortConfig,
    input: &Path,
    aux: &[NamedPath],
) -> Result<NormalizeOutput> {
    let table = read_cohort_input(config, input)?;
    let aux_tables = read_aux_inputs(config, aux)?;
    let cohort = normalize(config, &table, &aux_tables)
        .with_context(|| format!("normalize {}", config.name()))?;
    Ok(NormalizeOutput {
        input_rows: table.len(),
        cohort,
    })
}

// ============================================================================
// Stage 2: Merge QC and phenotype
// ============================================================================

/// Result of the merge stage.
#[derive(Debug)]
pub struct MergeOutput {
    /// Merged rows of every dataset, before pass filtering.
    pub master: Table,
    /// Pass-rate roll-up per dataset.
    pub summaries: BTreeMap<String, QcSummary>,
    /// Rows that passed QC (and the diagnosis filter, when given).
    pub passed: Table,
    pub errors: Vec<String>,
}

/// Datasets to merge: the requested ones, or every QC dataset with a cohort.
fn merge_targets(qc: &Table, registry: &CohortRegistry, requested: &[String]) -> Result<Vec<String>> {
    if !requested.is_empty() {
        return Ok(requested.to_vec());
    }
    let mut datasets: Vec<String> = qc
        .column_text(DATASET_COLUMN)?
        .into_iter()
        .flatten()
        .filter(|dataset| registry.by_dataset(dataset).is_ok())
        .collect();
    datasets.sort();
    datasets.dedup();
    Ok(datasets)
}

pub fn merge_datasets(
    qc: &Table,
    registry: &CohortRegistry,
    pheno_dir: &Path,
    datasets: &[String],
    qc_column: &str,
    diagnoses: &[String],
) -> Result<MergeOutput> {
    let span = info_span!("merge", qc_column);
    let _guard = span.enter();
    let start = Instant::now();

    let mut errors = Vec::new();
    let mut merged = Vec::new();
    for dataset in merge_targets(qc, registry, datasets)? {
        let config = match registry.by_dataset(&dataset) {
            Ok(config) => config,
            Err(error) => {
                errors.push(format!("{dataset}: {error}"));
                continue;
            }
        };
        let (path, _) = pheno_paths(pheno_dir, config.name());
        let result = read_table(&path, &ReadOptions::tsv())
            .with_context(|| format!("read {} phenotype", config.name()))
            .and_then(|pheno| {
                merge_qc_pheno(qc, &pheno, config, qc_column)
                    .with_context(|| format!("merge {} with QC", config.name()))
            });
        match result {
            Ok(table) => {
                info!(dataset = %dataset, rows = table.len(), "dataset merged");
                merged.push(table);
            }
            Err(error) => {
                warn!(dataset = %dataset, "dataset skipped");
                errors.push(format!("{dataset}: {error:#}"));
            }
        }
    }

    if merged.is_empty() {
        bail!("no dataset could be merged: {}", errors.join("; "));
    }
    let master = Table::concat("master", &merged).select_columns(&master_columns(qc_column));
    let runs = runs_from_table(&master, qc_column).context("summarise QC")?;
    let summaries = summarize_by_dataset(&runs);
    let mut passed = filter_passed(&master, qc_column)?;
    if !diagnoses.is_empty() {
        passed = filter_diagnoses(&passed, diagnoses)?;
    }

    debug!(
        datasets = merged.len(),
        master_rows = master.len(),
        passed_rows = passed.len(),
        duration_ms = start.elapsed().as_millis(),
        "merge stage complete"
    );
    Ok(MergeOutput {
        master,
        summaries,
        passed,
        errors,
    })
}

// ============================================================================
// Stage 3: Pool
// ============================================================================

pub fn read_inventory(config: &CohortConfig, path: &Path) -> Result<Table> {
    let severity = config
        .severity
        .as_ref()
        .ok_or_else(|| anyhow!("{} has no symptom inventory configured", config.name()))?;
    let options = ReadOptions::default()
        .with_delimiter(severity.delimiter.unwrap_or(','))
        .with_missing_tokens(&severity.missing_tokens);
    read_table(path, &options).with_context(|| format!("read {} inventory", config.name()))
}

/// One pooled group.
#[derive(Debug)]
pub struct GroupOutput {
    pub name: String,
    /// Grouped rows, severity columns included for severity groups.
    pub table: Table,
    pub severity: bool,
}

/// Result of the pool stage.
#[derive(Debug)]
pub struct PoolOutput {
    pub groups: Vec<GroupOutput>,
    /// Every group's rows without the severity columns.
    pub pooled: Table,
    pub errors: Vec<String>,
}

/// Scores, aligns and selects one dataset's rows of a severity group.
fn severity_rows(
    dataset_rows: &Table,
    dataset: &str,
    registry: &CohortRegistry,
    inventories: &[NamedPath],
) -> Result<Table> {
    let config = registry.by_dataset(dataset)?;
    let input = inventories
        .iter()
        .find(|input| input.name == config.name())
        .ok_or_else(|| anyhow!("no inventory given for {}", config.name()))?;
    let inventory = read_inventory(config, &input.path)?;
    let selected = prepare_severity_cohort(dataset_rows, config, &inventory)
        .with_context(|| format!("score {} inventory", config.name()))?;
    debug!(
        cohort = %config.name(),
        rows = dataset_rows.len(),
        selected = selected.len(),
        "inventory aligned"
    );
    Ok(selected)
}

pub fn assemble_pool(
    master: &Table,
    registry: &CohortRegistry,
    pool: &PoolConfig,
    inventories: &[NamedPath],
) -> Result<PoolOutput> {
    let span = info_span!("pool", groups = pool.groups.len());
    let _guard = span.enter();
    let start = Instant::now();

    let mut errors = Vec::new();
    let mut groups = Vec::new();
    for group in &pool.groups {
        let rows = group_rows(master, group)?;
        let rows = if group.severity {
            let mut parts = Vec::new();
            for dataset in &group.datasets {
                let dataset_rows = filter_datasets(&rows, std::slice::from_ref(dataset))?;
                if dataset_rows.is_empty() {
                    continue;
                }
                match severity_rows(&dataset_rows, dataset, registry, inventories) {
                    Ok(table) => parts.push(table),
                    Err(error) => {
                        warn!(group = %group.name, dataset = %dataset, "dataset left out of pool");
                        errors.push(format!("{}/{dataset}: {error:#}", group.name));
                    }
                }
            }
            if parts.is_empty() {
                rows.take_rows(&[])
            } else {
                Table::concat(&group.name, &parts)
            }
        } else {
            rows
        };
        let table = finish_group(&rows, group)?;
        let labels = table.column_text(GROUP_COLUMN)?;
        let participants = table.column_text(PARTICIPANT_ID)?;
        for (label, participant) in labels.iter().zip(&participants) {
            if label.is_none() {
                trace!(
                    group = %group.name,
                    participant = redact_value(participant.as_deref().unwrap_or_default()),
                    "row without group label"
                );
            }
        }
        info!(group = %group.name, rows = table.len(), "group assembled");
        groups.push(GroupOutput {
            name: group.name.clone(),
            table,
            severity: group.severity,
        });
    }

    let stripped: Vec<Table> = groups
        .iter()
        .map(|group| drop_severity_columns(&group.table))
        .collect();
    let pooled = Table::concat("final_qc_pheno", &stripped);
    debug!(
        pooled_rows = pooled.len(),
        duration_ms = start.elapsed().as_millis(),
        "pool stage complete"
    );
    Ok(PoolOutput {
        groups,
        pooled,
        errors,
    })
}
