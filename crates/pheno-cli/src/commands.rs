use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::Table as DisplayTable;
use tracing::info_span;

use pheno_cli::pipeline::{assemble_pool, merge_datasets, normalize_cohort, pheno_paths};
use pheno_ingest::{CohortRegistry, ReadOptions, builtin_pool_config, load_pool_config, read_table};
use pheno_model::{JoinMode, Table};
use pheno_output::{write_dictionary, write_table};
use pheno_transform::{GROUP_COLUMN, summary_table};

use crate::cli::{ConfigArgs, NormalizeArgs, PoolArgs, QcArgs};
use crate::summary::apply_table_style;
use crate::types::{GroupSummary, NormalizeResult, PoolResult, QcResult};

const QC_SUMMARY_FILE: &str = "qc_summary.tsv";
const PASSED_MASTER_FILE: &str = "passed_qc_master.tsv";
const FINAL_FILE: &str = "final_qc_pheno.tsv";

fn load_registry(args: &ConfigArgs) -> Result<CohortRegistry> {
    CohortRegistry::with_files(&args.cohort_configs).context("load cohort configurations")
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))
}

pub fn run_cohorts(args: &ConfigArgs) -> Result<()> {
    let registry = load_registry(args)?;
    let mut table = DisplayTable::new();
    table.set_header(vec!["Cohort", "Dataset", "Joins", "QC merge", "Severity"]);
    apply_table_style(&mut table);
    for config in registry.iter() {
        let joins: Vec<&str> = config.joins.iter().map(|join| join.source.as_str()).collect();
        let qc_merge = match (config.qc_merge.mode, &config.qc_merge.left.session) {
            (JoinMode::Participant, _) | (JoinMode::Nearest, None) => "participant".to_string(),
            (JoinMode::Nearest, Some(session)) => format!("nearest {}", session.scale),
        };
        let severity = config
            .severity
            .as_ref()
            .map_or_else(|| "-".to_string(), |severity| severity.instrument.clone());
        table.add_row(vec![
            config.name().to_string(),
            config.dataset().to_string(),
            if joins.is_empty() { "-".to_string() } else { joins.join(", ") },
            qc_merge,
            severity,
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn run_normalize(args: &NormalizeArgs) -> Result<NormalizeResult> {
    let span = info_span!("cohort", cohort = %args.cohort);
    let _guard = span.enter();
    let registry = load_registry(&args.config)?;
    let config = registry.get(&args.cohort)?;

    let output = normalize_cohort(config, &args.input, &args.aux)?;
    ensure_dir(&args.output_dir)?;
    let (table_path, dictionary_path) = pheno_paths(&args.output_dir, config.name());
    write_table(&output.cohort.table, &table_path)
        .with_context(|| format!("write {}", table_path.display()))?;
    write_dictionary(&output.cohort.dictionary, &dictionary_path)
        .with_context(|| format!("write {}", dictionary_path.display()))?;

    Ok(NormalizeResult {
        cohort: config.name().to_string(),
        input_rows: output.input_rows,
        output_rows: output.cohort.table.len(),
        columns: output.cohort.table.columns.clone(),
        table_path,
        dictionary_path,
    })
}

pub fn run_qc(args: &QcArgs) -> Result<QcResult> {
    let registry = load_registry(&args.config)?;
    let qc = read_table(&args.qc_file, &ReadOptions::tsv())
        .with_context(|| format!("read QC table {}", args.qc_file.display()))?;

    let output = merge_datasets(
        &qc,
        &registry,
        &args.pheno_dir,
        &args.datasets,
        &args.qc_column,
        &args.diagnoses,
    )?;

    ensure_dir(&args.output_dir)?;
    let summary_path = args.output_dir.join(QC_SUMMARY_FILE);
    write_table(&summary_table(&output.summaries), &summary_path)
        .with_context(|| format!("write {}", summary_path.display()))?;
    let passed_path = args.output_dir.join(PASSED_MASTER_FILE);
    write_table(&output.passed, &passed_path)
        .with_context(|| format!("write {}", passed_path.display()))?;

    Ok(QcResult {
        summaries: output.summaries,
        master_rows: output.master.len(),
        passed_rows: output.passed.len(),
        summary_path,
        passed_path,
        errors: output.errors,
    })
}

fn label_counts(table: &Table) -> Result<BTreeMap<String, usize>> {
    let mut counts = BTreeMap::new();
    for label in table.column_text(GROUP_COLUMN)? {
        *counts
            .entry(label.unwrap_or_else(|| "n/a".to_string()))
            .or_insert(0) += 1;
    }
    Ok(counts)
}

pub fn run_pool(args: &PoolArgs) -> Result<PoolResult> {
    let registry = load_registry(&args.config)?;
    let pool = match &args.pool_config {
        Some(path) => load_pool_config(path),
        None => builtin_pool_config(),
    }
    .context("load pool configuration")?;
    let master = read_table(&args.master, &ReadOptions::tsv())
        .with_context(|| format!("read master table {}", args.master.display()))?;

    let output = assemble_pool(&master, &registry, &pool, &args.inventories)?;

    ensure_dir(&args.output_dir)?;
    let mut groups = Vec::new();
    for group in &output.groups {
        let severity_path = if group.severity {
            let path = args.output_dir.join(format!("{}_severity.tsv", group.name));
            write_table(&group.table, &path)
                .with_context(|| format!("write {}", path.display()))?;
            Some(path)
        } else {
            None
        };
        groups.push(GroupSummary {
            name: group.name.clone(),
            rows: group.table.len(),
            labels: label_counts(&group.table)?,
            severity_path,
        });
    }
    let pooled_path = args.output_dir.join(FINAL_FILE);
    write_table(&output.pooled, &pooled_path)
        .with_context(|| format!("write {}", pooled_path.display()))?;

    Ok(PoolResult {
        groups,
        pooled_rows: output.pooled.len(),
        pooled_path,
        errors: output.errors,
    })
}
