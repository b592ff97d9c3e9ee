//! Pool assembly: severity alignment, relabelling and group assignment.

use std::time::Instant;

use tracing::{debug, info_span};

use pheno_model::{
    Cell, CohortConfig, CohortGroup, GroupLabeling, LabelingKind, PhenoError, Result,
    STATUS_COLUMN, Table, severity_columns,
};

use crate::matcher::asof_join;
use crate::merge::filter_datasets;
use crate::selection::{SelectionPolicy, select_table};
use crate::severity::score_inventory;

pub const GROUP_COLUMN: &str = "group";

/// Scores a cohort's inventory, aligns it to the cohort's master rows and
/// selects one session per participant.
pub fn prepare_severity_cohort(
    rows: &Table,
    config: &CohortConfig,
    inventory: &Table,
) -> Result<Table> {
    let span = info_span!("severity", cohort = %config.name());
    let _guard = span.enter();
    let start = Instant::now();
    let severity = config.severity.as_ref().ok_or_else(|| {
        PhenoError::invalid_config(config.name(), "no severity inventory is configured")
    })?;

    let scored = score_inventory(inventory, severity)?;
    let columns: Vec<String> = severity_columns()
        .into_iter()
        .map(str::to_string)
        .collect();
    let matched = asof_join(rows, &scored, &severity.match_on, &columns, None)?;
    let policy = SelectionPolicy::from_config(&severity.selection);
    let selected = select_table(&matched, severity.match_on.left.session.as_ref(), &policy)?;

    debug!(
        rows = rows.len(),
        inventory_rows = inventory.len(),
        selected = selected.len(),
        duration_ms = start.elapsed().as_millis(),
        "severity cohort prepared"
    );
    Ok(selected)
}

/// Replaces diagnosis labels through the group's relabel map.
pub fn relabel(table: &Table, group: &CohortGroup) -> Result<Table> {
    let idx = table.require_column("diagnosis")?;
    let cells = table
        .rows
        .iter()
        .map(|row| match &row[idx] {
            Cell::Text(label) => Cell::text(group.relabel.get(label).unwrap_or(label)),
            other => other.clone(),
        })
        .collect();
    Ok(table.with_column("diagnosis", cells))
}

fn group_label(labeling: &GroupLabeling, diagnosis: Option<&str>, status: Option<i64>) -> Cell {
    let Some(diagnosis) = diagnosis else {
        return Cell::Missing;
    };
    if diagnosis == labeling.control {
        return Cell::text(&labeling.control_label);
    }
    if !labeling.diagnoses.iter().any(|label| label == diagnosis) {
        return Cell::Missing;
    }
    match labeling.kind {
        LabelingKind::Diagnosis => Cell::text(diagnosis),
        LabelingKind::SeveritySplit => match status {
            Some(1) => Cell::Text(format!("{diagnosis}+")),
            Some(0) => Cell::Text(format!("{diagnosis}-")),
            _ => Cell::Missing,
        },
    }
}

/// Adds the analysis `group` column.
pub fn assign_groups(table: &Table, labeling: &GroupLabeling) -> Result<Table> {
    let diagnosis_idx = table.require_column("diagnosis")?;
    let status_idx = match labeling.kind {
        LabelingKind::SeveritySplit => Some(table.require_column(STATUS_COLUMN)?),
        LabelingKind::Diagnosis => None,
    };
    let cells = table
        .rows
        .iter()
        .map(|row| {
            group_label(
                labeling,
                row[diagnosis_idx].as_text().as_deref(),
                status_idx.and_then(|idx| row[idx].as_i64()),
            )
        })
        .collect();
    Ok(table.with_column(GROUP_COLUMN, cells))
}

/// Relabels and groups a group's rows; `rows` are already selected when the
/// group is severity-based.
pub fn finish_group(rows: &Table, group: &CohortGroup) -> Result<Table> {
    let relabelled = relabel(rows, group)?;
    assign_groups(&relabelled, &group.labeling).map(|table| table.rename(&group.name))
}

/// Master rows of the group's datasets.
pub fn group_rows(master: &Table, group: &CohortGroup) -> Result<Table> {
    filter_datasets(master, &group.datasets)
}

pub fn drop_severity_columns(table: &Table) -> Table {
    table.drop_columns(&severity_columns())
}
