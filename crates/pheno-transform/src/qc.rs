//! QC pass-rate roll-up at scan, session and participant level.

use std::collections::BTreeMap;

use pheno_model::{Cell, PARTICIPANT_ID, Result, Table};

pub const DATASET_COLUMN: &str = "dataset";
pub const SESSION_COLUMN: &str = "ses";

/// QC outcome of one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QcRun {
    pub dataset: String,
    pub participant: String,
    /// Blank or absent labels form one implicit session per participant.
    pub session: Option<String>,
    pub passed: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassCount {
    pub total: usize,
    pub passed: usize,
}

impl PassCount {
    fn add(&mut self, passed: bool) {
        self.total += 1;
        if passed {
            self.passed += 1;
        }
    }

    /// Pass rate in percent; `0` when there is nothing to count.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64 * 100.0
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QcSummary {
    pub scans: PassCount,
    pub sessions: PassCount,
    pub participants: PassCount,
}

/// Rolls runs up: a session passes if any of its runs passes, a participant
/// if any of its sessions passes.
pub fn summarize(runs: &[QcRun]) -> QcSummary {
    let mut scans = PassCount::default();
    let mut sessions: BTreeMap<(&str, &str), bool> = BTreeMap::new();
    for run in runs {
        scans.add(run.passed);
        let label = run
            .session
            .as_deref()
            .map(str::trim)
            .unwrap_or_default();
        *sessions
            .entry((run.participant.as_str(), label))
            .or_default() |= run.passed;
    }

    let mut participants: BTreeMap<&str, bool> = BTreeMap::new();
    let mut session_count = PassCount::default();
    for ((participant, _), passed) in &sessions {
        session_count.add(*passed);
        *participants.entry(*participant).or_default() |= *passed;
    }
    let mut participant_count = PassCount::default();
    for passed in participants.values() {
        participant_count.add(*passed);
    }

    QcSummary {
        scans,
        sessions: session_count,
        participants: participant_count,
    }
}

/// One summary per dataset, in dataset name order.
pub fn summarize_by_dataset(runs: &[QcRun]) -> BTreeMap<String, QcSummary> {
    let mut by_dataset: BTreeMap<&str, Vec<QcRun>> = BTreeMap::new();
    for run in runs {
        by_dataset
            .entry(run.dataset.as_str())
            .or_default()
            .push(run.clone());
    }
    by_dataset
        .into_iter()
        .map(|(dataset, runs)| (dataset.to_string(), summarize(&runs)))
        .collect()
}

/// Reads runs from a merged QC table; a missing or unreadable flag counts as failed.
///
/// Rows without a participant are not scans of anyone and are skipped.
pub fn runs_from_table(table: &Table, qc_column: &str) -> Result<Vec<QcRun>> {
    let dataset_idx = table.require_column(DATASET_COLUMN)?;
    let participant_idx = table.require_column(PARTICIPANT_ID)?;
    let flag_idx = table.require_column(qc_column)?;
    let session_idx = table.column_index(SESSION_COLUMN);

    Ok((0..table.len())
        .filter_map(|row| {
            let participant = table.cell(row, participant_idx).as_text()?;
            Some(QcRun {
                dataset: table
                    .cell(row, dataset_idx)
                    .as_text()
                    .unwrap_or_default(),
                participant,
                session: session_idx.and_then(|idx| table.cell(row, idx).as_text()),
                passed: table.cell(row, flag_idx).as_flag().unwrap_or(false),
            })
        })
        .collect())
}

pub const SUMMARY_COLUMNS: &[&str] = &[
    DATASET_COLUMN,
    "Total Scans",
    "Total Scan Passes",
    "Total Sessions",
    "Total Session Passes",
    "Total Subjects",
    "Total Subject Passes",
];

/// Renders per-dataset summaries as the `qc_summary` table.
pub fn summary_table(summaries: &BTreeMap<String, QcSummary>) -> Table {
    let mut table = Table::new(
        "qc_summary",
        SUMMARY_COLUMNS.iter().map(|c| (*c).to_string()).collect(),
    );
    let count = |value: usize| Cell::Number(value as f64);
    for (dataset, summary) in summaries {
        table.push_row(vec![
            Cell::text(dataset),
            count(summary.scans.total),
            count(summary.scans.passed),
            count(summary.sessions.total),
            count(summary.sessions.passed),
            count(summary.participants.total),
            count(summary.participants.passed),
        ]);
    }
    table
}
