//! Per-participant session selection.
//!
//! A participant is classified by its chronologically first row. Controls
//! contribute that row. Cases contribute their first row that carries a
//! resolved severity status; a case with no such row contributes nothing.
//!
//! With [`Granularity::Session`] each row is classified on its own and every
//! admissible run of the first admissible session is kept.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use pheno_model::{
    Granularity, PARTICIPANT_ID, Result, STATUS_COLUMN, SelectionConfig, SessionKey, SessionTime,
    Table,
};

use crate::session::parse_session;

/// The fields selection looks at for one row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    pub participant: Option<String>,
    pub time: Option<SessionTime>,
    pub diagnosis: Option<String>,
    pub status: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionPolicy {
    pub control_labels: BTreeSet<String>,
    /// Any non-control diagnosis is a case when `None`.
    pub case_labels: Option<BTreeSet<String>>,
    pub granularity: Granularity,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self::from_config(&SelectionConfig::default())
    }
}

impl SelectionPolicy {
    pub fn from_config(config: &SelectionConfig) -> Self {
        Self {
            control_labels: config.control_labels.iter().cloned().collect(),
            case_labels: config
                .case_labels
                .as_ref()
                .map(|labels| labels.iter().cloned().collect()),
            granularity: config.granularity,
        }
    }

    fn is_control(&self, diagnosis: &str) -> bool {
        self.control_labels.contains(diagnosis)
    }

    fn is_case(&self, diagnosis: &str) -> bool {
        match &self.case_labels {
            Some(labels) => labels.contains(diagnosis),
            None => !self.is_control(diagnosis),
        }
    }

    pub fn is_admissible(&self, row: &Candidate) -> bool {
        match row.diagnosis.as_deref() {
            Some(diagnosis) if self.is_control(diagnosis) => true,
            Some(diagnosis) => self.is_case(diagnosis) && row.status.is_some(),
            None => false,
        }
    }
}

/// Rows with a session marker first, in time order, then by input position.
fn chronological(rows: &[Candidate], a: usize, b: usize) -> Ordering {
    match (&rows[a].time, &rows[b].time) {
        (Some(x), Some(y)) => x.value.total_cmp(&y.value),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then(a.cmp(&b))
}

/// The participant's first row if it is a control, else its first row with a
/// status when it is a case. `group` is in chronological order.
fn first_row(rows: &[Candidate], group: &[usize], policy: &SelectionPolicy) -> Option<usize> {
    let &first = group.first()?;
    let diagnosis = rows[first].diagnosis.as_deref()?;
    if policy.is_control(diagnosis) {
        Some(first)
    } else if policy.is_case(diagnosis) {
        group.iter().copied().find(|&idx| rows[idx].status.is_some())
    } else {
        None
    }
}

/// Every admissible row sharing the session of the first admissible row.
fn first_session(rows: &[Candidate], group: &[usize], policy: &SelectionPolicy) -> Vec<usize> {
    let Some(&first) = group.iter().find(|&&idx| policy.is_admissible(&rows[idx])) else {
        return Vec::new();
    };
    let Some(time) = rows[first].time else {
        return vec![first];
    };
    group
        .iter()
        .copied()
        .filter(|&idx| {
            rows[idx]
                .time
                .is_some_and(|t| t.value.total_cmp(&time.value).is_eq())
                && policy.is_admissible(&rows[idx])
        })
        .collect()
}

/// Indices of the selected rows, in input order.
pub fn select(rows: &[Candidate], policy: &SelectionPolicy) -> Vec<usize> {
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (idx, row) in rows.iter().enumerate() {
        if let Some(participant) = &row.participant {
            groups.entry(participant.as_str()).or_default().push(idx);
        }
    }

    let mut selected = Vec::new();
    for mut group in groups.into_values() {
        group.sort_by(|&a, &b| chronological(rows, a, b));
        match policy.granularity {
            Granularity::Row => selected.extend(first_row(rows, &group, policy)),
            Granularity::Session => selected.extend(first_session(rows, &group, policy)),
        }
    }
    selected.sort_unstable();
    selected
}

/// Builds candidates from a table's `participant_id`, `diagnosis` and
/// `mbi_status` columns, reading the session marker through `session`.
pub fn candidates_from_table(table: &Table, session: Option<&SessionKey>) -> Result<Vec<Candidate>> {
    let participant_idx = table.require_column(PARTICIPANT_ID)?;
    let diagnosis_idx = table.require_column("diagnosis")?;
    let status_idx = table.column_index(STATUS_COLUMN);
    let session_idx = session
        .map(|key| table.require_column(&key.column))
        .transpose()?;

    Ok((0..table.len())
        .map(|row| Candidate {
            participant: table.cell(row, participant_idx).as_text(),
            time: session
                .zip(session_idx)
                .and_then(|(key, idx)| parse_session(key, table.cell(row, idx))),
            diagnosis: table.cell(row, diagnosis_idx).as_text(),
            status: status_idx.and_then(|idx| table.cell(row, idx).as_i64()),
        })
        .collect())
}

/// Applies [`select`] to a table.
pub fn select_table(
    table: &Table,
    session: Option<&SessionKey>,
    policy: &SelectionPolicy,
) -> Result<Table> {
    let rows = candidates_from_table(table, session)?;
    Ok(table.take_rows(&select(&rows, policy)))
}
