//! Mild Behavioural Impairment scoring from symptom-inventory items.

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::debug;

use pheno_model::{
    Cell, DomainItems, ItemCodingKind, Result, STATUS_COLUMN, SeverityConfig, SeverityDomain,
    TOTAL_COLUMN, Table,
};

use crate::filter::{apply_filters, compile_filters};

/// How raw item cells become integer scores.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemCoding {
    /// Integral numbers; anything else is missing.
    Numeric,
    /// Categorical codes; unknown codes are missing.
    Categorical(BTreeMap<String, i64>),
}

#[derive(Debug, Clone)]
pub struct SeverityInstrument {
    pub name: String,
    pub coding: ItemCoding,
    pub domains: DomainItems,
}

/// Five domain scores, their total and the binary status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeverityScore {
    pub domains: [Option<i64>; 5],
    pub total: Option<i64>,
    pub status: Option<i64>,
}

impl SeverityScore {
    pub fn domain(&self, domain: SeverityDomain) -> Option<i64> {
        SeverityDomain::ALL
            .iter()
            .position(|d| *d == domain)
            .and_then(|idx| self.domains[idx])
    }
}

/// Sum of the present values; missing only when every value is missing.
pub fn sum_present(values: impl IntoIterator<Item = Option<i64>>) -> Option<i64> {
    values
        .into_iter()
        .flatten()
        .fold(None, |acc, value| Some(acc.unwrap_or(0) + value))
}

impl SeverityInstrument {
    pub fn from_config(config: &SeverityConfig) -> Self {
        let coding = match config.coding {
            ItemCodingKind::Numeric => ItemCoding::Numeric,
            ItemCodingKind::Coded => ItemCoding::Categorical(config.codes.clone()),
        };
        Self {
            name: config.instrument.clone(),
            coding,
            domains: config.domains.clone(),
        }
    }

    pub fn code_item(&self, cell: &Cell) -> Option<i64> {
        match &self.coding {
            ItemCoding::Numeric => cell.as_i64(),
            ItemCoding::Categorical(codes) => {
                let text = cell.as_text()?;
                codes.get(text.trim()).copied()
            }
        }
    }

    pub fn derive(&self, items: &BTreeMap<String, Option<i64>>) -> SeverityScore {
        let domains = SeverityDomain::ALL.map(|domain| {
            sum_present(
                self.domains
                    .get(domain)
                    .iter()
                    .map(|item| items.get(item).copied().flatten()),
            )
        });
        let total = sum_present(domains);
        SeverityScore {
            domains,
            total,
            status: total.map(|total| i64::from(total >= 1)),
        }
    }
}

/// Scores every inventory row, appending the domain, total and status columns.
///
/// Rows failing the configured filters are dropped first; with
/// `require_complete_items`, so are rows with any uncodable item.
pub fn score_inventory(table: &Table, config: &SeverityConfig) -> Result<Table> {
    let start = Instant::now();
    let instrument = SeverityInstrument::from_config(config);
    let filters = compile_filters(&config.filters, &table.name)?;
    let filtered = apply_filters(table, &filters)?;

    let items = instrument.domains.items();
    let indices = items
        .iter()
        .map(|item| filtered.require_column(item))
        .collect::<Result<Vec<_>>>()?;

    let coded: Vec<BTreeMap<String, Option<i64>>> = filtered
        .rows
        .iter()
        .map(|row| {
            items
                .iter()
                .zip(&indices)
                .map(|(item, &idx)| ((*item).to_string(), instrument.code_item(&row[idx])))
                .collect()
        })
        .collect();

    let keep: Vec<usize> = coded
        .iter()
        .enumerate()
        .filter(|(_, values)| {
            !config.require_complete_items || values.values().all(Option::is_some)
        })
        .map(|(idx, _)| idx)
        .collect();
    let mut out = filtered.take_rows(&keep);

    let scores: Vec<SeverityScore> = keep
        .iter()
        .map(|&idx| instrument.derive(&coded[idx]))
        .collect();
    for (position, domain) in SeverityDomain::ALL.iter().enumerate() {
        let cells = scores
            .iter()
            .map(|score| Cell::number(score.domains[position].map(|v| v as f64)))
            .collect();
        out.set_column(domain.as_str(), cells);
    }
    out.set_column(
        TOTAL_COLUMN,
        scores
            .iter()
            .map(|score| Cell::number(score.total.map(|v| v as f64)))
            .collect(),
    );
    out.set_column(
        STATUS_COLUMN,
        scores
            .iter()
            .map(|score| Cell::number(score.status.map(|v| v as f64)))
            .collect(),
    );

    debug!(
        instrument = %instrument.name,
        input_rows = table.len(),
        scored_rows = out.len(),
        with_status = scores.iter().filter(|s| s.status.is_some()).count(),
        duration_ms = start.elapsed().as_millis(),
        "inventory scored"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_present_ignores_missing() {
        assert_eq!(sum_present([Some(1), None, Some(2)]), Some(3));
        assert_eq!(sum_present([None, None]), None);
        assert_eq!(sum_present([Some(0)]), Some(0));
        assert_eq!(sum_present(std::iter::empty()), None);
    }

    #[test]
    fn categorical_codes_are_exact() {
        let instrument = SeverityInstrument {
            name: "NPI-Q".into(),
            coding: ItemCoding::Categorical(BTreeMap::from([
                ("yes".to_string(), 1),
                ("no".to_string(), 0),
            ])),
            domains: DomainItems {
                decreased_motivation: vec!["a".into()],
                emotional_dysregulation: vec!["a".into()],
                impulse_dyscontrol: vec!["a".into()],
                social_inappropriateness: vec!["a".into()],
                abnormal_perception: vec!["a".into()],
            },
        };
        assert_eq!(instrument.code_item(&Cell::text("yes")), Some(1));
        assert_eq!(instrument.code_item(&Cell::text("maybe")), None);
        assert_eq!(instrument.code_item(&Cell::Missing), None);
    }
}
