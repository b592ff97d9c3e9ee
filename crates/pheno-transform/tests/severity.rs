//! Tests for MBI scoring of symptom inventories.

use pheno_ingest::CohortRegistry;
use pheno_model::{Cell, SeverityConfig, SeverityDomain, Table};
use pheno_transform::score_inventory;

/// The OASIS-3 inventory: one or more items per domain, integer scores.
fn oasis_inventory() -> SeverityConfig {
    CohortRegistry::builtin()
        .expect("registry")
        .get("oasis3")
        .expect("oasis3")
        .severity
        .clone()
        .expect("severity")
}

const ITEMS: [&str; 10] = ["APA", "DEPD", "ANX", "ELAT", "AGIT", "IRR", "MOT", "DISN", "DEL", "HALL"];

fn inventory(rows: &[[Option<&str>; 10]]) -> Table {
    let mut columns = vec!["OASISID", "days_to_visit"];
    columns.extend(ITEMS);
    let rows: Vec<Vec<Option<&str>>> = rows
        .iter()
        .enumerate()
        .map(|(idx, items)| {
            let mut row = vec![Some("OAS30001"), Some(["0", "100", "200", "300", "400"][idx % 5])];
            row.extend(items.iter().copied());
            row
        })
        .collect();
    Table::from_rows("npiq", &columns, &rows)
}

fn number(value: Option<f64>) -> Cell {
    Cell::number(value)
}

#[test]
fn scores_follow_domain_sums() {
    let table = inventory(&[
        [None; 10],
        [Some("0"); 10],
        // apathy only
        [Some("1"), Some("0"), Some("0"), Some("0"), Some("0"), Some("0"), Some("0"), Some("0"), Some("0"), Some("0")],
        // depression present, anxiety and elation missing
        [Some("0"), Some("1"), None, None, None, None, None, None, None, None],
    ]);
    let scored = score_inventory(&table, &oasis_inventory()).expect("score");
    assert_eq!(scored.len(), 4);

    let total = scored.column_cells("mbi_total_score").expect("total");
    let status = scored.column_cells("mbi_status").expect("status");
    assert_eq!(
        total,
        vec![&Cell::Missing, &number(Some(0.0)), &number(Some(1.0)), &number(Some(1.0))]
    );
    assert_eq!(
        status,
        vec![&Cell::Missing, &number(Some(0.0)), &number(Some(1.0)), &number(Some(1.0))]
    );

    let emotional = scored
        .column_cells(SeverityDomain::EmotionalDysregulation.as_str())
        .expect("domain");
    assert_eq!(emotional[3], &Cell::Number(1.0));
    let impulse = scored
        .column_cells(SeverityDomain::ImpulseDyscontrol.as_str())
        .expect("domain");
    assert_eq!(impulse[3], &Cell::Missing);
}

#[test]
fn unreadable_items_count_as_missing() {
    let mut items = [Some("0"); 10];
    items[0] = Some("not assessed");
    items[8] = Some("3");
    let scored = score_inventory(&inventory(&[items]), &oasis_inventory()).expect("score");
    assert_eq!(
        scored.column_cells("decreased_motivation").expect("domain"),
        vec![&Cell::Missing]
    );
    assert_eq!(
        scored.column_cells("mbi_total_score").expect("total"),
        vec![&Cell::Number(3.0)]
    );
}

#[test]
fn missing_item_column_is_an_error() {
    let table = Table::from_rows("npiq", &["OASISID", "days_to_visit", "APA"], &[]);
    let err = score_inventory(&table, &oasis_inventory()).expect_err("missing items");
    assert!(err.to_string().contains("DEPD"), "{err}");
}

#[test]
fn coded_inventory_filters_and_requires_complete_items() {
    let registry = CohortRegistry::builtin().expect("registry");
    let config = registry
        .get("compassnd")
        .expect("compassnd")
        .severity
        .clone()
        .expect("severity");
    assert!(config.require_complete_items);

    let items = config.domains.items();
    let mut columns: Vec<&str> = vec!["Identifiers", "age_months"];
    columns.extend(items.iter().copied());
    let yes = config
        .codes
        .iter()
        .find(|(_, score)| **score == 1)
        .map(|(code, _)| code.as_str())
        .expect("a code scoring 1");
    let no = config
        .codes
        .iter()
        .find(|(_, score)| **score == 0)
        .map(|(code, _)| code.as_str())
        .expect("a code scoring 0");

    let complete: Vec<Option<&str>> = [Some("P1"), Some("840")]
        .into_iter()
        .chain(items.iter().enumerate().map(|(idx, _)| Some(if idx == 0 { yes } else { no })))
        .collect();
    let mut partial = complete.clone();
    partial[2] = None;
    let table = Table::from_rows("npiq", &columns, &[complete, partial]);

    let scored = score_inventory(&table, &config).expect("score");
    assert_eq!(scored.len(), 1);
    assert_eq!(
        scored.column_cells("mbi_status").expect("status"),
        vec![&Cell::Number(1.0)]
    );
}
