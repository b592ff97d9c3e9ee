//! Tests for the QC pass-rate roll-up.

use pheno_model::{Cell, Table};
use pheno_transform::{PassCount, runs_from_table, summarize_by_dataset, summary_table};

fn qc_table() -> Table {
    Table::from_rows(
        "qc",
        &["participant_id", "ses", "run", "dataset", "pass_func_qc"],
        &[
            // a: one of two runs passes at V01, V02 fails
            vec![Some("a"), Some("V01"), Some("1"), Some("cimaq"), Some("False")],
            vec![Some("a"), Some("V01"), Some("2"), Some("cimaq"), Some("True")],
            vec![Some("a"), Some("V02"), Some("1"), Some("cimaq"), Some("False")],
            // b: no session label, single failing scan
            vec![Some("b"), None, Some("1"), Some("cimaq"), Some("False")],
            vec![Some("x"), Some("1"), None, Some("cobre"), Some("True")],
        ],
    )
}

fn count(total: usize, passed: usize) -> PassCount {
    PassCount { total, passed }
}

#[test]
fn rolls_up_scans_sessions_and_participants() {
    let runs = runs_from_table(&qc_table(), "pass_func_qc").expect("runs");
    let summaries = summarize_by_dataset(&runs);
    assert_eq!(summaries.keys().collect::<Vec<_>>(), ["cimaq", "cobre"]);

    let cimaq = summaries["cimaq"];
    assert_eq!(cimaq.scans, count(4, 1));
    assert_eq!(cimaq.sessions, count(3, 1));
    assert_eq!(cimaq.participants, count(2, 1));
    assert_eq!(cimaq.participants.percent(), 50.0);

    let cobre = summaries["cobre"];
    assert_eq!(cobre.scans, count(1, 1));
    assert_eq!(cobre.participants, count(1, 1));
}

#[test]
fn summary_table_has_one_row_per_dataset() {
    let runs = runs_from_table(&qc_table(), "pass_func_qc").expect("runs");
    let table = summary_table(&summarize_by_dataset(&runs));
    assert_eq!(
        table.columns,
        [
            "dataset",
            "Total Scans",
            "Total Scan Passes",
            "Total Sessions",
            "Total Session Passes",
            "Total Subjects",
            "Total Subject Passes"
        ]
    );
    assert_eq!(table.rows[0][0], Cell::text("cimaq"));
    assert_eq!(
        table.rows[0][1..],
        [4.0, 1.0, 3.0, 1.0, 2.0, 1.0].map(Cell::Number)
    );
}

#[test]
fn unknown_qc_column_is_an_error() {
    let err = runs_from_table(&qc_table(), "pass_anat_qc").expect_err("missing column");
    assert!(err.to_string().contains("pass_anat_qc"));
}
