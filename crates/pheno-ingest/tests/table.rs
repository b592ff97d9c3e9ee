//! Integration tests for reading cohort exports from disk.

use std::fs;

use pheno_ingest::{IngestError, ReadOptions, read_table};
use pheno_model::Cell;

#[test]
fn reads_tab_delimited_export() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("participants.tsv");
    fs::write(
        &path,
        "participant_id\tage\tsex\tdiag\nsub-0001\t24\t2\t4\nsub-0002\tn/a\t1\t0\n",
    )
    .expect("write file");

    let table = read_table(&path, &ReadOptions::tsv()).expect("read table");
    assert_eq!(table.name, "participants");
    assert_eq!(table.columns, vec!["participant_id", "age", "sex", "diag"]);
    assert_eq!(table.len(), 2);
    assert_eq!(table.cell(0, 0), &Cell::text("sub-0001"));
    assert!(table.cell(1, 1).is_missing());
}

#[test]
fn utf8_headers_survive() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("diagnostic.tsv");
    fs::write(
        &path,
        "\u{feff}pscid\tdate_de_l_évaluation\n3011\t2016-05-02\n",
    )
    .expect("write file");

    let table = read_table(&path, &ReadOptions::tsv()).expect("read table");
    assert_eq!(table.columns, vec!["pscid", "date_de_l_évaluation"]);
    assert_eq!(
        table.column_text("date_de_l_évaluation").expect("column"),
        vec![Some("2016-05-02".to_string())]
    );
}

#[test]
fn empty_file_is_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("empty.csv");
    fs::write(&path, "\n\n").expect("write file");
    let err = read_table(&path, &ReadOptions::default()).unwrap_err();
    assert!(matches!(err, IngestError::EmptyFile { .. }));
}
