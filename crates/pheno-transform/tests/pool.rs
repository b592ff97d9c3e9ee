//! End-to-end tests for merging, severity alignment and pool grouping.

use pheno_ingest::{CohortRegistry, builtin_pool_config};
use pheno_model::{Cell, CohortGroup, Table};
use pheno_transform::{
    drop_severity_columns, filter_passed, finish_group, group_rows, merge_qc_pheno,
    prepare_severity_cohort,
};

fn group(name: &str) -> CohortGroup {
    builtin_pool_config()
        .expect("pool")
        .groups
        .into_iter()
        .find(|group| group.name == name)
        .expect("group")
}

const ITEMS: [&str; 10] = ["APA", "DEPD", "ANX", "ELAT", "AGIT", "IRR", "MOT", "DISN", "DEL", "HALL"];

/// One inventory row per (participant, day, apathy score); other items score 0.
fn oasis_inventory(rows: &[(&str, &str, &str)]) -> Table {
    let mut columns = vec!["OASISID", "days_to_visit"];
    columns.extend(ITEMS);
    let rows: Vec<Vec<Option<&str>>> = rows
        .iter()
        .map(|(participant, day, apathy)| {
            let mut row = vec![Some(*participant), Some(*day), Some(*apathy)];
            row.extend([Some("0"); 9]);
            row
        })
        .collect();
    Table::from_rows("oasis3_npiq", &columns, &rows)
}

fn qc_rows() -> Table {
    Table::from_rows(
        "qc",
        &["identifier", "participant_id", "ses", "run", "dataset", "site", "pass_func_qc"],
        &[
            vec![Some("s1"), Some("OAS30001"), Some("d0000"), Some("1"), Some("oasis3"), None, Some("True")],
            vec![Some("s2"), Some("OAS30001"), Some("d0400"), Some("1"), Some("oasis3"), None, Some("True")],
            vec![Some("s3"), Some("OAS30002"), Some("d0100"), Some("1"), Some("oasis3"), None, Some("True")],
            vec![Some("s4"), Some("OAS30003"), Some("d0100"), Some("1"), Some("oasis3"), None, Some("True")],
            vec![Some("s5"), Some("OAS30003"), Some("d0900"), Some("1"), Some("oasis3"), None, Some("False")],
            vec![Some("s6"), Some("1001"), Some("1"), Some("1"), Some("cobre"), None, Some("True")],
        ],
    )
}

fn oasis_pheno() -> Table {
    Table::from_rows(
        "oasis3",
        &["participant_id", "session", "age", "sex", "site", "diagnosis"],
        &[
            vec![Some("OAS30001"), Some("d0000"), Some("70"), Some("female"), Some("oasis3"), Some("CON")],
            vec![Some("OAS30001"), Some("d0400"), Some("71.1"), Some("female"), Some("oasis3"), Some("CON")],
            vec![Some("OAS30002"), Some("d0100"), Some("75.3"), Some("male"), Some("oasis3"), Some("MCI")],
            vec![Some("OAS30003"), Some("d0100"), Some("80.3"), Some("male"), Some("oasis3"), Some("ADD")],
            vec![Some("OAS30003"), Some("d0900"), Some("82.5"), Some("male"), Some("oasis3"), Some("ADD")],
        ],
    )
}

#[test]
fn three_participants_end_to_end() {
    let registry = CohortRegistry::builtin().expect("registry");
    let oasis = registry.get("oasis3").expect("oasis3");

    let master = merge_qc_pheno(&qc_rows(), &oasis_pheno(), oasis, "pass_func_qc").expect("merge");
    assert_eq!(master.len(), 5);
    assert_eq!(
        master.columns,
        [
            "identifier",
            "participant_id",
            "ses",
            "run",
            "age",
            "sex",
            "site",
            "diagnosis",
            "dataset",
            "pass_func_qc"
        ]
    );

    let passed = filter_passed(&master, "pass_func_qc").expect("passed");
    assert_eq!(passed.len(), 4);

    // OAS30002 is matched 10 days off; OAS30003's only inventory is 400 days off.
    let inventory = oasis_inventory(&[
        ("OAS30002", "90", "1"),
        ("OAS30003", "500", "2"),
        ("OAS30009", "100", "1"),
    ]);
    let ad = group("ad");
    let rows = group_rows(&passed, &ad).expect("group rows");
    let selected = prepare_severity_cohort(&rows, oasis, &inventory).expect("severity");
    assert_eq!(
        selected.column_text("identifier").expect("ids"),
        vec![Some("s1".to_string()), Some("s3".to_string())]
    );

    let pooled = finish_group(&selected, &ad).expect("grouped");
    assert_eq!(
        pooled.column_cells("group").expect("groups"),
        vec![&Cell::text("CON-ADD"), &Cell::text("MCI+")]
    );
    assert_eq!(
        pooled.column_cells("mbi_total_score").expect("total"),
        vec![&Cell::Missing, &Cell::Number(1.0)]
    );

    let trimmed = drop_severity_columns(&pooled);
    assert!(!trimmed.has_column("mbi_status"));
    assert!(trimmed.has_column("group"));
}

#[test]
fn merge_requires_the_qc_flag() {
    let registry = CohortRegistry::builtin().expect("registry");
    let oasis = registry.get("oasis3").expect("oasis3");
    let err = merge_qc_pheno(&qc_rows(), &oasis_pheno(), oasis, "pass_anat_qc").expect_err("no flag");
    assert!(err.to_string().contains("pass_anat_qc"));
}

#[test]
fn diagnosis_groups_relabel_before_labelling() {
    let master = Table::from_rows(
        "master",
        &["participant_id", "dataset", "diagnosis"],
        &[
            vec![Some("1"), Some("cobre"), Some("SZ")],
            vec![Some("2"), Some("cobre"), Some("CON")],
            vec![Some("3"), Some("srpbs"), Some("BIP")],
            vec![Some("4"), Some("adni"), Some("CON")],
        ],
    );
    let sz = group("sz");
    let rows = group_rows(&master, &sz).expect("rows");
    let pooled = finish_group(&rows, &sz).expect("grouped");
    assert_eq!(
        pooled.column_text("group").expect("groups"),
        vec![Some("SCHZ".into()), Some("CON-SCHZ".into()), None]
    );
    assert_eq!(
        pooled.column_text("diagnosis").expect("dx"),
        vec![Some("SCHZ".into()), Some("CON".into()), Some("BIP".into())]
    );
}
