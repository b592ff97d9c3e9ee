//! Tests for cohort and pool configuration loading.

use std::fs;

use pheno_ingest::{
    CohortRegistry, IngestError, builtin_cohorts, builtin_pool_config, load_cohort_config,
    parse_cohort_config,
};
use pheno_model::{
    FilterOp, Granularity, ItemCodingKind, JoinMode, LabelingKind, PhenoError, SessionScale,
};

#[test]
fn every_builtin_cohort_parses() {
    let cohorts = builtin_cohorts().expect("builtin cohorts");
    let names: Vec<&str> = cohorts.iter().map(|config| config.name()).collect();
    assert_eq!(
        names,
        vec![
            "adni",
            "cimaq",
            "cobre",
            "compassnd",
            "ds000030",
            "hcpep",
            "oasis3",
            "srpbs",
            "ukbb"
        ]
    );
}

#[test]
fn severity_cohorts_carry_their_tolerances() {
    let registry = CohortRegistry::builtin().expect("registry");
    let expected = [
        ("adni", 183.0, SessionScale::Date),
        ("cimaq", 6.0, SessionScale::Visit),
        ("oasis3", 183.0, SessionScale::DaysSinceEntry),
        ("compassnd", 0.5, SessionScale::AgeYears),
    ];
    for (name, tolerance, scale) in expected {
        let config = registry.get(name).expect("cohort");
        let severity = config.severity.as_ref().expect("severity config");
        assert_eq!(severity.match_on.mode, JoinMode::Nearest, "{name}");
        assert_eq!(severity.match_on.tolerance, Some(tolerance), "{name}");
        let right = severity.match_on.right.session.as_ref().expect("right session");
        assert_eq!(right.scale, scale, "{name}");
    }
}

#[test]
fn cimaq_inventory_is_coded() {
    let registry = CohortRegistry::builtin().expect("registry");
    let severity = registry
        .get("cimaq")
        .expect("cimaq")
        .severity
        .clone()
        .expect("severity");
    assert_eq!(severity.coding, ItemCodingKind::Coded);
    assert_eq!(severity.codes.get("2_oui_modéré"), Some(&2));
    assert_eq!(severity.filters[0].op, FilterOp::NotEquals);
    assert_eq!(severity.selection.granularity, Granularity::Row);
}

#[test]
fn dataset_lookup_and_unknown_cohort() {
    let registry = CohortRegistry::builtin().expect("registry");
    assert_eq!(registry.len(), 9);
    assert_eq!(registry.by_dataset("srpbs").expect("srpbs").name(), "srpbs");
    let err = registry.get("abide").unwrap_err();
    match err {
        IngestError::UnknownCohort { name, known } => {
            assert_eq!(name, "abide");
            assert!(known.starts_with("adni, cimaq"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn override_file_replaces_builtin() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("cobre.toml");
    fs::write(
        &path,
        r#"
[cohort]
name = "cobre"
dataset = "cobre_v2"

[fields.participant_id]
column = "ID"

[fields.site]
constant = "cobre"
"#,
    )
    .expect("write config");
    let registry = CohortRegistry::with_files(&[&path]).expect("registry");
    let cobre = registry.get("cobre").expect("cobre");
    assert_eq!(cobre.dataset(), "cobre_v2");
    assert_eq!(registry.len(), 9);
}

#[test]
fn invalid_config_is_reported_with_origin() {
    let err = parse_cohort_config("[cohort]\nname = 3\n", "bad.toml").unwrap_err();
    assert!(err.to_string().starts_with("failed to parse TOML config bad.toml"));

    let err = parse_cohort_config(
        r#"
[cohort]
name = "broken"

[fields.participant_id]
column = "id"

[qc_merge]
mode = "nearest"
tolerance = -1.0
left = { session = { column = "ses", scale = "date" } }
right = { session = { column = "session", scale = "date" } }
"#,
        "broken.toml",
    )
    .unwrap_err();
    assert!(matches!(
        err,
        IngestError::Model(PhenoError::InvalidTolerance { .. })
    ));
}

#[test]
fn missing_config_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = load_cohort_config(&dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, IngestError::Io { .. }));
}

#[test]
fn builtin_pool_groups() {
    let pool = builtin_pool_config().expect("pool config");
    assert_eq!(pool.groups.len(), 2);
    let ad = &pool.groups[0];
    assert!(ad.severity);
    assert_eq!(ad.labeling.kind, LabelingKind::SeveritySplit);
    assert_eq!(ad.relabel.get("EMCI").map(String::as_str), Some("MCI"));
    let sz = &pool.groups[1];
    assert!(!sz.severity);
    assert_eq!(sz.labeling.control_label, "CON-SCHZ");
}
