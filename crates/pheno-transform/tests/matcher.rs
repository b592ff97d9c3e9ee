//! Tests for nearest-session matching.

use proptest::prelude::*;

use pheno_model::{
    Cell, Direction, JoinKeys, JoinMode, KeyColumns, PhenoError, SessionKey, SessionScale,
    SessionTime, Table,
};
use pheno_transform::{EventKey, MatchOptions, asof_join, match_events};

fn visit(participant: &str, value: f64) -> EventKey {
    EventKey::new(participant, SessionTime::new(SessionScale::Visit, value))
}

fn within(tolerance: f64) -> MatchOptions {
    MatchOptions {
        tolerance: Some(tolerance),
        direction: Direction::Nearest,
    }
}

#[test]
fn distance_equal_to_tolerance_matches() {
    let matches = match_events(&[visit("p", 0.0)], &[visit("p", 6.0)], &within(6.0)).expect("match");
    assert_eq!(matches[0].right, Some(0));
    assert_eq!(matches[0].distance, Some(6.0));
}

#[test]
fn distance_just_over_tolerance_is_unmatched() {
    let matches = match_events(
        &[visit("p", 0.0)],
        &[visit("p", 6.0 + 1e-9)],
        &within(6.0),
    )
    .expect("match");
    assert_eq!(matches[0].right, None);
    assert_eq!(matches[0].distance, None);
}

#[test]
fn equal_distance_prefers_earlier_session() {
    let matches = match_events(
        &[visit("p", 5.0)],
        &[visit("p", 7.0), visit("p", 3.0)],
        &within(10.0),
    )
    .expect("match");
    assert_eq!(matches[0].right, Some(1));
}

#[test]
fn equal_sessions_prefer_first_right_row() {
    let matches = match_events(
        &[visit("p", 5.0)],
        &[visit("q", 5.0), visit("p", 4.0), visit("p", 4.0)],
        &within(10.0),
    )
    .expect("match");
    assert_eq!(matches[0].right, Some(1));
}

#[test]
fn other_participants_never_match() {
    let matches = match_events(
        &[visit("a", 1.0), visit("b", 1.0)],
        &[visit("a", 100.0), visit("c", 1.0)],
        &MatchOptions::default(),
    )
    .expect("match");
    assert_eq!(matches[0].right, Some(0));
    assert_eq!(matches[1].right, None);
}

#[test]
fn events_without_session_are_unmatched() {
    let left = [EventKey {
        participant: Some("p".into()),
        time: None,
    }];
    let matches = match_events(&left, &[visit("p", 1.0)], &MatchOptions::default()).expect("match");
    assert_eq!(matches[0].right, None);
}

#[test]
fn mixed_scales_are_rejected() {
    let date = EventKey::new("p", SessionTime::new(SessionScale::Date, 1.0));
    let err = match_events(&[visit("p", 1.0)], &[date], &MatchOptions::default())
        .expect_err("scale mismatch");
    assert!(matches!(
        err,
        PhenoError::ScaleMismatch {
            left: SessionScale::Visit,
            right: SessionScale::Date
        }
    ));
}

#[test]
fn negative_tolerance_is_rejected() {
    for tolerance in [-1.0, f64::NAN, f64::INFINITY] {
        let err = match_events(&[], &[], &within(tolerance)).expect_err("invalid tolerance");
        assert!(matches!(err, PhenoError::InvalidTolerance { .. }));
    }
}

fn visit_keys() -> JoinKeys {
    JoinKeys {
        mode: JoinMode::Nearest,
        left: KeyColumns {
            session: Some(SessionKey::new("ses", SessionScale::Visit)),
            ..KeyColumns::default()
        },
        right: KeyColumns {
            participant: "pscid".into(),
            session: Some(SessionKey::new("visit", SessionScale::Visit)),
            ..KeyColumns::default()
        },
        tolerance: Some(6.0),
        direction: Direction::Nearest,
    }
}

#[test]
fn join_keeps_left_rows_and_order() {
    let left = Table::from_rows(
        "qc",
        &["participant_id", "ses", "site"],
        &[
            vec![Some("3"), Some("V10"), Some("qc-site")],
            vec![Some("1"), Some("V01"), Some("qc-site")],
            vec![Some("2"), Some("V01"), None],
        ],
    );
    let right = Table::from_rows(
        "pheno",
        &["pscid", "visit", "site", "score"],
        &[
            vec![Some("1"), Some("V03"), Some("IUGM"), Some("4")],
            vec![Some("3"), Some("V30"), Some("CHUS"), Some("9")],
        ],
    );
    let joined = asof_join(&left, &right, &visit_keys(), &[], Some("distance")).expect("join");

    assert_eq!(joined.columns, ["participant_id", "ses", "site", "score", "distance"]);
    assert_eq!(joined.len(), 3);
    assert_eq!(
        joined.column_text("participant_id").expect("ids"),
        vec![Some("3".into()), Some("1".into()), Some("2".into())]
    );
    // The right-hand site replaces the left one, even when unmatched.
    assert_eq!(
        joined.column_text("site").expect("site"),
        vec![None, Some("IUGM".into()), None]
    );
    assert_eq!(
        joined.column_cells("distance").expect("distance"),
        vec![&Cell::Missing, &Cell::Number(2.0), &Cell::Missing]
    );
}

#[test]
fn join_reports_missing_key_column() {
    let left = Table::from_rows("qc", &["participant_id"], &[vec![Some("1")]]);
    let right = Table::from_rows("pheno", &["pscid", "visit"], &[]);
    let err = asof_join(&left, &right, &visit_keys(), &[], None).expect_err("missing ses");
    assert!(matches!(err, PhenoError::MissingColumn { ref column, .. } if column == "ses"));
}

fn events() -> impl Strategy<Value = Vec<(u8, u8)>> {
    prop::collection::vec((0u8..4, 0u8..60), 0..24)
}

fn keys(events: &[(u8, u8)]) -> Vec<EventKey> {
    events
        .iter()
        .map(|(participant, value)| visit(&participant.to_string(), f64::from(*value)))
        .collect()
}

proptest! {
    /// Every left event gets exactly one outcome, and a match is the same
    /// participant, within tolerance, and no farther than any other candidate.
    #[test]
    fn prop_match_is_nearest_within_tolerance(
        left in events(),
        right in events(),
        tolerance in 0u8..20,
    ) {
        let left_keys = keys(&left);
        let right_keys = keys(&right);
        let tolerance = f64::from(tolerance);
        let matches = match_events(&left_keys, &right_keys, &within(tolerance)).expect("match");

        prop_assert_eq!(matches.len(), left.len());
        for (idx, m) in matches.iter().enumerate() {
            prop_assert_eq!(m.left, idx);
            let (participant, value) = left[idx];
            let best = right
                .iter()
                .filter(|(p, _)| *p == participant)
                .map(|(_, v)| (f64::from(*v) - f64::from(value)).abs())
                .fold(None, |best: Option<f64>, d| Some(best.map_or(d, |b| b.min(d))));
            match m.right {
                Some(r) => {
                    prop_assert_eq!(right[r].0, participant);
                    let distance = (f64::from(right[r].1) - f64::from(value)).abs();
                    prop_assert_eq!(m.distance, Some(distance));
                    prop_assert!(distance <= tolerance);
                    prop_assert_eq!(best, Some(distance));
                }
                None => prop_assert!(best.is_none_or(|b| b > tolerance)),
            }
        }
    }
}
