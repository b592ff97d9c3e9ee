//! Temporal nearest-match ("as-of") joining.
//!
//! Each left event is paired with at most one right event of the same
//! participant, the one whose session marker is closest. A tolerance bounds
//! the accepted distance; beyond it the event stays unmatched.
//!
//! Ties are broken deterministically: on equal distance the chronologically
//! earlier candidate wins, and among candidates sharing a session marker the
//! one appearing first in the right input wins.

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::debug;

use pheno_model::{
    Cell, Direction, JoinKeys, JoinMode, KeyColumns, Result, SessionScale,
    SessionTime, Table, validate_tolerance,
};

use crate::session::parse_session;
use crate::text::TextPipeline;

/// Matching key of one event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventKey {
    pub participant: Option<String>,
    pub time: Option<SessionTime>,
}

impl EventKey {
    pub fn new(participant: impl Into<String>, time: SessionTime) -> Self {
        Self {
            participant: Some(participant.into()),
            time: Some(time),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MatchOptions {
    /// Maximum accepted distance in the units of the scale; unbounded when `None`.
    pub tolerance: Option<f64>,
    pub direction: Direction,
}

/// Outcome for one left event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub left: usize,
    pub right: Option<usize>,
    pub distance: Option<f64>,
}

impl Match {
    fn unmatched(left: usize) -> Self {
        Self {
            left,
            right: None,
            distance: None,
        }
    }
}

fn common_scale<'a>(keys: impl Iterator<Item = &'a EventKey>) -> Result<Option<SessionScale>> {
    let mut first: Option<SessionTime> = None;
    for time in keys.filter_map(|key| key.time) {
        match first {
            None => first = Some(time),
            Some(seen) => seen.ensure_same_scale(&time)?,
        }
    }
    Ok(first.map(|time| time.scale))
}

/// Right events per participant, sorted by (session value, input position).
fn candidates(right: &[EventKey]) -> BTreeMap<&str, Vec<(f64, usize)>> {
    let mut by_participant: BTreeMap<&str, Vec<(f64, usize)>> = BTreeMap::new();
    for (idx, key) in right.iter().enumerate() {
        if let (Some(participant), Some(time)) = (&key.participant, &key.time) {
            by_participant
                .entry(participant.as_str())
                .or_default()
                .push((time.value, idx));
        }
    }
    for list in by_participant.values_mut() {
        list.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    }
    by_participant
}

/// Last candidate at or before `at`, first in input order among equal times.
fn backward(list: &[(f64, usize)], at: f64) -> Option<(f64, usize)> {
    let end = list.partition_point(|(t, _)| *t <= at);
    let time = list.get(end.checked_sub(1)?)?.0;
    let start = list.partition_point(|(t, _)| *t < time);
    list.get(start).copied()
}

/// First candidate at or after `at`.
fn forward(list: &[(f64, usize)], at: f64) -> Option<(f64, usize)> {
    let start = list.partition_point(|(t, _)| *t < at);
    list.get(start).copied()
}

fn nearest(list: &[(f64, usize)], at: f64, direction: Direction) -> Option<(usize, f64)> {
    let before = backward(list, at).map(|(t, idx)| (idx, at - t));
    let after = forward(list, at).map(|(t, idx)| (idx, t - at));
    match direction {
        Direction::Backward => before,
        Direction::Forward => after,
        Direction::Nearest => match (before, after) {
            (Some(b), Some(a)) => Some(if b.1 <= a.1 { b } else { a }),
            (b, a) => b.or(a),
        },
    }
}

/// Pairs every left event with its nearest right event of the same participant.
///
/// The output has exactly one entry per left event, in left order. Events
/// without a participant or session marker are unmatched; right events
/// without one are never candidates.
///
/// # Errors
///
/// Fails when the tolerance is negative or not finite, or when the events
/// mix session scales.
pub fn match_events(
    left: &[EventKey],
    right: &[EventKey],
    options: &MatchOptions,
) -> Result<Vec<Match>> {
    validate_tolerance(options.tolerance)?;
    common_scale(left.iter().chain(right))?;
    let by_participant = candidates(right);

    let matches = left
        .iter()
        .enumerate()
        .map(|(idx, key)| {
            let (Some(participant), Some(time)) = (&key.participant, &key.time) else {
                return Match::unmatched(idx);
            };
            let Some(list) = by_participant.get(participant.as_str()) else {
                return Match::unmatched(idx);
            };
            match nearest(list, time.value, options.direction) {
                Some((right_idx, distance))
                    if options.tolerance.is_none_or(|tolerance| distance <= tolerance) =>
                {
                    Match {
                        left: idx,
                        right: Some(right_idx),
                        distance: Some(distance),
                    }
                }
                _ => Match::unmatched(idx),
            }
        })
        .collect();
    Ok(matches)
}

/// Pairs every left event with the first right row of the same participant.
pub fn match_participants(left: &[EventKey], right: &[EventKey]) -> Vec<Match> {
    let mut first: BTreeMap<&str, usize> = BTreeMap::new();
    for (idx, key) in right.iter().enumerate() {
        if let Some(participant) = &key.participant {
            first.entry(participant.as_str()).or_insert(idx);
        }
    }
    left.iter()
        .enumerate()
        .map(|(idx, key)| Match {
            left: idx,
            right: key
                .participant
                .as_deref()
                .and_then(|participant| first.get(participant).copied()),
            distance: None,
        })
        .collect()
}

/// Reads the matching keys of every row.
pub fn build_keys(table: &Table, columns: &KeyColumns) -> Result<Vec<EventKey>> {
    let participant_idx = table.require_column(&columns.participant)?;
    let pipeline = TextPipeline::compile(&columns.participant_transforms, &table.name)?;
    let session_idx = columns
        .session
        .as_ref()
        .map(|session| table.require_column(&session.column))
        .transpose()?;

    Ok((0..table.len())
        .map(|row| {
            let participant = table
                .cell(row, participant_idx)
                .as_text()
                .and_then(|text| pipeline.apply(&text));
            let time = columns
                .session
                .as_ref()
                .zip(session_idx)
                .and_then(|(key, idx)| parse_session(key, table.cell(row, idx)));
            EventKey { participant, time }
        })
        .collect())
}

fn key_columns(columns: &KeyColumns) -> Vec<&str> {
    let mut names = vec![columns.participant.as_str()];
    if let Some(session) = &columns.session {
        names.push(session.column.as_str());
    }
    names
}

/// Left-joins `right` onto `left` by participant, and by nearest session
/// when `keys.mode` is [`JoinMode::Nearest`].
///
/// Brings across `columns`, or every non-key right column when empty. A
/// right column whose name already exists on the left replaces it, even when
/// the right value is missing. Unmatched rows get missing right cells.
pub fn asof_join(
    left: &Table,
    right: &Table,
    keys: &JoinKeys,
    columns: &[String],
    distance_column: Option<&str>,
) -> Result<Table> {
    let start = Instant::now();
    let left_keys = build_keys(left, &keys.left)?;
    let right_keys = build_keys(right, &keys.right)?;
    let matches = match keys.mode {
        JoinMode::Participant => match_participants(&left_keys, &right_keys),
        JoinMode::Nearest => match_events(
            &left_keys,
            &right_keys,
            &MatchOptions {
                tolerance: keys.tolerance,
                direction: keys.direction,
            },
        )?,
    };

    let brought: Vec<(String, usize)> = if columns.is_empty() {
        let skip = key_columns(&keys.right);
        right
            .columns
            .iter()
            .enumerate()
            .filter(|(_, name)| !skip.contains(&name.as_str()))
            .map(|(idx, name)| (name.clone(), idx))
            .collect()
    } else {
        columns
            .iter()
            .map(|name| -> Result<(String, usize)> {
                Ok((name.clone(), right.require_column(name)?))
            })
            .collect::<Result<Vec<_>>>()?
    };

    let mut out = left.clone();
    for (name, idx) in &brought {
        let cells = matches
            .iter()
            .map(|m| m.right.map_or(Cell::Missing, |row| right.cell(row, *idx).clone()))
            .collect();
        out.set_column(name, cells);
    }
    if let Some(name) = distance_column {
        out.set_column(name, matches.iter().map(|m| Cell::number(m.distance)).collect());
    }

    debug!(
        left = %left.name,
        right = %right.name,
        left_rows = left.len(),
        right_rows = right.len(),
        matched = matches.iter().filter(|m| m.right.is_some()).count(),
        duration_ms = start.elapsed().as_millis(),
        "match complete"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(participant: &str, value: f64) -> EventKey {
        EventKey::new(participant, SessionTime::new(SessionScale::Date, value))
    }

    fn options(tolerance: Option<f64>) -> MatchOptions {
        MatchOptions {
            tolerance,
            direction: Direction::Nearest,
        }
    }

    #[test]
    fn backward_takes_first_of_equal_times() {
        let list = [(1.0, 4), (3.0, 2), (3.0, 5), (7.0, 0)];
        assert_eq!(backward(&list, 5.0), Some((3.0, 2)));
        assert_eq!(backward(&list, 0.5), None);
        assert_eq!(forward(&list, 5.0), Some((7.0, 0)));
        assert_eq!(forward(&list, 7.5), None);
    }

    #[test]
    fn direction_limits_candidates() {
        let left = [day("p", 10.0)];
        let right = [day("p", 8.0), day("p", 11.0)];
        let run = |direction| {
            match_events(
                &left,
                &right,
                &MatchOptions {
                    tolerance: None,
                    direction,
                },
            )
            .expect("match")[0]
                .right
        };
        assert_eq!(run(Direction::Nearest), Some(1));
        assert_eq!(run(Direction::Backward), Some(0));
        assert_eq!(run(Direction::Forward), Some(1));
    }

    #[test]
    fn unbounded_tolerance_takes_nearest() {
        let matches = match_events(&[day("p", 0.0)], &[day("p", 5000.0)], &options(None))
            .expect("match");
        assert_eq!(matches[0].right, Some(0));
        assert_eq!(matches[0].distance, Some(5000.0));
    }

    #[test]
    fn zero_tolerance_allows_same_instant() {
        let matches = match_events(
            &[day("p", 3.0), day("p", 4.0)],
            &[day("p", 3.0)],
            &options(Some(0.0)),
        )
        .expect("match");
        assert_eq!(matches[0].right, Some(0));
        assert_eq!(matches[1].right, None);
    }

    #[test]
    fn participant_mode_takes_first_row() {
        let left = [EventKey {
            participant: Some("a".into()),
            time: None,
        }];
        let right = [
            EventKey {
                participant: Some("b".into()),
                time: None,
            },
            EventKey {
                participant: Some("a".into()),
                time: None,
            },
            EventKey {
                participant: Some("a".into()),
                time: None,
            },
        ];
        assert_eq!(match_participants(&left, &right)[0].right, Some(1));
    }
}
