#![deny(unsafe_code)]

//! Declarative cohort configuration.
//!
//! One [`CohortConfig`] describes how a cohort export maps onto the
//! canonical phenotype schema, how it merges with QC rows, and how its
//! symptom inventory is scored and aligned.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{PhenoError, Result};
use crate::session::SessionScale;
use crate::severity::SeverityConfig;

/// Canonical column names, in output order.
pub const PARTICIPANT_ID: &str = "participant_id";
pub const CANONICAL_COLUMNS: &[&str] = &[
    PARTICIPANT_ID,
    "session",
    "age",
    "sex",
    "site",
    "diagnosis",
    "handedness",
    "education",
    "scanner",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohortConfig {
    pub cohort: CohortHeader,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub joins: Vec<AuxJoin>,
    pub fields: CanonicalFields,
    #[serde(default)]
    pub extra: Vec<ExtraField>,
    #[serde(default)]
    pub qc_merge: JoinKeys,
    #[serde(default)]
    pub severity: Option<SeverityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohortHeader {
    pub name: String,
    /// Value of the QC table's `dataset` column; defaults to `name`.
    #[serde(default)]
    pub dataset: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub missing_tokens: Vec<String>,
    /// Rows between the header and the data (NDA exports carry a second header).
    #[serde(default)]
    pub skip_rows_after_header: usize,
    #[serde(default)]
    pub filters: Vec<RowFilter>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            missing_tokens: Vec::new(),
            skip_rows_after_header: 0,
            filters: Vec::new(),
        }
    }
}

fn default_delimiter() -> char {
    ','
}

/// Keeps rows whose `column` satisfies `op` against `value`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowFilter {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Equals,
    NotEquals,
    /// Regex search anywhere in the value.
    Matches,
    NotMatches,
}

/// A secondary export merged into the main one before field mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuxJoin {
    /// Name under which the caller supplies the file.
    pub source: String,
    #[serde(default)]
    pub delimiter: Option<char>,
    #[serde(default)]
    pub missing_tokens: Vec<String>,
    /// Right-hand columns to bring across; all non-key columns when empty.
    #[serde(default)]
    pub columns: Vec<String>,
    pub on: JoinKeys,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalFields {
    pub participant_id: FieldRule,
    #[serde(default)]
    pub session: Option<FieldRule>,
    #[serde(default)]
    pub age: Option<FieldRule>,
    #[serde(default)]
    pub sex: Option<FieldRule>,
    #[serde(default)]
    pub site: Option<FieldRule>,
    #[serde(default)]
    pub diagnosis: Option<FieldRule>,
    #[serde(default)]
    pub handedness: Option<FieldRule>,
    #[serde(default)]
    pub education: Option<FieldRule>,
    #[serde(default)]
    pub scanner: Option<FieldRule>,
}

impl CanonicalFields {
    /// Configured fields in canonical column order.
    pub fn configured(&self) -> Vec<(&'static str, &FieldRule)> {
        let slots = [
            Some(&self.participant_id),
            self.session.as_ref(),
            self.age.as_ref(),
            self.sex.as_ref(),
            self.site.as_ref(),
            self.diagnosis.as_ref(),
            self.handedness.as_ref(),
            self.education.as_ref(),
            self.scanner.as_ref(),
        ];
        CANONICAL_COLUMNS
            .iter()
            .zip(slots)
            .filter_map(|(name, rule)| rule.map(|rule| (*name, rule)))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtraField {
    pub name: String,
    pub rule: FieldRule,
}

/// How one canonical column is produced.
///
/// Exactly one of `column`, `constant`, `age_from_entry` or `first_code`
/// must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldRule {
    pub column: Option<String>,
    pub constant: Option<String>,
    pub transforms: Vec<TextTransform>,
    /// Raw value to canonical label; unmapped values become missing.
    pub levels: Option<BTreeMap<String, String>>,
    pub numeric: Option<NumericRule>,
    pub age_from_entry: Option<AgeFromEntry>,
    pub first_code: Option<FirstCodeRule>,
    pub original_field_name: Option<String>,
    pub description: Option<String>,
    pub level_descriptions: Option<BTreeMap<String, String>>,
}

pub enum FieldSource<'a> {
    Column(&'a str),
    Constant(&'a str),
    AgeFromEntry(&'a AgeFromEntry),
    FirstCode(&'a FirstCodeRule),
}

impl FieldRule {
    pub fn source(&self) -> Option<FieldSource<'_>> {
        let mut sources = Vec::new();
        if let Some(column) = &self.column {
            sources.push(FieldSource::Column(column));
        }
        if let Some(value) = &self.constant {
            sources.push(FieldSource::Constant(value));
        }
        if let Some(rule) = &self.age_from_entry {
            sources.push(FieldSource::AgeFromEntry(rule));
        }
        if let Some(rule) = &self.first_code {
            sources.push(FieldSource::FirstCode(rule));
        }
        if sources.len() == 1 { sources.pop() } else { None }
    }

    /// Source field name recorded in the metadata dictionary.
    pub fn source_name(&self) -> String {
        if let Some(name) = &self.original_field_name {
            return name.clone();
        }
        match self.source() {
            Some(FieldSource::Column(column)) => column.to_string(),
            Some(FieldSource::Constant(_)) => {
                "None given; single site study named after the dataset".to_string()
            }
            Some(FieldSource::AgeFromEntry(rule)) => {
                format!("{} and {}", rule.entry_column, rule.days_column)
            }
            Some(FieldSource::FirstCode(rule)) => format!("{}.x", rule.column_prefix),
            None => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextTransform {
    StripPrefix(String),
    StripSuffix(String),
    /// Substring replacement.
    Replace { from: String, to: String },
    /// Splits on `separator` and keeps `index`; negative indices count from the end.
    Split { separator: String, index: i64 },
    /// Regex; keeps the first capture group, or the whole match.
    Extract(String),
    TrimLeadingZeros,
    /// Canonical integer text (`"0002"` and `"2.0"` both become `"2"`).
    Integer,
    Lowercase,
    Uppercase,
    /// Any supported date spelling to `YYYY-MM-DD`.
    IsoDate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericRule {
    pub divide_by: Option<f64>,
    pub round: Option<u32>,
}

/// Age at a session from age at entry plus days since entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgeFromEntry {
    pub entry_column: String,
    pub days_column: String,
    #[serde(default = "default_days_pattern")]
    pub days_pattern: String,
    #[serde(default)]
    pub round: Option<u32>,
}

fn default_days_pattern() -> String {
    r"d(\d+)".to_string()
}

/// Label from the first recognised code across a family of columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirstCodeRule {
    pub column_prefix: String,
    #[serde(default = "default_code_length")]
    pub code_length: usize,
    pub codes: BTreeMap<String, String>,
    /// Label when codes exist but none is recognised.
    #[serde(default)]
    pub default_any: Option<String>,
    /// Label when the participant has no codes at all.
    #[serde(default)]
    pub default_none: Option<String>,
    /// Optional column receiving the chosen code.
    #[serde(default)]
    pub code_column: Option<String>,
    /// Optional column receiving the number of codes present.
    #[serde(default)]
    pub count_column: Option<String>,
}

fn default_code_length() -> usize {
    3
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinMode {
    /// First right row per participant (cross-sectional cohorts).
    #[default]
    Participant,
    /// Nearest session within the tolerance.
    Nearest,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Nearest,
    /// Only candidates at or before the left session.
    Backward,
    /// Only candidates at or after the left session.
    Forward,
}

/// Keys of a left/right merge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JoinKeys {
    #[serde(default)]
    pub mode: JoinMode,
    #[serde(default)]
    pub left: KeyColumns,
    #[serde(default)]
    pub right: KeyColumns,
    /// Maximum distance in the units of the session scale; unbounded when absent.
    #[serde(default)]
    pub tolerance: Option<f64>,
    #[serde(default)]
    pub direction: Direction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyColumns {
    #[serde(default = "default_participant_column")]
    pub participant: String,
    #[serde(default)]
    pub participant_transforms: Vec<TextTransform>,
    #[serde(default)]
    pub session: Option<SessionKey>,
}

impl Default for KeyColumns {
    fn default() -> Self {
        Self {
            participant: default_participant_column(),
            participant_transforms: Vec::new(),
            session: None,
        }
    }
}

fn default_participant_column() -> String {
    PARTICIPANT_ID.to_string()
}

/// Where a session time comes from and how to read it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionKey {
    pub column: String,
    pub scale: SessionScale,
    #[serde(default)]
    pub strip_prefix: Option<String>,
    /// Whole-value corrections applied before parsing.
    #[serde(default)]
    pub fixes: Vec<Replacement>,
    #[serde(default)]
    pub divide_by: Option<f64>,
    #[serde(default)]
    pub round: Option<u32>,
}

impl SessionKey {
    pub fn new(column: impl Into<String>, scale: SessionScale) -> Self {
        Self {
            column: column.into(),
            scale,
            strip_prefix: None,
            fixes: Vec::new(),
            divide_by: None,
            round: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub from: String,
    pub to: String,
}

pub fn validate_tolerance(tolerance: Option<f64>) -> Result<()> {
    match tolerance {
        Some(value) if !value.is_finite() || value < 0.0 => {
            Err(PhenoError::InvalidTolerance { value })
        }
        _ => Ok(()),
    }
}

impl JoinKeys {
    pub fn validate(&self, cohort: &str, context: &str) -> Result<()> {
        validate_tolerance(self.tolerance)?;
        if self.mode == JoinMode::Nearest {
            let (Some(left), Some(right)) = (&self.left.session, &self.right.session) else {
                return Err(PhenoError::invalid_config(
                    cohort,
                    format!("{context}: nearest matching needs a session key on both sides"),
                ));
            };
            if left.scale != right.scale {
                return Err(PhenoError::ScaleMismatch {
                    left: left.scale,
                    right: right.scale,
                });
            }
        }
        Ok(())
    }
}

impl CohortConfig {
    pub fn name(&self) -> &str {
        &self.cohort.name
    }

    pub fn dataset(&self) -> &str {
        self.cohort.dataset.as_deref().unwrap_or(&self.cohort.name)
    }

    /// Structural checks that need no data.
    pub fn validate(&self) -> Result<()> {
        let cohort = self.name();
        if cohort.trim().is_empty() {
            return Err(PhenoError::invalid_config("<unnamed>", "cohort name is empty"));
        }
        let mut fields: Vec<(&str, &FieldRule)> = self.fields.configured();
        fields.extend(
            self.extra
                .iter()
                .map(|extra| (extra.name.as_str(), &extra.rule)),
        );
        for (name, rule) in fields {
            if rule.source().is_none() {
                return Err(PhenoError::invalid_config(
                    cohort,
                    format!(
                        "field {name} needs exactly one of column, constant, age_from_entry or first_code"
                    ),
                ));
            }
        }
        for join in &self.joins {
            join.on.validate(cohort, &format!("join {}", join.source))?;
        }
        self.qc_merge.validate(cohort, "qc_merge")?;
        if let Some(severity) = &self.severity {
            severity.validate(cohort)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[cohort]
name = "cobre"

[[source.filters]]
column = "Current Age"
op = "not_equals"
value = "Disenrolled"

[fields.participant_id]
column = "ID"
transforms = ["trim_leading_zeros", { strip_prefix = "sub-" }, { split = { separator = "_", index = -1 } }]

[fields.site]
constant = "cobre"
"#;

    #[test]
    fn parses_minimal_config() {
        let config: CohortConfig = toml::from_str(MINIMAL).expect("parse config");
        assert_eq!(config.dataset(), "cobre");
        assert_eq!(config.source.delimiter, ',');
        assert_eq!(config.source.filters[0].op, FilterOp::NotEquals);
        assert_eq!(
            config.fields.participant_id.transforms,
            vec![
                TextTransform::TrimLeadingZeros,
                TextTransform::StripPrefix("sub-".to_string()),
                TextTransform::Split {
                    separator: "_".to_string(),
                    index: -1
                },
            ]
        );
        assert_eq!(config.qc_merge.mode, JoinMode::Participant);
        config.validate().expect("valid config");
    }

    #[test]
    fn field_with_two_sources_is_rejected() {
        let mut config: CohortConfig = toml::from_str(MINIMAL).expect("parse config");
        config.fields.site = Some(FieldRule {
            column: Some("Site".to_string()),
            constant: Some("cobre".to_string()),
            ..FieldRule::default()
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("field site"));
    }

    #[test]
    fn nearest_join_requires_matching_scales() {
        let keys = JoinKeys {
            mode: JoinMode::Nearest,
            left: KeyColumns {
                session: Some(SessionKey::new("ses", SessionScale::Date)),
                ..KeyColumns::default()
            },
            right: KeyColumns {
                session: Some(SessionKey::new("no_visite", SessionScale::Visit)),
                ..KeyColumns::default()
            },
            tolerance: Some(6.0),
            direction: Direction::Nearest,
        };
        assert!(matches!(
            keys.validate("cimaq", "severity"),
            Err(PhenoError::ScaleMismatch { .. })
        ));
    }

    #[test]
    fn negative_tolerance_is_rejected() {
        assert!(matches!(
            validate_tolerance(Some(-1.0)),
            Err(PhenoError::InvalidTolerance { .. })
        ));
        assert!(validate_tolerance(Some(0.0)).is_ok());
        assert!(validate_tolerance(None).is_ok());
    }
}
