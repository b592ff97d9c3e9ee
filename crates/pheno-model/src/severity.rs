#![deny(unsafe_code)]

//! Symptom-inventory scoring configuration.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{JoinKeys, RowFilter};
use crate::error::{PhenoError, Result};

pub const TOTAL_COLUMN: &str = "mbi_total_score";
pub const STATUS_COLUMN: &str = "mbi_status";

/// The five behavioural domains of the severity vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityDomain {
    DecreasedMotivation,
    EmotionalDysregulation,
    ImpulseDyscontrol,
    SocialInappropriateness,
    AbnormalPerception,
}

impl SeverityDomain {
    pub const ALL: [SeverityDomain; 5] = [
        Self::DecreasedMotivation,
        Self::EmotionalDysregulation,
        Self::ImpulseDyscontrol,
        Self::SocialInappropriateness,
        Self::AbnormalPerception,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DecreasedMotivation => "decreased_motivation",
            Self::EmotionalDysregulation => "emotional_dysregulation",
            Self::ImpulseDyscontrol => "impulse_dyscontrol",
            Self::SocialInappropriateness => "social_inappropriateness",
            Self::AbnormalPerception => "abnormal_perception",
        }
    }
}

impl fmt::Display for SeverityDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Columns appended by scoring: the five domains, the total and the status.
pub fn severity_columns() -> Vec<&'static str> {
    SeverityDomain::ALL
        .into_iter()
        .map(SeverityDomain::as_str)
        .chain([TOTAL_COLUMN, STATUS_COLUMN])
        .collect()
}

/// Item columns per domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainItems {
    pub decreased_motivation: Vec<String>,
    pub emotional_dysregulation: Vec<String>,
    pub impulse_dyscontrol: Vec<String>,
    pub social_inappropriateness: Vec<String>,
    pub abnormal_perception: Vec<String>,
}

impl DomainItems {
    pub fn get(&self, domain: SeverityDomain) -> &[String] {
        match domain {
            SeverityDomain::DecreasedMotivation => &self.decreased_motivation,
            SeverityDomain::EmotionalDysregulation => &self.emotional_dysregulation,
            SeverityDomain::ImpulseDyscontrol => &self.impulse_dyscontrol,
            SeverityDomain::SocialInappropriateness => &self.social_inappropriateness,
            SeverityDomain::AbnormalPerception => &self.abnormal_perception,
        }
    }

    /// Every item column once, in domain order.
    pub fn items(&self) -> Vec<&str> {
        let mut items: Vec<&str> = Vec::new();
        for domain in SeverityDomain::ALL {
            for item in self.get(domain) {
                if !items.contains(&item.as_str()) {
                    items.push(item);
                }
            }
        }
        items
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCodingKind {
    /// Items hold integer scores.
    #[default]
    Numeric,
    /// Items hold categorical codes looked up in `codes`.
    Coded,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// One row per participant.
    #[default]
    Row,
    /// Every row of the selected session (keeps multiple runs).
    Session,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default = "default_control_labels")]
    pub control_labels: Vec<String>,
    /// Diagnoses eligible as cases; any non-control label when absent.
    #[serde(default)]
    pub case_labels: Option<Vec<String>>,
    #[serde(default)]
    pub granularity: Granularity,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            control_labels: default_control_labels(),
            case_labels: None,
            granularity: Granularity::Row,
        }
    }
}

fn default_control_labels() -> Vec<String> {
    vec!["CON".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityConfig {
    #[serde(default = "default_instrument")]
    pub instrument: String,
    #[serde(default)]
    pub delimiter: Option<char>,
    #[serde(default)]
    pub missing_tokens: Vec<String>,
    #[serde(default)]
    pub coding: ItemCodingKind,
    #[serde(default)]
    pub codes: BTreeMap<String, i64>,
    pub domains: DomainItems,
    /// Inventory rows kept before scoring.
    #[serde(default)]
    pub filters: Vec<RowFilter>,
    /// Drop inventory rows with any missing item instead of scoring them.
    #[serde(default)]
    pub require_complete_items: bool,
    /// Left is the QC/phenotype table, right the scored inventory.
    #[serde(rename = "match")]
    pub match_on: JoinKeys,
    #[serde(default)]
    pub selection: SelectionConfig,
}

fn default_instrument() -> String {
    "NPI-Q".to_string()
}

impl SeverityConfig {
    pub fn validate(&self, cohort: &str) -> Result<()> {
        for domain in SeverityDomain::ALL {
            let count = self.domains.get(domain).len();
            if !(1..=3).contains(&count) {
                return Err(PhenoError::invalid_config(
                    cohort,
                    format!("severity domain {domain} must list 1 to 3 items, found {count}"),
                ));
            }
        }
        if self.coding == ItemCodingKind::Coded && self.codes.is_empty() {
            return Err(PhenoError::invalid_config(
                cohort,
                "coded severity items need a codes table",
            ));
        }
        self.match_on.validate(cohort, "severity match")
    }
}
