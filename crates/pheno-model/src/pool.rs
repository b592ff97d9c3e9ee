#![deny(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{PhenoError, Result};

/// Groups of cohorts pooled into the final table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub groups: Vec<CohortGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohortGroup {
    pub name: String,
    pub datasets: Vec<String>,
    /// Score, match and select each cohort's symptom inventory.
    #[serde(default)]
    pub severity: bool,
    /// Cohort diagnosis label to pooled label.
    #[serde(default)]
    pub relabel: BTreeMap<String, String>,
    pub labeling: GroupLabeling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelingKind {
    /// `<DX>+` / `<DX>-` from the severity status.
    SeveritySplit,
    /// The diagnosis itself.
    Diagnosis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupLabeling {
    pub kind: LabelingKind,
    pub diagnoses: Vec<String>,
    #[serde(default = "default_control")]
    pub control: String,
    pub control_label: String,
}

fn default_control() -> String {
    "CON".to_string()
}

impl PoolConfig {
    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeMap::new();
        for group in &self.groups {
            for dataset in &group.datasets {
                if let Some(previous) = seen.insert(dataset.as_str(), group.name.as_str()) {
                    return Err(PhenoError::invalid_config(
                        "pool",
                        format!(
                            "dataset {dataset} appears in groups {previous} and {}",
                            group.name
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}
