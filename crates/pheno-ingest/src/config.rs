//! Cohort and pool configuration loading.
//!
//! Built-in configurations are embedded at compile time; callers may
//! register additional TOML files that replace a built-in of the same name.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use pheno_model::{CohortConfig, PoolConfig};

use crate::error::{IngestError, Result};

const BUILTIN_COHORTS: &[(&str, &str)] = &[
    ("adni", include_str!("../cohorts/adni.toml")),
    ("cimaq", include_str!("../cohorts/cimaq.toml")),
    ("cobre", include_str!("../cohorts/cobre.toml")),
    ("compassnd", include_str!("../cohorts/compassnd.toml")),
    ("ds000030", include_str!("../cohorts/ds000030.toml")),
    ("hcpep", include_str!("../cohorts/hcpep.toml")),
    ("oasis3", include_str!("../cohorts/oasis3.toml")),
    ("srpbs", include_str!("../cohorts/srpbs.toml")),
    ("ukbb", include_str!("../cohorts/ukbb.toml")),
];

const BUILTIN_POOL: &str = include_str!("../cohorts/pool.toml");

/// Parses and validates a cohort configuration.
pub fn parse_cohort_config(text: &str, origin: &str) -> Result<CohortConfig> {
    let config: CohortConfig = toml::from_str(text).map_err(|source| IngestError::Toml {
        origin: origin.to_string(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

pub fn load_cohort_config(path: &Path) -> Result<CohortConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| IngestError::io(path, e))?;
    parse_cohort_config(&contents, &path.display().to_string())
}

pub fn builtin_cohorts() -> Result<Vec<CohortConfig>> {
    BUILTIN_COHORTS
        .iter()
        .map(|(name, text)| parse_cohort_config(text, &format!("builtin:{name}")))
        .collect()
}

pub fn parse_pool_config(text: &str, origin: &str) -> Result<PoolConfig> {
    let config: PoolConfig = toml::from_str(text).map_err(|source| IngestError::Toml {
        origin: origin.to_string(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

pub fn load_pool_config(path: &Path) -> Result<PoolConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| IngestError::io(path, e))?;
    parse_pool_config(&contents, &path.display().to_string())
}

pub fn builtin_pool_config() -> Result<PoolConfig> {
    parse_pool_config(BUILTIN_POOL, "builtin:pool")
}

/// Cohort configurations by name.
#[derive(Debug, Clone, Default)]
pub struct CohortRegistry {
    cohorts: BTreeMap<String, CohortConfig>,
}

impl CohortRegistry {
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::default();
        for config in builtin_cohorts()? {
            registry.insert(config);
        }
        Ok(registry)
    }

    /// Built-ins plus the given files, later entries replacing earlier ones.
    pub fn with_files(paths: &[impl AsRef<Path>]) -> Result<Self> {
        let mut registry = Self::builtin()?;
        for path in paths {
            let config = load_cohort_config(path.as_ref())?;
            debug!(
                cohort = %config.name(),
                path = %path.as_ref().display(),
                "registered cohort config"
            );
            registry.insert(config);
        }
        Ok(registry)
    }

    pub fn insert(&mut self, config: CohortConfig) {
        self.cohorts.insert(config.name().to_string(), config);
    }

    pub fn get(&self, name: &str) -> Result<&CohortConfig> {
        self.cohorts
            .get(name)
            .ok_or_else(|| self.unknown(name))
    }

    /// Looks a cohort up by the value of the QC `dataset` column.
    pub fn by_dataset(&self, dataset: &str) -> Result<&CohortConfig> {
        self.cohorts
            .values()
            .find(|config| config.dataset() == dataset)
            .ok_or_else(|| self.unknown(dataset))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CohortConfig> {
        self.cohorts.values()
    }

    pub fn len(&self) -> usize {
        self.cohorts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cohorts.is_empty()
    }

    fn unknown(&self, name: &str) -> IngestError {
        IngestError::UnknownCohort {
            name: name.to_string(),
            known: self
                .cohorts
                .keys()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}
