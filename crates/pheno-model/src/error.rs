#![deny(unsafe_code)]

use crate::session::SessionScale;

#[derive(Debug, thiserror::Error)]
pub enum PhenoError {
    #[error("table {table} is missing required column {column}")]
    MissingColumn { table: String, column: String },

    #[error("cannot compare session times on the {left} and {right} scales")]
    ScaleMismatch {
        left: SessionScale,
        right: SessionScale,
    },

    #[error("invalid tolerance {value}: must be finite and non-negative")]
    InvalidTolerance { value: f64 },

    #[error("invalid configuration for {cohort}: {message}")]
    InvalidConfig { cohort: String, message: String },

    #[error("missing auxiliary input {name} required by {cohort}")]
    MissingAuxiliary { cohort: String, name: String },
}

impl PhenoError {
    pub fn missing_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn invalid_config(cohort: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            cohort: cohort.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PhenoError>;
