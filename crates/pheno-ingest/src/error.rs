#![deny(unsafe_code)]

use std::path::PathBuf;

use pheno_model::PhenoError;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse delimited file {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("file {path} has no header row")]
    EmptyFile { path: PathBuf },

    #[error("unsupported delimiter {delimiter:?}: must be a single ASCII character")]
    Delimiter { delimiter: char },

    #[error("failed to parse TOML config {origin}: {source}")]
    Toml {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown cohort {name} (known: {known})")]
    UnknownCohort { name: String, known: String },

    #[error(transparent)]
    Model(#[from] PhenoError),
}

impl IngestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
