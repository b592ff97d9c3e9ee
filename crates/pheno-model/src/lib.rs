//! Phenotype tables, session times, and cohort configuration types.

pub mod config;
pub mod dictionary;
pub mod error;
pub mod pool;
pub mod session;
pub mod severity;
pub mod table;

pub use config::{
    AgeFromEntry, AuxJoin, CANONICAL_COLUMNS, CanonicalFields, CohortConfig, CohortHeader,
    Direction, ExtraField, FieldRule, FieldSource, FilterOp, FirstCodeRule, JoinKeys, JoinMode,
    KeyColumns, NumericRule, PARTICIPANT_ID, Replacement, RowFilter, SessionKey, SourceConfig,
    TextTransform, validate_tolerance,
};
pub use dictionary::{ColumnDescription, MetadataDictionary, default_description};
pub use error::{PhenoError, Result};
pub use pool::{CohortGroup, GroupLabeling, LabelingKind, PoolConfig};
pub use session::{SessionScale, SessionTime};
pub use severity::{
    DomainItems, Granularity, ItemCodingKind, STATUS_COLUMN, SelectionConfig, SeverityConfig,
    SeverityDomain, TOTAL_COLUMN, severity_columns,
};
pub use table::{Cell, Table};
