//! Cohort export reading and cohort configuration loading.

pub mod config;
pub mod error;
pub mod table;

pub use config::{
    CohortRegistry, builtin_cohorts, builtin_pool_config, load_cohort_config, load_pool_config,
    parse_cohort_config, parse_pool_config,
};
pub use error::{IngestError, Result};
pub use table::{ReadOptions, read_table, read_table_from_reader};
