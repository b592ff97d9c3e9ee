//! Phenotype transformation stages.
//!
//! - **session**: session-marker parsing on the date, visit, day and age scales
//! - **matcher**: nearest-session joining within a tolerance
//! - **selection**: one session per participant under a control/case policy
//! - **severity**: MBI domain, total and status scoring
//! - **qc**: scan, session and participant pass-rate roll-up
//! - **adapter**: declarative cohort normalisation
//! - **merge**: QC/phenotype merge and master-table filters
//! - **pool**: cross-cohort relabelling and group assignment

pub mod adapter;
pub mod filter;
pub mod matcher;
pub mod merge;
pub mod pool;
pub mod qc;
pub mod selection;
pub mod session;
pub mod severity;
pub mod text;

pub use adapter::{CompiledAdapter, NormalizedCohort, normalize};
pub use filter::{CompiledFilter, apply_filters, compile_filters};
pub use matcher::{
    EventKey, Match, MatchOptions, asof_join, build_keys, match_events, match_participants,
};
pub use merge::{
    MASTER_COLUMNS, filter_datasets, filter_diagnoses, filter_passed, master_columns,
    merge_qc_pheno,
};
pub use pool::{
    GROUP_COLUMN, assign_groups, drop_severity_columns, finish_group, group_rows,
    prepare_severity_cohort, relabel,
};
pub use qc::{
    PassCount, QcRun, QcSummary, SUMMARY_COLUMNS, runs_from_table, summarize,
    summarize_by_dataset, summary_table,
};
pub use selection::{Candidate, SelectionPolicy, candidates_from_table, select, select_table};
pub use session::{date_to_days, iso_date, parse_session};
pub use severity::{ItemCoding, SeverityInstrument, SeverityScore, score_inventory, sum_present};
pub use text::TextPipeline;
