//! Library components of the `pheno-pool` command-line tool.

pub mod logging;
pub mod pipeline;
