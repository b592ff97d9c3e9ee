//! CLI argument definitions for the phenotype pooling pipeline.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use pheno_cli::pipeline::NamedPath;

#[derive(Parser)]
#[command(
    name = "pheno-pool",
    version,
    about = "Pool cohort phenotypes with imaging QC and MBI severity",
    long_about = "Normalise cohort phenotype exports, merge them with imaging QC,\n\
                  align symptom inventories to scan sessions, and assemble pooled\n\
                  analysis tables."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow participant identifiers in trace logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the available cohort configurations.
    Cohorts(ConfigArgs),

    /// Normalise one cohort export into the canonical phenotype table.
    Normalize(NormalizeArgs),

    /// Merge phenotypes with QC rows and summarise pass rates.
    Qc(QcArgs),

    /// Derive severity, select sessions and assemble the pooled tables.
    Pool(PoolArgs),
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Extra cohort configuration file; replaces a built-in of the same name.
    #[arg(long = "cohort-config", value_name = "FILE")]
    pub cohort_configs: Vec<PathBuf>,
}

#[derive(Args)]
pub struct NormalizeArgs {
    /// Cohort name (see `pheno-pool cohorts`).
    #[arg(value_name = "COHORT")]
    pub cohort: String,

    /// The cohort's main phenotype export.
    #[arg(long = "input", value_name = "FILE")]
    pub input: PathBuf,

    /// Auxiliary export for one of the cohort's joins.
    #[arg(long = "aux", value_name = "NAME=PATH")]
    pub aux: Vec<NamedPath>,

    /// Directory receiving `<cohort>_pheno.tsv` and `<cohort>_pheno.json`.
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Args)]
pub struct QcArgs {
    /// QC table with `participant_id`, `ses`, `dataset` and the QC flag.
    #[arg(long = "qc-file", value_name = "FILE")]
    pub qc_file: PathBuf,

    /// Directory holding the normalised `<cohort>_pheno.tsv` files.
    #[arg(long = "pheno-dir", value_name = "DIR")]
    pub pheno_dir: PathBuf,

    /// Datasets to merge (default: every QC dataset with a cohort configuration).
    #[arg(long = "datasets", value_name = "DATASET", num_args = 1..)]
    pub datasets: Vec<String>,

    /// QC flag column deciding pass or fail.
    #[arg(long = "qc-column", value_name = "COLUMN", default_value = "pass_func_qc")]
    pub qc_column: String,

    /// Keep only these diagnoses in the passed table.
    #[arg(long = "diagnoses", value_name = "LABEL", num_args = 1..)]
    pub diagnoses: Vec<String>,

    /// Directory receiving `qc_summary.tsv` and `passed_qc_master.tsv`.
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Args)]
pub struct PoolArgs {
    /// The passed QC master table written by `pheno-pool qc`.
    #[arg(long = "master", value_name = "FILE")]
    pub master: PathBuf,

    /// Symptom inventory for a cohort.
    #[arg(long = "inventory", value_name = "COHORT=PATH")]
    pub inventories: Vec<NamedPath>,

    /// Pool configuration (default: the built-in AD and SZ groups).
    #[arg(long = "pool-config", value_name = "FILE")]
    pub pool_config: Option<PathBuf>,

    /// Directory receiving `<group>_severity.tsv` and `final_qc_pheno.tsv`.
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
