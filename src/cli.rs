//! CLI argument parsing for the package repair workflow.
//!
//! The CLI is intentionally thin: it routes to the inspection and repair
//! engine without embedding policy, so the same core logic can be reused
//! elsewhere.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "tpfix",
    version,
    about = "Inspect and repair XBRL Taxonomy Packages",
    after_help = "Commands:\n  check --package <ZIP>                    Inspect a package and report conformance\n  fix --provider <CODE> --package <ZIP>    Repair a package with the provider's policy\n\nExamples:\n  tpfix check --package data/input/CMF-CL-CI-2020-01-02.zip\n  tpfix check --package data/input/CMF-CL-CI-2020-01-02.zip --json\n  tpfix fix --provider CMFCLCI --package data/input/CMF-CL-CI-2020-01-02.zip\n  tpfix fix --provider EDINET --package ALL_20221101.zip --out out/ALL_20221101.zip",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Check(CheckArgs),
    Fix(FixArgs),
}

/// Inspect a package without touching it.
#[derive(Parser, Debug)]
#[command(about = "Inspect a taxonomy package and report its conformance checks")]
pub struct CheckArgs {
    /// Path to the package archive
    #[arg(long, value_name = "ZIP")]
    pub package: PathBuf,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

/// Repair a package with a provider-specific policy.
#[derive(Parser, Debug)]
#[command(about = "Repair a taxonomy package with the provider's fixing policy")]
pub struct FixArgs {
    /// Provider code (EBA, EDINET, CMFCLCI, or CIPC)
    #[arg(long, value_name = "CODE")]
    pub provider: String,

    /// Path to the package archive
    #[arg(long, value_name = "ZIP")]
    pub package: PathBuf,

    /// Output archive path (default: input path with its "input" segment
    /// replaced by "output")
    #[arg(long, value_name = "ZIP")]
    pub out: Option<PathBuf>,
}
