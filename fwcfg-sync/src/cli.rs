use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "fwcfg-sync")]
#[command(about = "Inspect and plan firewall configuration changes against device snapshots")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG wins.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
    /// Session settings file (TOML). Defaults to the embedded settings.
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Show the element tree of a configuration snapshot.
    Show(ShowArgs),
    /// List typed objects of one kind read from a snapshot.
    Objects(ObjectsArgs),
    /// Show what syncing a desired configuration onto a snapshot would change.
    Plan(PlanArgs),
    /// Structural diff of two configuration files.
    Diff(DiffArgs),
}

#[derive(Parser, Debug)]
pub struct ShowArgs {
    pub file: PathBuf,
    /// Show only the element at this address.
    #[arg(long)]
    pub xpath: Option<String>,
    #[arg(long, default_value_t = 3)]
    pub depth: usize,
    /// Print detected device family and version first.
    #[arg(long)]
    pub detect: bool,
}

/// Which part of the configuration objects are read from.
#[derive(Args, Debug, Clone)]
pub struct ScopeArgs {
    /// Object kind, e.g. address, service, tag, security-rule.
    #[arg(long)]
    pub kind: String,
    /// Virtual system on a firewall snapshot; `shared` for the shared scope.
    #[arg(long, conflicts_with = "device_group")]
    pub vsys: Option<String>,
    /// Device group on a Panorama snapshot.
    #[arg(long)]
    pub device_group: Option<String>,
    /// Read rules from the post-rulebase instead of the pre-rulebase (Panorama).
    #[arg(long)]
    pub post: bool,
}

#[derive(Parser, Debug)]
pub struct ObjectsArgs {
    pub file: PathBuf,
    #[command(flatten)]
    pub scope: ScopeArgs,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct PlanArgs {
    /// Snapshot of the device as it is.
    pub current: PathBuf,
    /// Snapshot of the configuration it should have.
    pub desired: PathBuf,
    #[command(flatten)]
    pub scope: ScopeArgs,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Also list unchanged objects and their addresses.
    #[arg(long)]
    pub all: bool,
}

#[derive(Parser, Debug)]
pub struct DiffArgs {
    pub file1: PathBuf,
    pub file2: PathBuf,
    /// Element tags to skip.
    #[arg(long)]
    pub ignore: Vec<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[arg(long)]
    pub summary: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
