//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use tend::util::shell::ColorChoice;
use tend::{DependencyKind, TargetKind};

/// tend - keeps Cargo manifests in agreement with the tree they describe
#[derive(Parser)]
#[command(name = "tend")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to Cargo.toml
    #[arg(long, global = true, value_name = "PATH")]
    pub manifest_path: Option<PathBuf>,

    /// Workspace member to operate on, by name or path
    #[arg(short = 'p', long, global = true, value_name = "MEMBER")]
    pub member: Option<String>,

    /// Use verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Do not print status messages
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Coloring of status output: auto, always, never
    #[arg(long, global = true, default_value = "auto", value_name = "WHEN")]
    pub color: ColorChoice,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = MessageFormat::Human)]
    pub message_format: MessageFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List workspace members
    Members,

    /// List the buildable units of a member
    Units(UnitsArgs),

    /// List declared dependencies
    Deps(DepsArgs),

    /// List feature flags, including implicit ones from optional dependencies
    Features,

    /// Report unregistered files, undeclared flags and misplaced units
    Check(CheckArgs),

    /// Declare a unit in Cargo.toml
    Register(RegisterArgs),

    /// Remove a unit declaration from Cargo.toml
    Unregister(UnregisterArgs),

    /// Rewrite a dependency's version requirement in place
    Pin(PinArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct UnitsArgs {
    /// Only list units of this kind (lib, bin, example, test, bench)
    #[arg(long)]
    pub kind: Option<TargetKind>,
}

#[derive(Args)]
pub struct DepsArgs {
    /// Only list one table (workspace, normal, dev, build)
    #[arg(long)]
    pub kind: Option<DependencyKind>,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Check every workspace member
    #[arg(long)]
    pub workspace: bool,

    /// Register unregistered files and declare undeclared flags
    #[arg(long)]
    pub fix: bool,

    /// With --fix, show what would change without writing
    #[arg(long, requires = "fix")]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct RegisterArgs {
    /// Unit kind (lib, bin, example, test, bench)
    pub kind: TargetKind,

    /// Unit name
    pub name: String,

    /// Source path relative to the member root
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Features required to build the unit
    #[arg(long = "required-features", value_delimiter = ',')]
    pub required_features: Vec<String>,

    /// Show the edit without writing
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct UnregisterArgs {
    /// Unit kind (lib, bin, example, test, bench)
    pub kind: TargetKind,

    /// Unit name
    pub name: String,

    /// Show the edit without writing
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct PinArgs {
    /// Dependency name
    pub name: String,

    /// New version requirement; keeps the current operator when it has none
    pub version: String,

    /// Dependency table (workspace, normal, dev, build)
    #[arg(long, default_value = "normal")]
    pub kind: DependencyKind,

    /// Show the edit without writing
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
