use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Teemu Hynninen",
    version,
    about = "coremirror CLI - compile interaction tables and trace how a client keeps a stateful computation engine in sync.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the known interaction and bond-order kinds, or describe one of them.
    Kinds(KindsArgs),
    /// Compile the interactions of a scenario into the flat tables sent to the engine.
    Compile(CompileArgs),
    /// Replay the requests of a scenario against an in-memory engine and report every engine call.
    Trace(TraceArgs),
}

/// Arguments for the `kinds` subcommand.
#[derive(Args, Debug)]
pub struct KindsArgs {
    /// Name of a kind to describe in detail.
    #[arg(value_name = "NAME")]
    pub name: Option<String>,

    /// TOML file with additional kinds, merged over the built-in ones.
    #[arg(short, long, value_name = "PATH")]
    pub registry: Option<PathBuf>,
}

/// Arguments for the `compile` subcommand.
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Path to the scenario file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,
}

/// Arguments for the `trace` subcommand.
#[derive(Args, Debug)]
pub struct TraceArgs {
    /// Path to the scenario file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    // --- Synchronization Overrides ---
    /// Re-initialize the engine from scratch on every synchronization round.
    #[arg(long)]
    pub force_full_init: bool,

    /// Override the factor applied to cutoffs to obtain neighbor radii.
    #[arg(long, value_name = "FLOAT")]
    pub cutoff_scale: Option<f64>,

    /// Override the neighbor-list skin.
    #[arg(long, value_name = "FLOAT")]
    pub skin: Option<f64>,
}
