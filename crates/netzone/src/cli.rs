//! Clap derive structures for the `netzone` CLI.
//!
//! Command tree and the flags shared by every subcommand.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Entry point ──────────────────────────────────────────────────────

/// netzone -- router mapping administration and telemetry zone provisioning
#[derive(Debug, Parser)]
#[command(
    name = "netzone",
    version,
    about = "Resolve telemetry to router zones and devices",
    long_about = "Administer the router mapping tables and Netify admission policy,\n\
        dry-run identity resolution, and serve the router mapping HTTP API.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Shared flags ─────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config dir)
    #[arg(long, env = "NETZONE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "NETZONE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Color mode
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// More logging: -v info, -vv debug, -vvv trace
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Print errors only
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Answer yes to confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

// ── Formats ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// Indented JSON
    Json,
    /// JSON on one line
    JsonCompact,
    /// YAML
    Yaml,
    /// Keys only, one per line
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Color only when stdout is a terminal
    Auto,
    /// Force ANSI colors
    Always,
    /// Disable colors
    Never,
}

// ── Subcommands ──────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API and ingestion workers
    Serve(ServeArgs),

    /// Manage router mapping tables
    #[command(alias = "map", alias = "m")]
    Mappings(MappingsArgs),

    /// View and change the Netify admission policy
    Policy(PolicyArgs),

    /// Manage the configuration file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Serve ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Listen address (overrides server.listen)
    #[arg(long, short = 'l')]
    pub listen: Option<String>,

    /// Refuse mutations (overrides server.read_only)
    #[arg(long)]
    pub read_only: bool,
}

// ── Mappings ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MappingsArgs {
    #[command(subcommand)]
    pub command: MappingsCommand,
}

#[derive(Debug, Subcommand)]
pub enum MappingsCommand {
    /// List mappings
    #[command(alias = "ls")]
    List {
        /// Only this mapping type
        #[arg(long = "type", short = 't', value_name = "TYPE")]
        kind: Option<String>,
    },

    /// Add or overwrite a mapping
    Add {
        /// router_identifier_mapping, router_mapping or interface_mapping
        #[arg(value_name = "TYPE")]
        kind: String,
        key: String,
        value: String,
    },

    /// Remove a mapping
    #[command(alias = "rm")]
    Remove {
        #[arg(value_name = "TYPE")]
        kind: String,
        key: String,
    },

    /// Dry-run resolution for an IP
    Test {
        ip: String,

        /// Interface name for interface_mapping
        #[arg(long, short = 'i')]
        interface: Option<String>,

        /// Secondary key for router_mapping (defaults to the IP)
        #[arg(long)]
        router_key: Option<String>,
    },
}

// ── Policy ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PolicyArgs {
    #[command(subcommand)]
    pub command: PolicyCommand,
}

#[derive(Debug, Subcommand)]
pub enum PolicyCommand {
    /// Show the current policy
    Show,

    /// Change one or more policy switches
    Set {
        #[arg(long, value_name = "BOOL")]
        allow_unknown_devices: Option<bool>,

        #[arg(long, value_name = "BOOL")]
        auto_create_devices: Option<bool>,

        #[arg(long, value_name = "BOOL")]
        allow_unknown_zones: Option<bool>,

        #[arg(long, value_name = "BOOL")]
        auto_create_zones: Option<bool>,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration
    Show,

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
