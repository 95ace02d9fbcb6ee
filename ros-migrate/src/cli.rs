use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use ros_migrate::profile::PortPurpose;

#[derive(Parser, Debug)]
#[command(name = "ros-migrate")]
#[command(about = "Translate RouterOS exports between device models and apply compliance standards")]
pub struct Cli {
    /// Engine configuration file (TOML).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Device profiles TOML replacing the built-in registry.
    #[arg(long, global = true)]
    pub profiles_file: Option<PathBuf>,
    /// Classification policy TOML replacing the built-in rules.
    #[arg(long, global = true)]
    pub policy_file: Option<PathBuf>,
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Translate an export onto another device model and firmware.
    Translate(TranslateArgs),
    /// Apply compliance blocks without changing ports or speeds.
    Compliance(ComplianceArgs),
    /// Show the section tree of an export.
    Inspect(InspectArgs),
    /// List device profiles from the registry.
    Profiles(ProfilesArgs),
    /// Show the compliance blocks that would be applied.
    Blocks(BlocksArgs),
}

#[derive(Parser, Debug)]
pub struct TranslateArgs {
    /// Source export file.
    pub input: PathBuf,
    /// Target device model.
    #[arg(long)]
    pub to: String,
    /// Target firmware version (for example 7.16.2).
    #[arg(long)]
    pub firmware: String,
    /// Source device model when the export has no `# model =` line.
    #[arg(long)]
    pub from: Option<String>,
    /// Loopback address substituted into compliance blocks.
    #[arg(long)]
    pub loopback_ip: Option<String>,
    /// Skip compliance stripping and merging.
    #[arg(long)]
    pub no_compliance: bool,
    /// Keep headers of sections left empty by stripping.
    #[arg(long)]
    pub strict_preserve: bool,
    /// Port purpose override, repeatable (for example ether3=olt).
    #[arg(long = "purpose", value_parser = parse_purpose)]
    pub purposes: Vec<(String, PortPurpose)>,
    /// Output file. Prints to stdout when omitted.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Use built-in compliance blocks only.
    #[arg(long)]
    pub offline: bool,
}

#[derive(Parser, Debug)]
pub struct ComplianceArgs {
    /// Export file.
    pub input: PathBuf,
    /// Loopback address substituted into compliance blocks.
    #[arg(long)]
    pub loopback_ip: Option<String>,
    /// Keep headers of sections left empty by stripping.
    #[arg(long)]
    pub strict_preserve: bool,
    /// Output file. Prints to stdout when omitted.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Use built-in compliance blocks only.
    #[arg(long)]
    pub offline: bool,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    pub file: PathBuf,
    /// Tag sections and entries with their classification.
    #[arg(long)]
    pub classify: bool,
    /// Print detected vendor, model, firmware and loopback.
    #[arg(long)]
    pub detect: bool,
}

#[derive(Parser, Debug)]
pub struct ProfilesArgs {
    /// Show a single model.
    #[arg(long)]
    pub model: Option<String>,
}

#[derive(Parser, Debug)]
pub struct BlocksArgs {
    /// Loopback address substituted into the blocks.
    #[arg(long)]
    pub loopback_ip: Option<String>,
    /// Use built-in compliance blocks only.
    #[arg(long)]
    pub offline: bool,
    /// Drop cached scripts before fetching.
    #[arg(long)]
    pub refresh: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

fn parse_purpose(raw: &str) -> Result<(String, PortPurpose), String> {
    let (port, purpose) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected PORT=PURPOSE, got '{raw}'"))?;
    let port = port.trim();
    if port.is_empty() {
        return Err(format!("missing port name in '{raw}'"));
    }
    let purpose = PortPurpose::parse(purpose)
        .ok_or_else(|| format!("unknown purpose '{purpose}' (expected olt, backhaul or switch_uplink)"))?;
    Ok((port.to_string(), purpose))
}
