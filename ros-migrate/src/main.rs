use std::fs;

use anyhow::{bail, Context, Result};
use clap::Parser;
use ros_export_core::parse;
use ros_migrate::classify::{classify, ClassificationPolicy};
use ros_migrate::config::EngineConfig;
use ros_migrate::detect::{detect_firmware, detect_loopback, detect_model, detect_vendor};
use ros_migrate::profile::DeviceRegistry;
use ros_migrate::report::{render_blocks, render_profile, render_tree, render_warnings};
use ros_migrate::translate::Translator;

mod cli;
mod logging;
mod path_guard;
mod translate_cmd;

use cli::{BlocksArgs, Cli, Command, InspectArgs, ProfilesArgs};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_cli_logger(cli.verbose);

    let mut config = EngineConfig::load(cli.config.as_deref())?;
    if cli.profiles_file.is_some() {
        config.registry.profiles_file = cli.profiles_file;
    }
    if cli.policy_file.is_some() {
        config.policy.policy_file = cli.policy_file;
    }

    match cli.command {
        Command::Translate(args) => translate_cmd::run_translate(args, config),
        Command::Compliance(args) => translate_cmd::run_compliance(args, config),
        Command::Inspect(args) => run_inspect(args, &config),
        Command::Profiles(args) => run_profiles(args, &config),
        Command::Blocks(args) => run_blocks(args, config),
    }
}

fn run_inspect(args: InspectArgs, config: &EngineConfig) -> Result<()> {
    let raw = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let vendor = detect_vendor(&raw);
    let doc = parse(&raw);

    if args.detect {
        println!(
            "vendor={} model={} firmware={} loopback={}",
            vendor.label(),
            detect_model(&doc).unwrap_or_else(|| "-".to_string()),
            detect_firmware(&doc).unwrap_or_else(|| "-".to_string()),
            detect_loopback(&doc).unwrap_or_else(|| "-".to_string()),
        );
    }

    if args.classify {
        let (policy, _) = ClassificationPolicy::load(config.policy.policy_file.as_deref())?;
        let classified = classify(doc, &policy, vendor);
        print!("{}", render_tree(&classified.document, true));
    } else {
        print!("{}", render_tree(&doc, false));
    }
    Ok(())
}

fn run_profiles(args: ProfilesArgs, config: &EngineConfig) -> Result<()> {
    let (registry, origin) = DeviceRegistry::load(config.registry.profiles_file.as_deref())?;
    let profiles: Vec<_> = match &args.model {
        Some(model) => {
            let Some(profile) = registry
                .profiles()
                .find(|p| p.model.eq_ignore_ascii_case(model))
            else {
                bail!(
                    "unknown model '{model}'; known models: {}",
                    registry.models().collect::<Vec<_>>().join(", ")
                );
            };
            vec![profile]
        }
        None => registry.profiles().collect(),
    };
    println!("profiles source={origin} count={}", profiles.len());
    for profile in profiles {
        println!("{}", render_profile(profile));
    }
    Ok(())
}

fn run_blocks(args: BlocksArgs, mut config: EngineConfig) -> Result<()> {
    config.compliance.offline |= args.offline;
    let translator = Translator::from_config(&config).context("failed to initialise engine")?;
    if args.refresh {
        translator.compliance().refresh();
    }
    let set = translator
        .compliance()
        .fetch_blocks(args.loopback_ip.as_deref())
        .context("failed to load compliance blocks")?;
    println!("{}", render_blocks(&set));
    if !set.warnings().is_empty() {
        eprintln!("{}", render_warnings(set.warnings()));
    }
    Ok(())
}
