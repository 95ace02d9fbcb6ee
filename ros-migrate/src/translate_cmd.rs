//! `translate` and `compliance` subcommands.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use ros_migrate::config::EngineConfig;
use ros_migrate::report::{render_port_map, render_summary, render_warnings};
use ros_migrate::translate::{ComplianceRequest, TranslationRequest, Translator};
use ros_migrate::Warning;

use crate::cli::{ComplianceArgs, OutputFormat, TranslateArgs};
use crate::path_guard::ensure_output_not_same;

/// Translate one export and write the result.
///
/// The translated config goes to `--output` or stdout. In text mode the
/// warnings, port map and summary go to stderr so stdout stays a clean
/// export; in JSON mode the full result is printed to stdout instead.
pub fn run_translate(args: TranslateArgs, mut config: EngineConfig) -> Result<()> {
    if let Some(output) = &args.output {
        ensure_output_not_same(output, &args.input)?;
    }
    let source = read_export(&args.input)?;

    config.compliance.offline |= args.offline;
    let translator = Translator::from_config(&config).context("failed to initialise engine")?;

    let mut request = TranslationRequest::new(source, &args.to, &args.firmware);
    request.apply_compliance = !args.no_compliance;
    request.strict_preserve = args.strict_preserve;
    request.loopback_ip = args.loopback_ip;
    request.source_device_model = args.from;
    request.port_purposes = args.purposes.into_iter().collect();

    let result = translator
        .translate(&request)
        .with_context(|| format!("failed to translate {}", args.input.display()))?;

    match args.format {
        OutputFormat::Json => {
            if let Some(output) = &args.output {
                write_output(output, &result.translated_config_text)?;
            }
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => {
            emit(args.output.as_deref(), &result.translated_config_text)?;
            report_warnings(&result.warnings);
            if !result.port_map.is_empty() || !result.unmapped.is_empty() {
                eprintln!("{}", render_port_map(&result.port_map, &result.unmapped));
            }
            eprintln!("{}", render_summary(&result));
        }
    }
    Ok(())
}

/// Apply compliance blocks to one export without touching ports or speeds.
pub fn run_compliance(args: ComplianceArgs, mut config: EngineConfig) -> Result<()> {
    if let Some(output) = &args.output {
        ensure_output_not_same(output, &args.input)?;
    }
    let text = read_export(&args.input)?;

    config.compliance.offline |= args.offline;
    let translator = Translator::from_config(&config).context("failed to initialise engine")?;
    let request = ComplianceRequest {
        config_text: text,
        loopback_ip: args.loopback_ip,
        strict_preserve: args.strict_preserve,
    };
    let result = translator
        .apply_compliance(&request)
        .with_context(|| format!("failed to apply compliance to {}", args.input.display()))?;

    match args.format {
        OutputFormat::Json => {
            if let Some(output) = &args.output {
                write_output(output, &result.config_text)?;
            }
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => {
            emit(args.output.as_deref(), &result.config_text)?;
            report_warnings(&result.warnings);
            let origin = result
                .compliance_origin
                .as_ref()
                .map(|o| o.to_string())
                .unwrap_or_else(|| "none".to_string());
            eprintln!(
                "compliance_summary vendor={} warnings={} compliance={origin}",
                result.vendor.label(),
                result.warnings.len()
            );
        }
    }
    Ok(())
}

fn read_export(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    String::from_utf8(bytes).with_context(|| format!("{} is not valid UTF-8", path.display()))
}

fn emit(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => write_output(path, text),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

fn write_output(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}

fn report_warnings(warnings: &[Warning]) {
    if !warnings.is_empty() {
        eprintln!("{}", render_warnings(warnings));
    }
}
