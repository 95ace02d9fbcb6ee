use colored::Colorize;
use ros_export_core::{Classification, ConfigDocument};

use crate::compliance::ComplianceBlockSet;
use crate::ports::PortAssignment;
use crate::profile::DeviceProfile;
use crate::translate::TranslationResult;
use crate::warning::Warning;

/// Render warnings for terminal output, one per line.
pub fn render_warnings(warnings: &[Warning]) -> String {
    let mut out = Vec::new();
    for warning in warnings {
        let line = format!("WARN {}: {warning}", warning.code());
        let colored = match warning {
            Warning::PortExhaustion { .. } | Warning::ComplianceFallback { .. } => {
                line.red().to_string()
            }
            Warning::ExemptPassthrough { .. } => line.cyan().to_string(),
            _ => line.yellow().to_string(),
        };
        out.push(colored);
    }
    out.join("\n")
}

/// Render the port map with downgrades highlighted.
pub fn render_port_map(assignments: &[PortAssignment], unmapped: &[String]) -> String {
    let width = assignments
        .iter()
        .map(|a| a.source_port.len())
        .chain(unmapped.iter().map(String::len))
        .max()
        .unwrap_or(0);
    let mut out = vec!["port_map".to_string()];
    for a in assignments {
        let mut line = format!(
            "- {:width$} -> {} ({} -> {})",
            a.source_port, a.target_port, a.source_class, a.target_class
        );
        if let Some(purpose) = a.purpose {
            line.push_str(&format!(" purpose={purpose}"));
        }
        if a.already_in_target_format {
            line.push_str(" kept");
        }
        if a.target_class < a.source_class {
            out.push(line.yellow().to_string());
        } else {
            out.push(line);
        }
    }
    for port in unmapped {
        out.push(format!("- {port:width$} -> (none)").red().to_string());
    }
    out.join("\n")
}

/// One-line run summary.
pub fn render_summary(result: &TranslationResult) -> String {
    let era = result
        .firmware_era
        .map(|e| e.to_string())
        .unwrap_or_else(|| "-".to_string());
    let origin = result
        .compliance_origin
        .as_ref()
        .map(|o| o.to_string())
        .unwrap_or_else(|| "none".to_string());
    format!(
        "translate_summary vendor={} source={} target={} era={} mapped={} unmapped={} warnings={} compliance={}",
        result.vendor.label(),
        result.source_model.as_deref().unwrap_or("-"),
        result.target_model,
        era,
        result.port_map.len(),
        result.unmapped.len(),
        result.warnings.len(),
        origin
    )
    .cyan()
    .to_string()
}

/// Render the section tree, optionally tagging each section and entry.
pub fn render_tree(doc: &ConfigDocument, with_classes: bool) -> String {
    let mut out = String::new();
    for line in &doc.preamble {
        out.push_str(&format!("{}\n", line.dimmed()));
    }
    for section in &doc.sections {
        let header = if section.header.is_empty() {
            "(no header)".to_string()
        } else {
            section.header.clone()
        };
        let entries = section.entries().count();
        if with_classes {
            out.push_str(&format!(
                "{} [{}] entries={entries}\n",
                header.bold(),
                paint(section.classification)
            ));
            for line in section.entries() {
                out.push_str(&format!(
                    "  {} {}\n",
                    paint(line.classification),
                    line.logical()
                ));
            }
        } else {
            out.push_str(&format!("{} entries={entries}\n", header.bold()));
        }
    }
    out
}

fn paint(class: Classification) -> String {
    let label = class.to_string();
    match class {
        Classification::Managed => label.red().to_string(),
        Classification::SiteSpecific => label.green().to_string(),
        Classification::Neutral => label.dimmed().to_string(),
    }
}

/// Registry listing; pools in allocation order.
pub fn render_profile(profile: &DeviceProfile) -> String {
    let mut out = vec![format!(
        "{} ports={} management={}",
        profile.model.bold(),
        profile.total_ports,
        profile.management.name
    )];
    for (pool, ports) in &profile.pools {
        let names: Vec<&str> = ports.iter().map(|p| p.name.as_str()).collect();
        out.push(format!("  {pool}: {}", names.join(" ")));
    }
    for (purpose, range) in &profile.purpose_ranges {
        out.push(format!("  reserved {purpose}: {}", range.join(" ")));
    }
    out.join("\n")
}

/// Compliance blocks in canonical order with their origin.
pub fn render_blocks(set: &ComplianceBlockSet) -> String {
    let mut out = vec![format!("compliance origin={}", set.origin()).cyan().to_string()];
    for (key, text) in set.iter() {
        out.push(format!("[{}]", key).bold().to_string());
        out.push(text.to_string());
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{render_blocks, render_port_map, render_tree, render_warnings};
    use crate::compliance::ComplianceBlockSet;
    use crate::ports::PortAssignment;
    use crate::profile::PhysicalClass;
    use crate::warning::Warning;

    #[test]
    fn warnings_carry_their_code() {
        colored::control::set_override(false);
        let out = render_warnings(&[Warning::PortDowngraded {
            source: "sfp-sfpplus1".to_string(),
            target: "sfp1".to_string(),
        }]);
        assert!(out.starts_with("WARN port_downgraded: port sfp-sfpplus1"));
    }

    #[test]
    fn port_map_lists_unmapped_last() {
        colored::control::set_override(false);
        let out = render_port_map(
            &[PortAssignment {
                source_port: "ether2".to_string(),
                target_port: "sfp28-5".to_string(),
                already_in_target_format: false,
                source_class: PhysicalClass::Copper,
                target_class: PhysicalClass::Optical25g,
                purpose: None,
            }],
            &["ether10".to_string()],
        );
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[1], "- ether2  -> sfp28-5 (copper -> optical_25g)");
        assert_eq!(lines[2], "- ether10 -> (none)");
    }

    #[test]
    fn tree_shows_headers() {
        colored::control::set_override(false);
        let doc = ros_export_core::parse("/ip dns\nset servers=1.1.1.1\n");
        let out = render_tree(&doc, false);
        assert!(out.contains("/ip dns entries=1"));
    }

    #[test]
    fn blocks_render_in_order() {
        colored::control::set_override(false);
        let out = render_blocks(&ComplianceBlockSet::fallback());
        let snmp = out.find("[snmp]").expect("snmp");
        let ntp = out.find("[ntp]").expect("ntp");
        assert!(out.starts_with("compliance origin=fallback:"));
        assert!(ntp < snmp);
    }
}
