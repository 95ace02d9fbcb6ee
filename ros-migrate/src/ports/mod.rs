//! Port Mapping Resolver.

pub mod refs;
pub mod resolve;

use std::collections::BTreeMap;

use ros_export_core::tokens::value_of;
use ros_export_core::ConfigDocument;
use serde::Serialize;

use crate::profile::{DeviceProfile, PhysicalClass, PortPurpose};
use crate::warning::Warning;

pub use refs::{collect_referenced_ports, PortMatcher};
pub use resolve::resolve;

/// Where one source port landed on the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortAssignment {
    pub source_port: String,
    pub target_port: String,
    /// The source name was already a valid target port and was kept.
    pub already_in_target_format: bool,
    pub source_class: PhysicalClass,
    pub target_class: PhysicalClass,
    pub purpose: Option<PortPurpose>,
}

/// Injective source -> target mapping plus whatever could not be placed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PortMapping {
    /// In allocation order.
    pub assignments: Vec<PortAssignment>,
    pub unmapped: Vec<String>,
    pub warnings: Vec<Warning>,
}

impl PortMapping {
    pub fn get(&self, source: &str) -> Option<&PortAssignment> {
        self.assignments.iter().find(|a| a.source_port == source)
    }

    pub fn target_of(&self, source: &str) -> Option<&str> {
        self.get(source).map(|a| a.target_port.as_str())
    }

    /// Rewrite every mapped source port in `text` in a single pass.
    pub fn rewrite(&self, matcher: &PortMatcher, text: &str) -> String {
        matcher.rewrite(text, |name| self.target_of(name))
    }
}

/// Guess port purposes from `/interface ethernet` comments.
pub fn infer_purposes(doc: &ConfigDocument, source: &DeviceProfile) -> BTreeMap<String, PortPurpose> {
    let mut out = BTreeMap::new();
    for section in doc.sections_at("/interface ethernet") {
        for line in section.entries() {
            let logical = line.logical();
            let Some(port) = value_of(&logical, "default-name").or_else(|| value_of(&logical, "name"))
            else {
                continue;
            };
            if !source.has_port(&port) {
                continue;
            }
            let Some(comment) = value_of(&logical, "comment") else {
                continue;
            };
            if let Some(purpose) = purpose_from_comment(&comment) {
                out.entry(port).or_insert(purpose);
            }
        }
    }
    out
}

fn purpose_from_comment(comment: &str) -> Option<PortPurpose> {
    let upper = comment.to_ascii_uppercase();
    let words: Vec<&str> = upper
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let has = |w: &str| words.contains(&w);
    if has("OLT") {
        Some(PortPurpose::Olt)
    } else if has("BACKHAUL") || has("BH") {
        Some(PortPurpose::Backhaul)
    } else if has("SWITCH") || has("UPLINK") {
        Some(PortPurpose::SwitchUplink)
    } else {
        None
    }
}
