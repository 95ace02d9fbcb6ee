//! Section Classifier: tags every line as managed, site specific or neutral.

pub mod policy;

use ros_export_core::{Classification, ConfigDocument, ConfigSection};
use tracing::debug;

use crate::detect::Vendor;
pub use policy::{ClassificationPolicy, LineRule, PolicyLoadError};

/// Tag for a command written inline on a section header
/// (`/snmp set enabled=yes`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderTag {
    pub classification: Classification,
    pub block: Option<String>,
}

/// A parsed document with ownership tags applied.
#[derive(Debug, Clone)]
pub struct ClassifiedDocument {
    pub document: ConfigDocument,
    pub vendor: Vendor,
    pub exempt: bool,
    /// Compliance block owning each managed line, indexed like
    /// `document.sections[s].lines[l]`.
    pub blocks: Vec<Vec<Option<String>>>,
    /// One per section; `None` when the header carries no inline command.
    pub headers: Vec<Option<HeaderTag>>,
}

/// Classify every line of `document`.
///
/// Exempt vendors are tagged site specific throughout so nothing downstream
/// can strip them.
pub fn classify(
    mut document: ConfigDocument,
    policy: &ClassificationPolicy,
    vendor: Vendor,
) -> ClassifiedDocument {
    let exempt = vendor.is_exempt();
    let mut blocks = Vec::with_capacity(document.sections.len());
    let mut headers = Vec::with_capacity(document.sections.len());

    for section in &mut document.sections {
        if exempt {
            mark_exempt(section);
            blocks.push(vec![None; section.lines.len()]);
            headers.push(section.inline_command().map(|_| HeaderTag {
                classification: Classification::SiteSpecific,
                block: None,
            }));
        } else {
            let (header, line_blocks) = classify_section(section, policy);
            blocks.push(line_blocks);
            headers.push(header);
        }
    }

    debug!(
        sections = document.sections.len(),
        exempt,
        vendor = vendor.label(),
        "classified document"
    );
    ClassifiedDocument {
        document,
        vendor,
        exempt,
        blocks,
        headers,
    }
}

fn mark_exempt(section: &mut ConfigSection) {
    for line in &mut section.lines {
        line.classification = Classification::SiteSpecific;
    }
    section.classification = Classification::SiteSpecific;
}

fn classify_section(
    section: &mut ConfigSection,
    policy: &ClassificationPolicy,
) -> (Option<HeaderTag>, Vec<Option<String>>) {
    // Foreign or malformed input has nothing to match against.
    if section.header.is_empty() {
        return (None, vec![None; section.lines.len()]);
    }

    let path = section.path();
    let whole = policy.managed_section(&path).map(str::to_string);
    let tag_entry = |entry: &str| match &whole {
        Some(block) => (Classification::Managed, Some(block.clone())),
        None => match policy.match_line(&path, entry) {
            Some(rule) => (rule.classification, rule.block.clone()),
            None => (Classification::SiteSpecific, None),
        },
    };

    let header = section.inline_command().map(|command| {
        let (classification, block) = tag_entry(command.as_str());
        HeaderTag {
            classification,
            block,
        }
    });

    let mut out = Vec::with_capacity(section.lines.len());
    for line in &mut section.lines {
        if !line.is_entry() {
            line.classification = Classification::Neutral;
            out.push(None);
            continue;
        }
        let (classification, block) = tag_entry(line.logical().as_str());
        line.classification = classification;
        out.push(block);
    }

    section.classification = if whole.is_some() {
        Classification::Managed
    } else {
        derive_section(section, header.as_ref())
    };
    (header, out)
}

fn derive_section(section: &ConfigSection, header: Option<&HeaderTag>) -> Classification {
    let tags: Vec<Classification> = header
        .map(|h| h.classification)
        .into_iter()
        .chain(section.lines.iter().map(|l| l.classification))
        .collect();
    if tags.contains(&Classification::SiteSpecific) {
        Classification::SiteSpecific
    } else if tags.contains(&Classification::Managed) {
        Classification::Managed
    } else {
        Classification::Neutral
    }
}
