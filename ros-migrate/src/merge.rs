//! Compliance Merge Engine.
//!
//! Strips managed content from the customer body and appends the compliance
//! blocks once, after a fixed marker. The marker also makes re-application
//! safe: anything from a previous marker onward is discarded first.

use std::collections::{BTreeMap, BTreeSet};

use ros_export_core::{write, Classification, ConfigDocument, ConfigLine, ConfigSection};
use tracing::debug;

use crate::classify::{ClassifiedDocument, HeaderTag};
use crate::compliance::ComplianceBlockSet;
use crate::error::EngineError;
use crate::ports::PortMatcher;
use crate::warning::Warning;

/// Line that opens the appended compliance section.
pub const COMPLIANCE_MARKER: &str = "# RFC-NOC-COMPLIANCE STANDARDS";
/// Prefix of the comment that introduces each block.
pub const BLOCK_PREFIX: &str = "# compliance: ";
pub const UNMAPPED_MARKER: &str = "PORT NOT AVAILABLE ON TARGET";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    pub apply_compliance: bool,
    /// Keep the header of a section that stripping left without entries.
    pub strict_preserve: bool,
}

/// Customer body plus the compliance blocks to append after it.
#[derive(Debug, Clone)]
pub struct MergedDocument {
    pub body: ConfigDocument,
    pub compliance: Option<ComplianceBlockSet>,
    pub warnings: Vec<Warning>,
}

impl MergedDocument {
    pub fn render(&self) -> String {
        let mut out = write(&self.body);
        let Some(set) = &self.compliance else {
            return out;
        };
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(COMPLIANCE_MARKER);
        out.push('\n');
        for (key, text) in set.iter() {
            out.push_str(BLOCK_PREFIX);
            out.push_str(key);
            out.push('\n');
            out.push_str(text);
            out.push('\n');
        }
        out
    }
}

/// Merge compliance blocks into a classified document.
///
/// Managed content is removed only when `blocks` has a replacement for it;
/// otherwise it stays and a warning says why. Exempt documents and runs with
/// compliance disabled get no marker and lose nothing.
pub fn merge(
    classified: ClassifiedDocument,
    blocks: Option<&ComplianceBlockSet>,
    options: MergeOptions,
) -> Result<MergedDocument, EngineError> {
    if classified.exempt {
        return Ok(MergedDocument {
            body: classified.document,
            compliance: None,
            warnings: Vec::new(),
        });
    }

    let ClassifiedDocument {
        mut document,
        blocks: owners,
        headers,
        ..
    } = classified;
    let mut owners = Owners {
        lines: owners,
        headers,
    };
    truncate_at_marker(&mut document, &mut owners);

    if !options.apply_compliance {
        return Ok(MergedDocument {
            body: document,
            compliance: None,
            warnings: Vec::new(),
        });
    }

    let set = blocks.ok_or_else(|| {
        EngineError::ComplianceUnavailable("no compliance blocks supplied".to_string())
    })?;
    let mut warnings = Vec::new();
    let owners = strip_managed(&mut document, owners, set, options.strict_preserve, &mut warnings);

    let merged = MergedDocument {
        body: document,
        compliance: Some(set.clone()),
        warnings,
    };
    verify(&merged, &owners)?;
    debug!(
        blocks = set.len(),
        sections = merged.body.sections.len(),
        "merged compliance"
    );
    Ok(merged)
}

/// Block owners of a document's lines and inline header commands.
#[derive(Debug, Default)]
struct Owners {
    lines: Vec<Vec<Option<String>>>,
    headers: Vec<Option<HeaderTag>>,
}

impl Owners {
    fn truncate(&mut self, sections: usize) {
        self.lines.truncate(sections);
        self.headers.truncate(sections);
    }
}

/// Drop a previously appended compliance section and everything after it.
fn truncate_at_marker(doc: &mut ConfigDocument, owners: &mut Owners) {
    if let Some(idx) = doc.preamble.iter().position(|l| is_marker(l)) {
        doc.preamble.truncate(idx);
        doc.sections.clear();
        owners.truncate(0);
        return;
    }
    let hit = doc.sections.iter().enumerate().find_map(|(s, section)| {
        section
            .lines
            .iter()
            .position(|line| is_marker(&line.text))
            .map(|l| (s, l))
    });
    let Some((s, l)) = hit else {
        return;
    };
    doc.sections[s].lines.truncate(l);
    if let Some(line_owners) = owners.lines.get_mut(s) {
        line_owners.truncate(l);
    }
    doc.sections.truncate(s + 1);
    owners.truncate(s + 1);
}

fn is_marker(line: &str) -> bool {
    line.trim() == COMPLIANCE_MARKER
}

fn strip_managed(
    doc: &mut ConfigDocument,
    owners: Owners,
    set: &ComplianceBlockSet,
    strict_preserve: bool,
    warnings: &mut Vec<Warning>,
) -> Owners {
    let mut kept = Owners::default();
    let mut kept_sections = Vec::with_capacity(doc.sections.len());
    let mut reported = BTreeSet::new();
    let mut missing = |path: &str, block: &str| {
        if reported.insert((path.to_string(), block.to_string())) {
            warnings.push(Warning::MissingComplianceBlock {
                section: path.to_string(),
                block: block.to_string(),
            });
        }
    };

    let headers = owners.headers.into_iter().chain(std::iter::repeat(None));
    for ((mut section, line_owners), mut header) in
        doc.sections.drain(..).zip(owners.lines).zip(headers)
    {
        let path = section.path();
        let mut removed = 0;

        let header_block = header
            .as_ref()
            .filter(|h| h.classification == Classification::Managed)
            .and_then(|h| h.block.clone());
        match header_block.as_deref() {
            Some(block) if set.contains(block) => {
                section.strip_inline_command();
                header = None;
                removed += 1;
            }
            Some(block) => missing(path.as_str(), block),
            None => {}
        }

        let ConfigSection {
            header: header_text,
            lines,
            classification,
        } = section;
        let mut kept_lines = Vec::with_capacity(lines.len());
        let mut kept_line_owners = Vec::with_capacity(lines.len());

        for (line, owner) in lines.into_iter().zip(line_owners) {
            let managed_block = owner
                .as_deref()
                .filter(|_| line.classification == Classification::Managed);
            match managed_block {
                Some(block) if set.contains(block) => {
                    removed += 1;
                    continue;
                }
                Some(block) => missing(path.as_str(), block),
                None => {}
            }
            kept_lines.push(line);
            kept_line_owners.push(owner);
        }

        let emptied = removed > 0 && header.is_none() && !kept_lines.iter().any(|l| l.is_entry());
        if emptied && !strict_preserve {
            continue;
        }
        let classification = if removed > 0 {
            derive(header.as_ref(), &kept_lines)
        } else {
            classification
        };
        kept_sections.push(ConfigSection {
            header: header_text,
            lines: kept_lines,
            classification,
        });
        kept.lines.push(kept_line_owners);
        kept.headers.push(header);
    }

    doc.sections = kept_sections;
    kept
}

fn derive(header: Option<&HeaderTag>, lines: &[ConfigLine]) -> Classification {
    let tags: Vec<Classification> = header
        .map(|h| h.classification)
        .into_iter()
        .chain(lines.iter().map(|l| l.classification))
        .collect();
    if tags.contains(&Classification::SiteSpecific) {
        Classification::SiteSpecific
    } else if tags.contains(&Classification::Managed) {
        Classification::Managed
    } else {
        Classification::Neutral
    }
}

/// Post-merge checks. On failure the merged output is withheld.
fn verify(merged: &MergedDocument, owners: &Owners) -> Result<(), EngineError> {
    let rendered = merged.render();
    let markers = rendered.lines().filter(|l| is_marker(l)).count();
    if markers != 1 {
        return Err(EngineError::ReplayOrDuplicateSection(format!(
            "compliance marker appears {markers} times"
        )));
    }

    let mut seen = BTreeMap::new();
    for line in rendered.lines() {
        if let Some(key) = line.strip_prefix(BLOCK_PREFIX) {
            let count = seen.entry(key.trim().to_string()).or_insert(0usize);
            *count += 1;
            if *count > 1 {
                return Err(EngineError::ReplayOrDuplicateSection(format!(
                    "compliance block '{}' appended twice",
                    key.trim()
                )));
            }
        }
    }

    let Some(set) = &merged.compliance else {
        return Ok(());
    };
    for (section, header) in merged.body.sections.iter().zip(&owners.headers) {
        let Some(header) = header else {
            continue;
        };
        if section.inline_command().is_none() || header.classification != Classification::Managed {
            continue;
        }
        if let Some(block) = header.block.as_deref().filter(|b| set.contains(b)) {
            return Err(EngineError::ReplayOrDuplicateSection(format!(
                "{} header still carries managed '{block}' content that is also appended",
                section.path()
            )));
        }
    }
    for (section, line_owners) in merged.body.sections.iter().zip(&owners.lines) {
        for (line, owner) in section.lines.iter().zip(line_owners) {
            if line.classification != Classification::Managed {
                continue;
            }
            if let Some(block) = owner.as_deref().filter(|b| set.contains(b)) {
                return Err(EngineError::ReplayOrDuplicateSection(format!(
                    "{} still holds managed '{block}' content that is also appended",
                    section.path()
                )));
            }
        }
    }
    Ok(())
}

/// Comment out every entry that references an unmapped port.
///
/// The entry is folded onto one line so no continuation escapes the comment.
/// Returns how many lines each port disabled.
pub fn comment_out_unmapped(doc: &mut ConfigDocument, unmapped: &[String]) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = unmapped.iter().map(|p| (p.clone(), 0)).collect();
    if unmapped.is_empty() {
        return counts;
    }
    let matcher = PortMatcher::new(unmapped.iter().cloned());

    for section in &mut doc.sections {
        for line in section.lines.iter_mut().filter(|l| l.is_entry()) {
            let hits: BTreeSet<String> = matcher
                .find_all(&matcher.scan_text(line))
                .into_iter()
                .map(|(_, name)| name.to_string())
                .collect();
            if hits.is_empty() {
                continue;
            }
            for port in &hits {
                if let Some(count) = counts.get_mut(port) {
                    *count += 1;
                }
            }
            let ports = hits.into_iter().collect::<Vec<_>>().join(", ");
            line.text = format!("# {UNMAPPED_MARKER} [{ports}]: {}", line.logical());
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::{
        comment_out_unmapped, merge, verify, MergeOptions, MergedDocument, Owners,
        COMPLIANCE_MARKER,
    };
    use crate::classify::{classify, ClassificationPolicy, HeaderTag};
    use crate::compliance::ComplianceBlockSet;
    use crate::detect::Vendor;
    use crate::error::EngineError;
    use crate::warning::Warning;
    use pretty_assertions::assert_eq;
    use ros_export_core::{parse, Classification};

    const BODY: &str = "/ip firewall address-list\nadd address=1.1.1.1 list=managerIP\nadd address=2.2.2.2 list=unauth\n/snmp\nset enabled=yes\n/system identity\nset name=r1\n";

    fn run(raw: &str, options: MergeOptions) -> String {
        let policy = ClassificationPolicy::embedded().expect("policy");
        let classified = classify(parse(raw), &policy, Vendor::RouterOs);
        let blocks = ComplianceBlockSet::fallback().with_loopback(Some("10.0.0.1"));
        merge(classified, Some(&blocks), options)
            .expect("merge")
            .render()
    }

    fn apply() -> MergeOptions {
        MergeOptions {
            apply_compliance: true,
            strict_preserve: false,
        }
    }

    #[test]
    fn marker_appears_exactly_once() {
        let out = run(BODY, apply());
        assert_eq!(out.matches(COMPLIANCE_MARKER).count(), 1);
    }

    #[test]
    fn no_marker_when_disabled() {
        let out = run(BODY, MergeOptions::default());
        assert_eq!(out, BODY);
    }

    #[test]
    fn managed_lines_move_to_compliance_section() {
        let out = run(BODY, apply());
        let (body, appended) = out.split_once(COMPLIANCE_MARKER).expect("marker");
        assert!(body.contains("list=unauth"));
        assert!(!body.contains("list=managerIP"));
        assert!(!body.contains("/snmp"));
        assert!(appended.contains("list=managerIP"));
        assert!(appended.contains("# compliance: snmp"));
    }

    #[test]
    fn inline_header_commands_are_stripped() {
        let raw = "/snmp set enabled=yes trap-community=legacy-ro\n/ip dns set servers=8.8.8.8\n/system identity set name=r1\n";
        let out = run(raw, apply());
        let (body, appended) = out.split_once(COMPLIANCE_MARKER).expect("marker");
        assert_eq!(body, "/system identity set name=r1\n");
        assert!(appended.contains("# compliance: snmp\n"));
        assert!(appended.contains("# compliance: dns\n"));
        assert_eq!(run(&out, apply()), out);

        let strict = run(
            raw,
            MergeOptions {
                apply_compliance: true,
                strict_preserve: true,
            },
        );
        let body = strict.split_once(COMPLIANCE_MARKER).expect("marker").0;
        assert!(body.starts_with("/snmp\n/ip dns\n"), "{body}");
        assert!(!body.contains("trap-community"));
    }

    #[test]
    fn verify_rejects_managed_header_left_in_body() {
        let merged = MergedDocument {
            body: parse("/snmp set enabled=yes\n"),
            compliance: Some(ComplianceBlockSet::fallback().with_loopback(Some("10.0.0.1"))),
            warnings: Vec::new(),
        };
        let owners = Owners {
            lines: vec![Vec::new()],
            headers: vec![Some(HeaderTag {
                classification: Classification::Managed,
                block: Some("snmp".to_string()),
            })],
        };
        let err = verify(&merged, &owners).expect_err("managed header duplicated");
        assert!(matches!(err, EngineError::ReplayOrDuplicateSection(_)));
    }

    #[test]
    fn strict_preserve_keeps_emptied_headers() {
        let out = run(
            BODY,
            MergeOptions {
                apply_compliance: true,
                strict_preserve: true,
            },
        );
        let body = out.split_once(COMPLIANCE_MARKER).expect("marker").0;
        assert!(body.contains("/snmp\n"));
    }

    #[test]
    fn reapplying_is_idempotent() {
        let once = run(BODY, apply());
        let twice = run(&once, apply());
        assert_eq!(once, twice);
    }

    #[test]
    fn missing_block_keeps_content_and_warns() {
        let policy = ClassificationPolicy::embedded().expect("policy");
        let classified = classify(parse(BODY), &policy, Vendor::RouterOs);
        let mut only_dns = std::collections::BTreeMap::new();
        only_dns.insert("dns", "/ip dns\nset servers=1.1.1.1".to_string());
        let blocks = ComplianceBlockSet::new(
            only_dns,
            crate::compliance::BlockOrigin::Fallback {
                version: "test".to_string(),
            },
        );
        let merged = merge(classified, Some(&blocks), apply()).expect("merge");
        let out = merged.render();
        assert!(out.contains("list=managerIP"));
        assert!(out.contains("/snmp\nset enabled=yes"));
        assert!(merged.warnings.iter().any(|w| matches!(
            w,
            Warning::MissingComplianceBlock { block, .. } if block == "snmp"
        )));
    }

    #[test]
    fn exempt_document_is_untouched() {
        let policy = ClassificationPolicy::embedded().expect("policy");
        let raw = "# Tarana Wireless\nhostname rn\n";
        let classified = classify(parse(raw), &policy, Vendor::Tarana);
        let blocks = ComplianceBlockSet::fallback();
        let merged = merge(classified, Some(&blocks), apply()).expect("merge");
        assert_eq!(merged.render(), raw);
    }

    #[test]
    fn unmapped_lines_are_commented_with_marker() {
        let mut doc = parse(
            "/ip address\nadd address=192.0.2.1/30 \\\n    interface=ether12\nadd address=192.0.2.5/30 interface=ether1\n",
        );
        let counts = comment_out_unmapped(&mut doc, &["ether12".to_string()]);
        assert_eq!(counts.get("ether12"), Some(&1));
        assert_eq!(
            doc.sections[0].lines[0].text,
            "# PORT NOT AVAILABLE ON TARGET [ether12]: add address=192.0.2.1/30 interface=ether12"
        );
        assert_eq!(
            doc.sections[0].lines[1].text,
            "add address=192.0.2.5/30 interface=ether1"
        );
    }
}
