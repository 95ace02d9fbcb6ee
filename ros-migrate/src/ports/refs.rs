//! Locating and rewriting port names inside entry text.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::ops::Range;

use ros_export_core::{ConfigDocument, ConfigLine};

use crate::profile::DeviceProfile;

/// Boundary-aware matcher over a fixed set of port names.
///
/// A name matches only when the preceding character cannot be part of an
/// interface name and the following character is not a digit. `ether1`
/// therefore never matches inside `ether12`, and `sfp28-1` never inside
/// `qsfp28-1-1`, while a renamed `ether2-UPLINK` still carries `ether2`.
#[derive(Debug, Clone)]
pub struct PortMatcher {
    /// Longest first so the most specific name wins at a position.
    names: Vec<String>,
}

impl PortMatcher {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names
            .into_iter()
            .map(Into::into)
            .filter(|n| !n.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        Self { names }
    }

    pub fn for_profile(profile: &DeviceProfile) -> Self {
        Self::new(profile.port_names())
    }

    /// Every non-overlapping match in `text`, left to right.
    pub fn find_all<'m>(&'m self, text: &str) -> Vec<(Range<usize>, &'m str)> {
        let bytes = text.as_bytes();
        let mut out = Vec::new();
        let mut idx = 0;
        while idx < bytes.len() {
            if idx > 0 && is_name_byte(bytes[idx - 1]) {
                idx += 1;
                continue;
            }
            let hit = self.names.iter().find(|name| {
                let end = idx + name.len();
                bytes[idx..].starts_with(name.as_bytes())
                    && !bytes.get(end).is_some_and(u8::is_ascii_digit)
            });
            match hit {
                Some(name) => {
                    out.push((idx..idx + name.len(), name.as_str()));
                    idx += name.len();
                }
                None => idx += 1,
            }
        }
        out
    }

    /// Replace every match for which `lookup` returns a new name, in one pass.
    ///
    /// Replacements are never re-scanned, so `ether2 -> ether3` and
    /// `ether3 -> ether4` cannot chain.
    pub fn rewrite<'a, F>(&self, text: &str, lookup: F) -> String
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for (range, name) in self.find_all(text) {
            if let Some(replacement) = lookup(name) {
                out.push_str(&text[last..range.start]);
                out.push_str(replacement);
                last = range.end;
            }
        }
        out.push_str(&text[last..]);
        out
    }

    /// The text of `line` to scan for port names.
    ///
    /// Normally the raw entry, so rewrites keep the layout. When a continuation
    /// splits a port name, the joined form is returned instead.
    pub fn scan_text<'l>(&self, line: &'l ConfigLine) -> Cow<'l, str> {
        if !line.text.contains('\n') {
            return Cow::Borrowed(&line.text);
        }
        let logical = line.logical();
        let names = |text: &str| -> Vec<String> {
            self.find_all(text).into_iter().map(|(_, n)| n.to_string()).collect()
        };
        if names(&logical) == names(&line.text) {
            Cow::Borrowed(&line.text)
        } else {
            Cow::Owned(logical)
        }
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

/// Source-profile ports referenced by the document, in order of first
/// appearance. Comment lines and the preamble are not scanned.
pub fn collect_referenced_ports(doc: &ConfigDocument, source: &DeviceProfile) -> Vec<String> {
    let matcher = PortMatcher::for_profile(source);
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for (_, line) in doc.lines() {
        if !line.is_entry() {
            continue;
        }
        for (_, name) in matcher.find_all(&matcher.scan_text(line)) {
            if seen.insert(name.to_string()) {
                out.push(name.to_string());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use ros_export_core::ConfigLine;

    use super::PortMatcher;

    #[test]
    fn respects_identifier_boundaries() {
        let m = PortMatcher::new(["ether1", "ether12", "sfp28-1", "qsfp28-1-1"]);
        let hits = |t: &str| -> Vec<String> {
            m.find_all(t).into_iter().map(|(_, n)| n.to_string()).collect()
        };
        assert_eq!(hits("interface=ether12"), vec!["ether12"]);
        assert_eq!(hits("interface=ether1"), vec!["ether1"]);
        assert_eq!(hits("interface=qsfp28-1-1"), vec!["qsfp28-1-1"]);
        assert!(hits("interface=xether1").is_empty());
    }

    #[test]
    fn renamed_interface_carries_port() {
        let m = PortMatcher::new(["ether2"]);
        let hits: Vec<_> = m.find_all("name=ether2-UPLINK").into_iter().map(|(_, n)| n).collect();
        assert_eq!(hits, vec!["ether2"]);
    }

    #[test]
    fn rewrite_does_not_chain() {
        let m = PortMatcher::new(["ether2", "ether3"]);
        let out = m.rewrite("a=ether2 b=ether3", |n| match n {
            "ether2" => Some("ether3"),
            "ether3" => Some("ether4"),
            _ => None,
        });
        assert_eq!(out, "a=ether3 b=ether4");
    }

    #[test]
    fn port_name_split_by_continuation_is_joined() {
        let m = PortMatcher::new(["ether1", "ether12"]);
        let split = ConfigLine::new("add interface=ether1\\\n    2 list=LAN");
        assert_eq!(m.scan_text(&split), "add interface=ether12 list=LAN");

        let between = ConfigLine::new("add interface=ether12 \\\n    list=LAN");
        assert_eq!(m.scan_text(&between), between.text.as_str());
    }

    #[test]
    fn rewrite_leaves_unmapped_names() {
        let m = PortMatcher::new(["ether9"]);
        assert_eq!(m.rewrite("interface=ether9", |_| None), "interface=ether9");
    }
}
