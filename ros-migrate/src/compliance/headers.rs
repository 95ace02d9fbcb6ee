//! Section-header detection for the remote compliance script.
//!
//! The script is maintained by hand, so headers come in several styles:
//! `# ---- DNS ----`, `# SNMP`, `# Firewall input rules`. Each style is a
//! named rule; rules are tried in order and the first hit decides.

use std::sync::LazyLock;

use regex::Regex;

/// One way of recognizing a header comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderRule {
    /// Text wrapped in runs of `-`, `=`, `*`, `#`, `~` or `_`.
    DecoratedSeparator,
    /// A short comment with no lowercase letters.
    AllCapsShort,
    /// A comment starting with one of the listed keywords, any case.
    KeywordPrefix(&'static [&'static str]),
}

pub const HEADER_KEYWORDS: &[&str] = &[
    "FIREWALL",
    "FIREALL",
    "ADDRESS LIST",
    "SERVICE PORT",
    "IP SERVICE",
    "DNS",
    "NTP",
    "SNMP",
    "RADIUS",
    "USER AAA",
    "LOGGING",
    "SYSLOG",
];

pub const HEADER_RULES: [HeaderRule; 3] = [
    HeaderRule::DecoratedSeparator,
    HeaderRule::AllCapsShort,
    HeaderRule::KeywordPrefix(HEADER_KEYWORDS),
];

const ALL_CAPS_MAX_WORDS: usize = 5;
const ALL_CAPS_MAX_LEN: usize = 40;

static DECORATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-=*#~_]{3,}\s*(.*?)\s*[-=*#~_]*$").expect("valid header regex")
});

impl HeaderRule {
    /// Header text if `body` (a comment with `#` removed) matches this rule.
    pub fn detect(&self, body: &str) -> Option<String> {
        match self {
            HeaderRule::DecoratedSeparator => {
                let caps = DECORATED.captures(body)?;
                let text = caps.get(1)?.as_str().trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            HeaderRule::AllCapsShort => {
                let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
                let has_lower = body.chars().any(|c| c.is_lowercase());
                let words = body.split_whitespace().count();
                let short = words <= ALL_CAPS_MAX_WORDS && body.len() <= ALL_CAPS_MAX_LEN;
                (has_upper && !has_lower && short).then(|| body.to_string())
            }
            HeaderRule::KeywordPrefix(keywords) => {
                let upper = body.to_ascii_uppercase();
                keywords
                    .iter()
                    .any(|k| upper.starts_with(*k))
                    .then(|| body.to_string())
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HeaderRule::DecoratedSeparator => "decorated_separator",
            HeaderRule::AllCapsShort => "all_caps_short",
            HeaderRule::KeywordPrefix(_) => "keyword_prefix",
        }
    }
}

/// A detected header and the rule that found it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMatch {
    pub rule: HeaderRule,
    pub text: String,
}

/// Run the rules over one raw script line. Only comments can be headers.
pub fn detect_header(line: &str) -> Option<HeaderMatch> {
    let body = line.trim().strip_prefix('#')?.trim();
    if body.is_empty() {
        return None;
    }
    HEADER_RULES.iter().find_map(|rule| {
        rule.detect(body).map(|text| HeaderMatch { rule: *rule, text })
    })
}

/// Header phrase -> block key, multi-word phrases first. `FIREALL` is a
/// long-standing typo in the published script and is accepted everywhere
/// `FIREWALL` is.
const SYNONYMS: &[(&str, &str)] = &[
    ("FIREWALL ADDRESS", "firewall_address_list"),
    ("FIREALL ADDRESS", "firewall_address_list"),
    ("ADDRESS LIST", "firewall_address_list"),
    ("FIREWALL SERVICE", "firewall_service_port"),
    ("FIREALL SERVICE", "firewall_service_port"),
    ("SERVICE PORT", "firewall_service_port"),
    ("FIREWALL FILTER", "firewall_filter_input"),
    ("FIREALL FILTER", "firewall_filter_input"),
    ("FIREWALL INPUT", "firewall_filter_input"),
    ("FIREALL INPUT", "firewall_filter_input"),
    ("INPUT CHAIN", "firewall_filter_input"),
    ("IP SERVICE", "ip_service"),
    ("USER AAA", "user_aaa"),
    ("FIREWALL", "firewall_filter_input"),
    ("FIREALL", "firewall_filter_input"),
    ("ACL", "firewall_filter_input"),
    ("SERVICES", "ip_service"),
    ("DNS", "dns"),
    ("NTP", "ntp"),
    ("SNTP", "ntp"),
    ("SNMP", "snmp"),
    ("RADIUS", "radius"),
    ("AAA", "user_aaa"),
    ("LOGGING", "logging"),
    ("SYSLOG", "logging"),
    ("LOG", "logging"),
];

/// Fold header text onto a canonical block key.
///
/// Matching is on leading words, first phrase wins; a trailing `S` on a
/// word is tolerated (`SERVICE PORTS`, `IP SERVICES`).
pub fn canonical_key(text: &str) -> Option<&'static str> {
    let upper = text.to_ascii_uppercase();
    let words: Vec<&str> = upper
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    SYNONYMS.iter().find_map(|(phrase, key)| {
        let wanted: Vec<&str> = phrase.split_whitespace().collect();
        let hit = wanted.len() <= words.len()
            && wanted
                .iter()
                .zip(&words)
                .all(|(w, got)| *got == *w || got.strip_suffix('S') == Some(*w));
        hit.then_some(*key)
    })
}

#[cfg(test)]
mod tests {
    use super::{canonical_key, detect_header, HeaderRule};

    #[test]
    fn decorated_separator() {
        let hit = detect_header("# ---- FIREWALL ADDRESS LISTS ----").expect("header");
        assert_eq!(hit.rule, HeaderRule::DecoratedSeparator);
        assert_eq!(hit.text, "FIREWALL ADDRESS LISTS");
    }

    #[test]
    fn bare_rule_line_is_not_a_header() {
        assert!(detect_header("# ==========================").is_none());
        assert!(detect_header("#").is_none());
        assert!(detect_header("/ip dns").is_none());
    }

    #[test]
    fn all_caps_and_keyword_rules() {
        let hit = detect_header("# SNMP").expect("header");
        assert_eq!(hit.rule, HeaderRule::AllCapsShort);
        let hit = detect_header("# Radius servers for PPP").expect("header");
        assert!(matches!(hit.rule, HeaderRule::KeywordPrefix(_)));
        assert!(detect_header("# managed centrally, do not edit").is_none());
    }

    #[test]
    fn synonyms_fold_to_keys() {
        assert_eq!(canonical_key("FIREWALL ADDRESS LISTS"), Some("firewall_address_list"));
        assert_eq!(canonical_key("FIREALL FILTER INPUT"), Some("firewall_filter_input"));
        assert_eq!(canonical_key("Firewall"), Some("firewall_filter_input"));
        assert_eq!(canonical_key("SERVICE PORTS"), Some("firewall_service_port"));
        assert_eq!(canonical_key("IP SERVICES"), Some("ip_service"));
        assert_eq!(canonical_key("Radius servers for PPP"), Some("radius"));
        assert_eq!(canonical_key("SYSLOG"), Some("logging"));
        assert_eq!(canonical_key("ALLOW ICMP"), None);
        assert_eq!(canonical_key("NOC COMPLIANCE STANDARD 2025.09"), None);
    }
}
