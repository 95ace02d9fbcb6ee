//! Speed Syntax Translator.
//!
//! Two axes decide a `speed=` token: the firmware era (bare `1Gbps` before
//! 7.12, media-typed `1G-baseT-full` after) and the physical class of the port
//! the line now lives on. Copper tokens never survive onto optical ports.

use std::fmt::{self, Display, Formatter};

use ros_export_core::tokens::{replace_value, tokenize, value_of};
use ros_export_core::ConfigDocument;
use tracing::debug;

use crate::firmware::FirmwareEra;
use crate::ports::{PortAssignment, PortMapping};
use crate::profile::PhysicalClass;
use crate::warning::Warning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rate {
    M10,
    M100,
    G1,
    G2_5,
    G5,
    G10,
    G25,
    G40,
    G100,
}

impl Rate {
    const ALL: [Rate; 9] = [
        Rate::M10,
        Rate::M100,
        Rate::G1,
        Rate::G2_5,
        Rate::G5,
        Rate::G10,
        Rate::G25,
        Rate::G40,
        Rate::G100,
    ];

    fn mbps(self) -> u32 {
        match self {
            Rate::M10 => 10,
            Rate::M100 => 100,
            Rate::G1 => 1_000,
            Rate::G2_5 => 2_500,
            Rate::G5 => 5_000,
            Rate::G10 => 10_000,
            Rate::G25 => 25_000,
            Rate::G40 => 40_000,
            Rate::G100 => 100_000,
        }
    }

    fn legacy_token(self) -> &'static str {
        match self {
            Rate::M10 => "10Mbps",
            Rate::M100 => "100Mbps",
            Rate::G1 => "1Gbps",
            Rate::G2_5 => "2.5Gbps",
            Rate::G5 => "5Gbps",
            Rate::G10 => "10Gbps",
            Rate::G25 => "25Gbps",
            Rate::G40 => "40Gbps",
            Rate::G100 => "100Gbps",
        }
    }
}

impl Display for Rate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let legacy = self.legacy_token();
        f.write_str(legacy.trim_end_matches("bps"))
    }
}

/// Media a modern token names. Bare legacy rates carry no medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Medium {
    Copper,
    Optical,
    Bare,
}

/// Rates each physical class can run at.
pub fn class_tiers(class: PhysicalClass) -> &'static [Rate] {
    match class {
        PhysicalClass::Copper => &[
            Rate::M10,
            Rate::M100,
            Rate::G1,
            Rate::G2_5,
            Rate::G5,
            Rate::G10,
        ],
        PhysicalClass::Optical1g => &[Rate::G1],
        PhysicalClass::Optical10g => &[Rate::G10],
        PhysicalClass::Optical25g => &[Rate::G10, Rate::G25],
        PhysicalClass::Optical100g => &[Rate::G40, Rate::G100],
    }
}

/// The tier of `class` closest to `rate`, ties going to the faster tier.
fn nearest_tier(class: PhysicalClass, rate: Rate) -> Rate {
    let wanted = rate.mbps();
    class_tiers(class)
        .iter()
        .copied()
        .min_by_key(|tier| (tier.mbps().abs_diff(wanted), std::cmp::Reverse(*tier)))
        .unwrap_or(rate)
}

const MODERN_TOKENS: &[(&str, Rate, Medium)] = &[
    ("10M-baseT-half", Rate::M10, Medium::Copper),
    ("10M-baseT-full", Rate::M10, Medium::Copper),
    ("100M-baseT-half", Rate::M100, Medium::Copper),
    ("100M-baseT-full", Rate::M100, Medium::Copper),
    ("1G-baseT-half", Rate::G1, Medium::Copper),
    ("1G-baseT-full", Rate::G1, Medium::Copper),
    ("2.5G-baseT", Rate::G2_5, Medium::Copper),
    ("5G-baseT", Rate::G5, Medium::Copper),
    ("10G-baseT", Rate::G10, Medium::Copper),
    ("1G-baseX", Rate::G1, Medium::Optical),
    ("10G-baseSR-LR", Rate::G10, Medium::Optical),
    ("10G-baseCR", Rate::G10, Medium::Optical),
    ("25G-baseR", Rate::G25, Medium::Optical),
    ("25G-baseSR-LR", Rate::G25, Medium::Optical),
    ("25G-baseCR", Rate::G25, Medium::Optical),
    ("40G-baseSR4-LR4", Rate::G40, Medium::Optical),
    ("40G-baseCR4", Rate::G40, Medium::Optical),
    ("100G-baseSR4-LR4", Rate::G100, Medium::Optical),
    ("100G-baseCR4", Rate::G100, Medium::Optical),
];

/// The single token emitted for a `(class, era, rate)` combination.
fn render(class: PhysicalClass, era: FirmwareEra, rate: Rate) -> &'static str {
    if era == FirmwareEra::Legacy {
        return rate.legacy_token();
    }
    if class.is_optical() {
        match rate {
            Rate::G1 => "1G-baseX",
            Rate::G10 => "10G-baseSR-LR",
            Rate::G25 => "25G-baseR",
            Rate::G40 => "40G-baseSR4-LR4",
            // optical tiers never include sub-gigabit or 2.5G/5G rates
            _ => "100G-baseSR4-LR4",
        }
    } else {
        match rate {
            Rate::M10 => "10M-baseT-full",
            Rate::M100 => "100M-baseT-full",
            Rate::G1 => "1G-baseT-full",
            Rate::G2_5 => "2.5G-baseT",
            Rate::G5 => "5G-baseT",
            _ => "10G-baseT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ParsedSpeed {
    rate: Rate,
    medium: Medium,
    /// The token was damaged (`10G-baseSR-LR-LR`) and must be re-rendered.
    corrupted: bool,
}

fn parse_token(token: &str) -> Option<ParsedSpeed> {
    if let Some(rate) = Rate::ALL.iter().find(|r| r.legacy_token() == token) {
        return Some(ParsedSpeed {
            rate: *rate,
            medium: Medium::Bare,
            corrupted: false,
        });
    }
    let (repaired, corrupted) = repair_duplicate_suffix(token);
    MODERN_TOKENS
        .iter()
        .find(|(name, _, _)| *name == repaired)
        .map(|(_, rate, medium)| ParsedSpeed {
            rate: *rate,
            medium: *medium,
            corrupted,
        })
}

/// Collapse a repeated trailing `-LR`/`-LR4` segment.
fn repair_duplicate_suffix(token: &str) -> (&str, bool) {
    let mut current = token;
    let mut changed = false;
    for suffix in ["-LR4", "-LR"] {
        let doubled = format!("{suffix}{suffix}");
        while current.ends_with(&doubled) {
            current = &current[..current.len() - suffix.len()];
            changed = true;
        }
    }
    (current, changed)
}

/// Result of translating one `speed=` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeedOutcome {
    Unchanged,
    Rewritten(String),
    Unparseable,
}

/// Translate a speed token for the port described by `assignment`.
///
/// Tokens already valid for the target class and era come back
/// `Unchanged`, so running the translation on its own output is a no-op.
pub fn translate_speed(assignment: &PortAssignment, token: &str, era: FirmwareEra) -> SpeedOutcome {
    let Some(parsed) = parse_token(token) else {
        return SpeedOutcome::Unparseable;
    };
    let class = assignment.target_class;
    let tiers = class_tiers(class);

    let grammar_ok = match era {
        FirmwareEra::Legacy => parsed.medium == Medium::Bare,
        FirmwareEra::Modern => parsed.medium != Medium::Bare,
    };
    let medium_ok = match parsed.medium {
        Medium::Bare => true,
        Medium::Copper => !class.is_optical(),
        Medium::Optical => class.is_optical(),
    };
    let rate_ok = tiers.contains(&parsed.rate);

    if grammar_ok && medium_ok && rate_ok && !parsed.corrupted {
        return SpeedOutcome::Unchanged;
    }

    let rate = if rate_ok {
        parsed.rate
    } else {
        nearest_tier(class, parsed.rate)
    };
    let rendered = render(class, era, rate);
    if rendered == token {
        SpeedOutcome::Unchanged
    } else {
        SpeedOutcome::Rewritten(rendered.to_string())
    }
}

/// Rewrite `speed=` on every `/interface ethernet` entry using source port
/// names. Must run before ports are renamed.
pub fn rewrite_speeds(
    doc: &mut ConfigDocument,
    mapping: &PortMapping,
    era: FirmwareEra,
) -> Vec<Warning> {
    let mut warnings = Vec::new();
    for section in doc
        .sections
        .iter_mut()
        .filter(|s| s.path() == "/interface ethernet")
    {
        for line in section.lines.iter_mut().filter(|l| l.is_entry()) {
            let Some(token) = value_of(&line.text, "speed") else {
                continue;
            };
            let Some(assignment) = addressed_port(&line.text).and_then(|p| mapping.get(&p)) else {
                continue;
            };
            match translate_speed(assignment, &token, era) {
                SpeedOutcome::Unchanged => {}
                SpeedOutcome::Rewritten(new) => {
                    debug!(
                        port = %assignment.source_port,
                        from = %token,
                        to = %new,
                        "rewrote speed"
                    );
                    if let Some(text) = replace_value(&line.text, "speed", &new) {
                        line.text = text;
                    }
                }
                SpeedOutcome::Unparseable => warnings.push(Warning::UnparseableSpeedToken {
                    port: assignment.source_port.clone(),
                    token,
                }),
            }
        }
    }
    warnings
}

/// Port an ethernet entry configures: `[ find default-name=X ]`, `name=X`
/// or a bare `set X`.
fn addressed_port(line: &str) -> Option<String> {
    if let Some(port) = value_of(line, "default-name") {
        return Some(port);
    }
    tokenize(line)
        .iter()
        .skip(1)
        .find(|t| t.key.is_none() && !matches!(t.value.as_ref(), "[" | "]" | "find" | "where"))
        .map(|t| t.unquoted())
        .or_else(|| value_of(line, "name"))
}

#[cfg(test)]
mod tests {
    use super::{rewrite_speeds, translate_speed, SpeedOutcome};
    use crate::firmware::FirmwareEra;
    use crate::ports::{PortAssignment, PortMapping};
    use crate::profile::PhysicalClass;
    use crate::warning::Warning;
    use ros_export_core::parse;

    fn onto(class: PhysicalClass) -> PortAssignment {
        PortAssignment {
            source_port: "ether2".to_string(),
            target_port: "x".to_string(),
            already_in_target_format: false,
            source_class: PhysicalClass::Copper,
            target_class: class,
            purpose: None,
        }
    }

    fn rewritten(s: &str) -> SpeedOutcome {
        SpeedOutcome::Rewritten(s.to_string())
    }

    #[test]
    fn copper_token_onto_10g_optical_modern() {
        let a = onto(PhysicalClass::Optical10g);
        assert_eq!(
            translate_speed(&a, "1G-baseT-full", FirmwareEra::Modern),
            rewritten("10G-baseSR-LR")
        );
    }

    #[test]
    fn legacy_rate_is_upgraded_for_sfp_plus() {
        let a = onto(PhysicalClass::Optical10g);
        assert_eq!(
            translate_speed(&a, "1Gbps", FirmwareEra::Legacy),
            rewritten("10Gbps")
        );
    }

    #[test]
    fn valid_25g_token_is_unchanged() {
        let a = onto(PhysicalClass::Optical25g);
        assert_eq!(
            translate_speed(&a, "25G-baseR", FirmwareEra::Modern),
            SpeedOutcome::Unchanged
        );
        assert_eq!(
            translate_speed(&a, "10G-baseSR-LR", FirmwareEra::Modern),
            SpeedOutcome::Unchanged
        );
    }

    #[test]
    fn grammar_follows_era() {
        let copper = onto(PhysicalClass::Copper);
        assert_eq!(
            translate_speed(&copper, "100Mbps", FirmwareEra::Modern),
            rewritten("100M-baseT-full")
        );
        assert_eq!(
            translate_speed(&copper, "1G-baseT-full", FirmwareEra::Legacy),
            rewritten("1Gbps")
        );
        let optical = onto(PhysicalClass::Optical10g);
        assert_eq!(
            translate_speed(&optical, "10Gbps", FirmwareEra::Modern),
            rewritten("10G-baseSR-LR")
        );
    }

    #[test]
    fn optical_token_onto_copper_becomes_copper() {
        let copper = onto(PhysicalClass::Copper);
        assert_eq!(
            translate_speed(&copper, "10G-baseSR-LR", FirmwareEra::Modern),
            rewritten("10G-baseT")
        );
        assert_eq!(
            translate_speed(&copper, "25G-baseR", FirmwareEra::Modern),
            rewritten("10G-baseT")
        );
    }

    #[test]
    fn unsupported_rate_moves_to_nearest_tier() {
        let sfp28 = onto(PhysicalClass::Optical25g);
        assert_eq!(
            translate_speed(&sfp28, "1Gbps", FirmwareEra::Modern),
            rewritten("10G-baseSR-LR")
        );
        assert_eq!(
            translate_speed(&sfp28, "100Mbps", FirmwareEra::Modern),
            rewritten("10G-baseSR-LR")
        );
        assert_eq!(
            translate_speed(&sfp28, "100G-baseCR4", FirmwareEra::Modern),
            rewritten("25G-baseR")
        );
        let qsfp = onto(PhysicalClass::Optical100g);
        assert_eq!(
            translate_speed(&qsfp, "10Gbps", FirmwareEra::Legacy),
            rewritten("40Gbps")
        );
        let copper = onto(PhysicalClass::Copper);
        assert_eq!(
            translate_speed(&copper, "40G-baseSR4-LR4", FirmwareEra::Legacy),
            rewritten("10Gbps")
        );
    }

    #[test]
    fn repairs_duplicated_suffix() {
        let a = onto(PhysicalClass::Optical10g);
        assert_eq!(
            translate_speed(&a, "10G-baseSR-LR-LR", FirmwareEra::Modern),
            rewritten("10G-baseSR-LR")
        );
        let a = onto(PhysicalClass::Optical25g);
        assert_eq!(
            translate_speed(&a, "10G-baseSR-LR-LR", FirmwareEra::Modern),
            rewritten("10G-baseSR-LR")
        );
    }

    #[test]
    fn translation_is_idempotent() {
        let classes = [
            PhysicalClass::Copper,
            PhysicalClass::Optical1g,
            PhysicalClass::Optical10g,
            PhysicalClass::Optical25g,
            PhysicalClass::Optical100g,
        ];
        let tokens = [
            "10Mbps", "100Mbps", "1Gbps", "10Gbps", "25Gbps", "100Gbps", "1G-baseT-full",
            "2.5G-baseT", "1G-baseX", "10G-baseSR-LR", "10G-baseSR-LR-LR", "25G-baseR",
            "40G-baseSR4-LR4", "100G-baseCR4",
        ];
        for era in [FirmwareEra::Legacy, FirmwareEra::Modern] {
            for class in classes {
                let a = onto(class);
                for token in tokens {
                    let once = match translate_speed(&a, token, era) {
                        SpeedOutcome::Rewritten(t) => t,
                        SpeedOutcome::Unchanged => token.to_string(),
                        SpeedOutcome::Unparseable => panic!("{token} should parse"),
                    };
                    assert_eq!(
                        translate_speed(&a, &once, era),
                        SpeedOutcome::Unchanged,
                        "{token} -> {once} on {class} ({era:?})"
                    );
                }
            }
        }
    }

    #[test]
    fn copper_never_lands_on_optical() {
        let copper_tokens = ["10M-baseT-half", "100M-baseT-full", "1G-baseT-full", "2.5G-baseT", "5G-baseT", "10G-baseT"];
        for class in [
            PhysicalClass::Optical1g,
            PhysicalClass::Optical10g,
            PhysicalClass::Optical25g,
            PhysicalClass::Optical100g,
        ] {
            for token in copper_tokens {
                match translate_speed(&onto(class), token, FirmwareEra::Modern) {
                    SpeedOutcome::Rewritten(t) => assert!(!t.contains("baseT"), "{t}"),
                    other => panic!("{token} on {class} gave {other:?}"),
                }
            }
        }
    }

    #[test]
    fn unknown_token_is_unparseable() {
        let a = onto(PhysicalClass::Copper);
        assert_eq!(
            translate_speed(&a, "auto-fast", FirmwareEra::Modern),
            SpeedOutcome::Unparseable
        );
    }

    #[test]
    fn rewrites_value_wrapped_across_continuation() {
        let mut doc = parse(
            "/interface ethernet\nset [ find default-name=ether2 ] comment=lan speed=\\\n    1Gbps\nset [ find default-name=ether3 ] speed=turbo\n",
        );
        let mut three = onto(PhysicalClass::Copper);
        three.source_port = "ether3".to_string();
        let mapping = PortMapping {
            assignments: vec![onto(PhysicalClass::Optical10g), three],
            ..PortMapping::default()
        };
        let warnings = rewrite_speeds(&mut doc, &mapping, FirmwareEra::Legacy);
        assert_eq!(
            doc.sections[0].lines[0].text,
            "set [ find default-name=ether2 ] comment=lan speed=10Gbps"
        );
        assert!(matches!(
            warnings.as_slice(),
            [Warning::UnparseableSpeedToken { port, token }] if port == "ether3" && token == "turbo"
        ));
    }
}
