use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ros_export_core::tokens::value_of;
use ros_export_core::Classification;
use serde::Deserialize;
use thiserror::Error;

use crate::compliance::COMPLIANCE_ORDER;

/// Classification rules, loaded from data rather than compiled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationPolicy {
    /// Menu path -> compliance block key, for sections owned wholesale.
    pub managed_sections: BTreeMap<String, String>,
    /// Ordered line rules; first match wins.
    pub line_rules: Vec<LineRule>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRule {
    pub name: String,
    pub section: String,
    /// Every key must be present on the line with one of the listed values.
    pub matchers: BTreeMap<String, Vec<String>>,
    pub classification: Classification,
    pub block: Option<String>,
}

impl LineRule {
    pub fn matches(&self, section_path: &str, line: &str) -> bool {
        section_path == self.section
            && self.matchers.iter().all(|(key, allowed)| {
                value_of(line, key).is_some_and(|value| allowed.iter().any(|a| *a == value))
            })
    }
}

/// Errors returned when loading a classification policy.
#[derive(Debug, Error)]
pub enum PolicyLoadError {
    #[error("failed to read classification policy {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse classification policy {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid classification policy {path}: {reason}")]
    Invalid { path: String, reason: String },
}

#[derive(Debug, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    managed_sections: BTreeMap<String, String>,
    #[serde(default)]
    line_rule: Vec<RuleRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RuleClass {
    Managed,
    SiteSpecific,
}

#[derive(Debug, Deserialize)]
struct RuleRow {
    name: String,
    section: String,
    classification: RuleClass,
    #[serde(default)]
    block: Option<String>,
    #[serde(rename = "match")]
    matchers: BTreeMap<String, Vec<String>>,
}

impl ClassificationPolicy {
    /// Policy compiled into the binary.
    pub fn embedded() -> Result<Self, PolicyLoadError> {
        let raw = include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/policy/classification.toml"
        ));
        Self::from_toml(raw, "embedded policy")
    }

    pub fn from_file(path: &Path) -> Result<Self, PolicyLoadError> {
        let raw = fs::read_to_string(path).map_err(|source| PolicyLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&raw, &path.display().to_string())
    }

    /// Load from `path` when given, else the embedded policy.
    pub fn load(path: Option<&Path>) -> Result<(Self, String), PolicyLoadError> {
        match path {
            Some(path) => Ok((Self::from_file(path)?, format!("file:{}", path.display()))),
            None => Ok((Self::embedded()?, "embedded".to_string())),
        }
    }

    pub fn from_toml(raw: &str, origin: &str) -> Result<Self, PolicyLoadError> {
        let parsed: PolicyFile = toml::from_str(raw).map_err(|source| PolicyLoadError::Parse {
            path: origin.to_string(),
            source,
        })?;
        let invalid = |reason: String| PolicyLoadError::Invalid {
            path: origin.to_string(),
            reason,
        };

        for (path, block) in &parsed.managed_sections {
            if !COMPLIANCE_ORDER.contains(&block.as_str()) {
                return Err(invalid(format!(
                    "managed section {path} names unknown block '{block}'"
                )));
            }
        }

        let mut line_rules = Vec::with_capacity(parsed.line_rule.len());
        for row in parsed.line_rule {
            if row.matchers.is_empty() {
                return Err(invalid(format!("rule {} has no matchers", row.name)));
            }
            let classification = match row.classification {
                RuleClass::Managed => {
                    let Some(block) = row.block.as_deref() else {
                        return Err(invalid(format!("managed rule {} needs a block", row.name)));
                    };
                    if !COMPLIANCE_ORDER.contains(&block) {
                        return Err(invalid(format!(
                            "rule {} names unknown block '{block}'",
                            row.name
                        )));
                    }
                    Classification::Managed
                }
                RuleClass::SiteSpecific => {
                    if row.block.is_some() {
                        return Err(invalid(format!(
                            "site-specific rule {} cannot name a block",
                            row.name
                        )));
                    }
                    Classification::SiteSpecific
                }
            };
            line_rules.push(LineRule {
                name: row.name,
                section: normalize_path(&row.section),
                matchers: row.matchers,
                classification,
                block: row.block,
            });
        }

        Ok(Self {
            managed_sections: parsed
                .managed_sections
                .into_iter()
                .map(|(path, block)| (normalize_path(&path), block))
                .collect(),
            line_rules,
        })
    }

    /// Block key of a wholly managed section.
    pub fn managed_section(&self, path: &str) -> Option<&str> {
        self.managed_sections.get(path).map(String::as_str)
    }

    /// First rule matching the line, if any.
    pub fn match_line(&self, section_path: &str, line: &str) -> Option<&LineRule> {
        self.line_rules
            .iter()
            .find(|rule| rule.matches(section_path, line))
    }
}

fn normalize_path(path: &str) -> String {
    path.split_whitespace().collect::<Vec<_>>().join(" ")
}
