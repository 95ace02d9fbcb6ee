//! Engine configuration file (`engine.toml`).

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Errors returned when loading or validating engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid config {path}: {reason}")]
    Invalid { path: String, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub compliance: ComplianceSettings,
    pub registry: RegistrySettings,
    pub policy: PolicySettings,
}

/// Where and how to fetch the compliance script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComplianceSettings {
    pub base_url: String,
    pub project: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub path: String,
    /// Name of the environment variable holding the access token.
    pub token_env: String,
    pub ttl_secs: u64,
    pub timeout_secs: u64,
    pub offline: bool,
}

impl Default for ComplianceSettings {
    fn default() -> Self {
        Self {
            base_url: "https://gitlab.example.net".to_string(),
            project: "noc/compliance-standards".to_string(),
            reference: "main".to_string(),
            path: "routeros/compliance.rsc".to_string(),
            token_env: "COMPLIANCE_TOKEN".to_string(),
            ttl_secs: 900,
            timeout_secs: 5,
            offline: false,
        }
    }
}

impl ComplianceSettings {
    /// Access token from the configured environment variable, if set.
    pub fn token(&self) -> Option<String> {
        env::var(&self.token_env).ok().filter(|t| !t.trim().is_empty())
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistrySettings {
    pub profiles_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicySettings {
    pub policy_file: Option<PathBuf>,
}

const MAX_TIMEOUT_SECS: u64 = 30;

impl EngineConfig {
    /// Load from `path`, or defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&raw, &path.display().to_string())
    }

    pub fn from_toml(raw: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;
        config.validate(origin)?;
        Ok(config)
    }

    pub fn validate(&self, origin: &str) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            path: origin.to_string(),
            reason,
        };
        let c = &self.compliance;
        if c.ttl_secs == 0 {
            return Err(invalid("compliance.ttl_secs must be greater than 0".to_string()));
        }
        if !(1..=MAX_TIMEOUT_SECS).contains(&c.timeout_secs) {
            return Err(invalid(format!(
                "compliance.timeout_secs must be between 1 and {MAX_TIMEOUT_SECS}"
            )));
        }
        if !c.offline {
            Url::parse(&c.base_url)
                .map_err(|e| invalid(format!("compliance.base_url '{}': {e}", c.base_url)))?;
            if c.project.trim().is_empty() || c.path.trim().is_empty() {
                return Err(invalid(
                    "compliance.project and compliance.path are required unless offline".to_string(),
                ));
            }
        }
        Ok(())
    }
}
