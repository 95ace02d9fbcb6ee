//! Compliance Block Source: the NOC-mandated configuration appended to every
//! translated export.
//!
//! Blocks come from a remote script (cached with a TTL) and fall back to a
//! built-in copy whenever the remote cannot be used.

pub mod cache;
pub mod fallback;
pub mod headers;
pub mod provider;

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::merge::{BLOCK_PREFIX, COMPLIANCE_MARKER};
use crate::warning::Warning;
pub use cache::{TtlCache, DEFAULT_TTL};
pub use fallback::{FALLBACK_BLOCKS, FALLBACK_VERSION};
pub use headers::{canonical_key, detect_header, HeaderRule};
pub use provider::{FetchError, HttpScriptProvider, ScriptProvider};

/// Canonical order of compliance blocks in merged output.
pub const COMPLIANCE_ORDER: [&str; 10] = [
    "firewall_address_list",
    "firewall_filter_input",
    "firewall_service_port",
    "ip_service",
    "dns",
    "ntp",
    "snmp",
    "radius",
    "user_aaa",
    "logging",
];

/// Placeholder replaced with the device loopback address.
pub const LOOPBACK_TOKEN: &str = "{{LOOP_IP}}";

/// Where a block set came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockOrigin {
    Remote { path: String },
    Fallback { version: String },
}

impl Display for BlockOrigin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BlockOrigin::Remote { path } => write!(f, "remote:{path}"),
            BlockOrigin::Fallback { version } => write!(f, "fallback:{version}"),
        }
    }
}

/// Compliance blocks keyed and ordered by [`COMPLIANCE_ORDER`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceBlockSet {
    blocks: Vec<(&'static str, String)>,
    origin: BlockOrigin,
    warnings: Vec<Warning>,
}

impl ComplianceBlockSet {
    /// Build from any key -> text map. Keys outside the canonical list and
    /// blank blocks are dropped.
    pub fn new(blocks: BTreeMap<&str, String>, origin: BlockOrigin) -> Self {
        let blocks = COMPLIANCE_ORDER
            .iter()
            .filter_map(|key| {
                let text = blocks.get(key)?;
                (!text.trim().is_empty()).then(|| (*key, text.clone()))
            })
            .collect();
        Self {
            blocks,
            origin,
            warnings: Vec::new(),
        }
    }

    /// The built-in blocks.
    pub fn fallback() -> Self {
        let blocks = FALLBACK_BLOCKS
            .iter()
            .map(|(key, text)| (*key, text.to_string()))
            .collect();
        Self::new(
            blocks,
            BlockOrigin::Fallback {
                version: FALLBACK_VERSION.to_string(),
            },
        )
    }

    /// Parse a compliance script into blocks by its header comments.
    ///
    /// Lines belong to the most recent header that folds to a known key.
    /// Headers with no known key stay in the current block as comments, and
    /// anything before the first keyed header is dropped. Compliance marker
    /// and `# compliance: <key>` lines from merged output are never content;
    /// the latter open their block like a header.
    pub fn parse_script(raw: &str, origin: BlockOrigin) -> Self {
        let mut lines: BTreeMap<&'static str, Vec<&str>> = BTreeMap::new();
        let mut current: Option<&'static str> = None;

        for line in raw.lines() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            let trimmed = line.trim();
            if trimmed.eq_ignore_ascii_case(COMPLIANCE_MARKER) {
                continue;
            }
            if let Some(key) = trimmed.strip_prefix(BLOCK_PREFIX.trim_end()) {
                let key = key.trim();
                if let Some(known) = COMPLIANCE_ORDER.iter().copied().find(|k| *k == key) {
                    current = Some(known);
                }
                continue;
            }
            if let Some(header) = detect_header(line) {
                if let Some(key) = canonical_key(&header.text) {
                    debug!(rule = header.rule.name(), key, "compliance header");
                    current = Some(key);
                    continue;
                }
            }
            if let Some(key) = current {
                lines.entry(key).or_default().push(line);
            }
        }

        let blocks = lines
            .into_iter()
            .map(|(key, body)| (key, trim_blank_edges(&body).join("\n")))
            .collect();
        Self::new(blocks, origin)
    }

    /// Substitute the loopback placeholder in every block.
    ///
    /// Without an address the placeholder stays and each affected block
    /// gets a warning.
    pub fn with_loopback(mut self, loopback: Option<&str>) -> Self {
        for (key, text) in &mut self.blocks {
            if !text.contains(LOOPBACK_TOKEN) {
                continue;
            }
            match loopback {
                Some(ip) => *text = text.replace(LOOPBACK_TOKEN, ip),
                None => self.warnings.push(Warning::MissingLoopback {
                    block: (*key).to_string(),
                }),
            }
        }
        self
    }

    fn with_warning(mut self, warning: Warning) -> Self {
        self.warnings.insert(0, warning);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.blocks
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, text)| text.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Blocks in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.blocks.iter().map(|(k, t)| (*k, t.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.blocks.iter().map(|(k, _)| *k)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn origin(&self) -> &BlockOrigin {
        &self.origin
    }

    /// Findings raised while producing the set (fallback, missing loopback).
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

fn trim_blank_edges<'a>(lines: &[&'a str]) -> Vec<&'a str> {
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(start), Some(end)) => lines[start..=end].to_vec(),
        _ => Vec::new(),
    }
}

/// Two-tier compliance source: cached remote script, then built-in blocks.
pub struct ComplianceSource {
    provider: Option<Arc<dyn ScriptProvider>>,
    path: String,
    cache: TtlCache<String, String>,
}

impl ComplianceSource {
    pub fn new(provider: Arc<dyn ScriptProvider>, path: impl Into<String>, ttl: Duration) -> Self {
        Self {
            provider: Some(provider),
            path: path.into(),
            cache: TtlCache::new(ttl),
        }
    }

    /// No remote; every fetch uses the built-in blocks.
    pub fn offline() -> Self {
        Self {
            provider: None,
            path: String::new(),
            cache: TtlCache::new(DEFAULT_TTL),
        }
    }

    pub fn is_offline(&self) -> bool {
        self.provider.is_none()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn provider(&self) -> Option<&dyn ScriptProvider> {
        self.provider.as_deref()
    }

    /// Drop every cached script so the next fetch goes to the remote.
    pub fn refresh(&self) {
        self.cache.clear();
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    /// Fetch, parse and personalize the compliance blocks.
    ///
    /// Any remote failure, including a script with no recognizable blocks,
    /// falls back to the built-in set with a warning.
    pub fn fetch_blocks(&self, loopback: Option<&str>) -> Result<ComplianceBlockSet, EngineError> {
        let set = match self.fetch_remote() {
            Ok(set) => set,
            Err(reason) => {
                if self.provider.is_some() {
                    warn!(%reason, "using built-in compliance blocks");
                }
                let fallback = ComplianceBlockSet::fallback();
                if fallback.is_empty() {
                    return Err(EngineError::ComplianceUnavailable(format!(
                        "{reason}; built-in blocks are empty"
                    )));
                }
                if self.provider.is_some() {
                    fallback.with_warning(Warning::ComplianceFallback { reason })
                } else {
                    fallback
                }
            }
        };
        Ok(set.with_loopback(loopback))
    }

    fn fetch_remote(&self) -> Result<ComplianceBlockSet, String> {
        let Some(provider) = &self.provider else {
            return Err("offline".to_string());
        };
        let raw = self
            .cache
            .get_or_try_insert_with(self.path.clone(), || {
                let bytes = provider.fetch_raw(&self.path)?;
                Ok::<_, FetchError>(String::from_utf8(bytes)?)
            })
            .map_err(|e| e.to_string())?;

        let set = ComplianceBlockSet::parse_script(
            &raw,
            BlockOrigin::Remote {
                path: self.path.clone(),
            },
        );
        if set.is_empty() {
            return Err(format!("{} contains no compliance blocks", self.path));
        }
        Ok(set)
    }
}
