//! Device Profile Registry: model -> management port and ordered port pools.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{EngineError, ModelRole};

/// Physical medium and rate class of a port.
///
/// Ordered by capacity: a pool "at or above" a port's class can host it
/// without a downgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhysicalClass {
    Copper,
    #[serde(rename = "optical_1g")]
    Optical1g,
    #[serde(rename = "optical_10g")]
    Optical10g,
    #[serde(rename = "optical_25g")]
    Optical25g,
    #[serde(rename = "optical_100g")]
    Optical100g,
}

impl PhysicalClass {
    pub fn is_optical(self) -> bool {
        !matches!(self, PhysicalClass::Copper)
    }
}

impl Display for PhysicalClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PhysicalClass::Copper => "copper",
            PhysicalClass::Optical1g => "optical_1g",
            PhysicalClass::Optical10g => "optical_10g",
            PhysicalClass::Optical25g => "optical_25g",
            PhysicalClass::Optical100g => "optical_100g",
        })
    }
}

/// Named pool of identical ports. Declaration order is allocation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolGroup {
    #[serde(rename = "ethernet_1g")]
    Ethernet1g,
    #[serde(rename = "sfp_1g")]
    Sfp1g,
    #[serde(rename = "sfp_plus_10g")]
    SfpPlus10g,
    #[serde(rename = "sfp28_25g")]
    Sfp28_25g,
    #[serde(rename = "qsfp28_100g")]
    Qsfp28_100g,
    Management,
}

impl PoolGroup {
    pub fn class(self) -> PhysicalClass {
        match self {
            PoolGroup::Ethernet1g | PoolGroup::Management => PhysicalClass::Copper,
            PoolGroup::Sfp1g => PhysicalClass::Optical1g,
            PoolGroup::SfpPlus10g => PhysicalClass::Optical10g,
            PoolGroup::Sfp28_25g => PhysicalClass::Optical25g,
            PoolGroup::Qsfp28_100g => PhysicalClass::Optical100g,
        }
    }
}

impl Display for PoolGroup {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PoolGroup::Ethernet1g => "ethernet_1g",
            PoolGroup::Sfp1g => "sfp_1g",
            PoolGroup::SfpPlus10g => "sfp_plus_10g",
            PoolGroup::Sfp28_25g => "sfp28_25g",
            PoolGroup::Qsfp28_100g => "qsfp28_100g",
            PoolGroup::Management => "management",
        })
    }
}

/// What a port is used for, when known. Tagged ports draw from dedicated
/// slot ranges on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortPurpose {
    SwitchUplink,
    Backhaul,
    Olt,
}

impl PortPurpose {
    pub const ALL: [PortPurpose; 3] = [
        PortPurpose::SwitchUplink,
        PortPurpose::Backhaul,
        PortPurpose::Olt,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "switch_uplink" | "switch" | "uplink" => Some(PortPurpose::SwitchUplink),
            "backhaul" | "bh" => Some(PortPurpose::Backhaul),
            "olt" => Some(PortPurpose::Olt),
            _ => None,
        }
    }
}

impl Display for PortPurpose {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PortPurpose::SwitchUplink => "switch_uplink",
            PortPurpose::Backhaul => "backhaul",
            PortPurpose::Olt => "olt",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortSpec {
    pub name: String,
    pub class: PhysicalClass,
    pub pool: PoolGroup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceProfile {
    pub model: String,
    pub management: PortSpec,
    /// Pools in allocation order.
    pub pools: Vec<(PoolGroup, Vec<PortSpec>)>,
    pub purpose_ranges: BTreeMap<PortPurpose, Vec<String>>,
    pub total_ports: usize,
}

impl DeviceProfile {
    /// Look up any port of this device, management included.
    pub fn port(&self, name: &str) -> Option<&PortSpec> {
        if self.management.name == name {
            return Some(&self.management);
        }
        self.pool_ports().find(|p| p.name == name)
    }

    pub fn has_port(&self, name: &str) -> bool {
        self.port(name).is_some()
    }

    /// Every pool port in allocation order, management excluded.
    pub fn pool_ports(&self) -> impl Iterator<Item = &PortSpec> {
        self.pools.iter().flat_map(|(_, ports)| ports.iter())
    }

    /// Every port name, management first.
    pub fn port_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.management.name.as_str())
            .chain(self.pool_ports().map(|p| p.name.as_str()))
    }

    pub fn purpose_range(&self, purpose: PortPurpose) -> &[String] {
        self.purpose_ranges
            .get(&purpose)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Errors returned when loading a registry table.
#[derive(Debug, Error)]
pub enum RegistryLoadError {
    #[error("failed to read device registry {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse device registry {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid device registry {path}: {reason}")]
    Invalid { path: String, reason: String },
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    device: Vec<DeviceRow>,
}

#[derive(Debug, Deserialize)]
struct DeviceRow {
    model: String,
    management: String,
    #[serde(default)]
    pool: Vec<PoolRow>,
    #[serde(default)]
    purpose_ranges: BTreeMap<PortPurpose, Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct PoolRow {
    group: PoolGroup,
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    first: Option<u32>,
    #[serde(default)]
    last: Option<u32>,
    #[serde(default)]
    names: Vec<String>,
}

/// Static catalog of device models.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    profiles: BTreeMap<String, DeviceProfile>,
}

impl DeviceRegistry {
    /// Registry compiled into the binary.
    pub fn embedded() -> Result<Self, RegistryLoadError> {
        let raw = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/profiles/devices.toml"));
        Self::from_toml(raw, "embedded registry")
    }

    pub fn from_file(path: &Path) -> Result<Self, RegistryLoadError> {
        let raw = fs::read_to_string(path).map_err(|source| RegistryLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&raw, &path.display().to_string())
    }

    /// Load from `path` when given, else the embedded table. Returns the
    /// registry and a description of where it came from.
    pub fn load(path: Option<&Path>) -> Result<(Self, String), RegistryLoadError> {
        match path {
            Some(path) => Ok((Self::from_file(path)?, format!("file:{}", path.display()))),
            None => Ok((Self::embedded()?, "embedded".to_string())),
        }
    }

    pub fn from_toml(raw: &str, origin: &str) -> Result<Self, RegistryLoadError> {
        let parsed: RegistryFile = toml::from_str(raw).map_err(|source| RegistryLoadError::Parse {
            path: origin.to_string(),
            source,
        })?;

        let mut profiles = BTreeMap::new();
        for row in parsed.device {
            let profile = build_profile(row).map_err(|reason| RegistryLoadError::Invalid {
                path: origin.to_string(),
                reason,
            })?;
            let key = normalize_model(&profile.model);
            if profiles.contains_key(&key) {
                return Err(RegistryLoadError::Invalid {
                    path: origin.to_string(),
                    reason: format!("model {} declared twice", profile.model),
                });
            }
            profiles.insert(key, profile);
        }
        Ok(Self { profiles })
    }

    /// Look up a model; unknown models are a fatal error for the caller.
    pub fn profile(&self, model: &str, role: ModelRole) -> Result<&DeviceProfile, EngineError> {
        self.profiles
            .get(&normalize_model(model))
            .ok_or_else(|| EngineError::UnknownModel {
                model: model.to_string(),
                role,
                known: self.models().collect::<Vec<_>>().join(", "),
            })
    }

    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.profiles.values().map(|p| p.model.as_str())
    }

    pub fn profiles(&self) -> impl Iterator<Item = &DeviceProfile> {
        self.profiles.values()
    }
}

fn normalize_model(model: &str) -> String {
    model.trim().to_ascii_uppercase()
}

fn build_profile(row: DeviceRow) -> Result<DeviceProfile, String> {
    let mut pools: Vec<(PoolGroup, Vec<PortSpec>)> = Vec::new();
    let mut seen = BTreeSet::new();
    seen.insert(row.management.clone());

    let mut rows = row.pool;
    rows.sort_by_key(|p| p.group);
    for pool in rows {
        if pool.group == PoolGroup::Management {
            return Err(format!(
                "{}: management is not a pool group; use the management field",
                row.model
            ));
        }
        if pools.iter().any(|(group, _)| *group == pool.group) {
            return Err(format!("{}: pool {} declared twice", row.model, pool.group));
        }
        let names = expand_pool(&pool).map_err(|e| format!("{}: {e}", row.model))?;
        let mut ports = Vec::with_capacity(names.len());
        for name in names {
            if !seen.insert(name.clone()) {
                return Err(format!("{}: port {name} declared twice", row.model));
            }
            ports.push(PortSpec {
                name,
                class: pool.group.class(),
                pool: pool.group,
            });
        }
        pools.push((pool.group, ports));
    }

    for (purpose, names) in &row.purpose_ranges {
        if let Some(missing) = names.iter().find(|n| !seen.contains(*n) || **n == row.management)
        {
            return Err(format!(
                "{}: {purpose} range names {missing}, which is not a pool port",
                row.model
            ));
        }
    }

    let total_ports = pools.iter().map(|(_, ports)| ports.len()).sum();
    Ok(DeviceProfile {
        management: PortSpec {
            name: row.management,
            class: PhysicalClass::Copper,
            pool: PoolGroup::Management,
        },
        model: row.model,
        pools,
        purpose_ranges: row.purpose_ranges,
        total_ports,
    })
}

fn expand_pool(pool: &PoolRow) -> Result<Vec<String>, String> {
    if !pool.names.is_empty() {
        return Ok(pool.names.clone());
    }
    let pattern = pool
        .pattern
        .as_deref()
        .ok_or_else(|| format!("pool {} needs `names` or `pattern`", pool.group))?;
    if !pattern.contains("{n}") {
        return Err(format!("pool {} pattern lacks {{n}}: {pattern}", pool.group));
    }
    let (Some(first), Some(last)) = (pool.first, pool.last) else {
        return Err(format!("pool {} pattern needs first and last", pool.group));
    };
    if first > last {
        return Err(format!("pool {} has first > last", pool.group));
    }
    Ok((first..=last)
        .map(|n| pattern.replace("{n}", &n.to_string()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{DeviceRegistry, PhysicalClass, PoolGroup, PortPurpose, RegistryLoadError};
    use crate::error::{EngineError, ModelRole};

    #[test]
    fn embedded_registry_loads() {
        let registry = DeviceRegistry::embedded().expect("embedded registry");
        assert!(registry.models().any(|m| m == "CCR2216-1G-12XS-2XQ"));
    }

    #[test]
    fn total_ports_is_sum_of_pools() {
        let registry = DeviceRegistry::embedded().expect("embedded registry");
        let profile = registry
            .profile("CCR1072-12G-4S+", ModelRole::Source)
            .expect("known model");
        assert_eq!(profile.total_ports, 11 + 4);
        assert_eq!(profile.management.name, "ether1");
        assert!(!profile.pool_ports().any(|p| p.name == "ether1"));
    }

    #[test]
    fn pools_follow_group_order_regardless_of_declaration() {
        let raw = r#"
[[device]]
model = "TEST-1"
management = "ether1"

[[device.pool]]
group = "sfp28_25g"
pattern = "sfp28-{n}"
first = 1
last = 2

[[device.pool]]
group = "ethernet_1g"
pattern = "ether{n}"
first = 2
last = 3
"#;
        let registry = DeviceRegistry::from_toml(raw, "test").expect("registry");
        let profile = registry.profile("test-1", ModelRole::Target).expect("profile");
        let groups: Vec<PoolGroup> = profile.pools.iter().map(|(g, _)| *g).collect();
        assert_eq!(groups, vec![PoolGroup::Ethernet1g, PoolGroup::Sfp28_25g]);
        assert_eq!(
            profile.port("sfp28-2").map(|p| p.class),
            Some(PhysicalClass::Optical25g)
        );
    }

    #[test]
    fn unknown_model_lists_known_models() {
        let registry = DeviceRegistry::embedded().expect("embedded registry");
        let err = registry
            .profile("RB951", ModelRole::Target)
            .expect_err("unknown");
        match err {
            EngineError::UnknownModel { model, role, known } => {
                assert_eq!(model, "RB951");
                assert_eq!(role, ModelRole::Target);
                assert!(known.contains("CCR1072-12G-4S+"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_duplicate_port_names() {
        let raw = r#"
[[device]]
model = "DUP"
management = "ether1"

[[device.pool]]
group = "ethernet_1g"
names = ["ether1"]
"#;
        let err = DeviceRegistry::from_toml(raw, "test").expect_err("duplicate");
        assert!(matches!(err, RegistryLoadError::Invalid { .. }));
    }

    #[test]
    fn rejects_purpose_range_outside_pools() {
        let raw = r#"
[[device]]
model = "BAD-RANGE"
management = "ether1"

[[device.pool]]
group = "ethernet_1g"
pattern = "ether{n}"
first = 2
last = 4

[device.purpose_ranges]
olt = ["sfp1"]
"#;
        let err = DeviceRegistry::from_toml(raw, "test").expect_err("bad range");
        assert!(err.to_string().contains("olt"));
    }

    #[test]
    fn purpose_parse_accepts_aliases() {
        assert_eq!(PortPurpose::parse("BH"), Some(PortPurpose::Backhaul));
        assert_eq!(
            PortPurpose::parse("switch-uplink"),
            Some(PortPurpose::SwitchUplink)
        );
        assert_eq!(PortPurpose::parse("lan"), None);
    }
}
