use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use super::{PortAssignment, PortMapping};
use crate::error::EngineError;
use crate::profile::{DeviceProfile, PhysicalClass, PortPurpose, PortSpec};
use crate::warning::Warning;

/// Map referenced source ports onto the target profile.
///
/// Order of precedence: management 1:1, names already valid on the target,
/// purpose-tagged ports, then everything else in input order. Each port walks
/// pools upward from its own class; lower pools are a last resort. Ports that
/// find no slot are returned in `unmapped`.
pub fn resolve(
    referenced: &[String],
    source: &DeviceProfile,
    target: &DeviceProfile,
    purposes: &BTreeMap<String, PortPurpose>,
) -> Result<PortMapping, EngineError> {
    let mut mapping = PortMapping::default();
    let mut used: BTreeSet<&str> = BTreeSet::new();
    used.insert(target.management.name.as_str());

    let class_of = |name: &str| {
        source
            .port(name)
            .map(|p| p.class)
            .unwrap_or(PhysicalClass::Copper)
    };

    if referenced.iter().any(|r| *r == source.management.name) {
        mapping.assignments.push(PortAssignment {
            source_port: source.management.name.clone(),
            target_port: target.management.name.clone(),
            already_in_target_format: source.management.name == target.management.name,
            source_class: source.management.class,
            target_class: target.management.class,
            purpose: None,
        });
    }

    let pending: Vec<&String> = referenced
        .iter()
        .filter(|r| **r != source.management.name)
        .collect();

    let reserved: BTreeSet<&str> = pending
        .iter()
        .filter_map(|r| target.pool_ports().find(|p| p.name == **r))
        .map(|p| p.name.as_str())
        .collect();
    for name in reserved.iter().copied() {
        let Some(spec) = target.port(name) else {
            continue;
        };
        used.insert(spec.name.as_str());
        mapping.assignments.push(PortAssignment {
            source_port: spec.name.clone(),
            target_port: spec.name.clone(),
            already_in_target_format: true,
            source_class: class_of(name),
            target_class: spec.class,
            purpose: purposes.get(name).copied(),
        });
    }

    let (tagged, untagged): (Vec<&String>, Vec<&String>) = pending
        .into_iter()
        .filter(|r| !reserved.contains(r.as_str()))
        .partition(|r| purposes.contains_key(r.as_str()));

    let tagged_purposes: BTreeSet<PortPurpose> = tagged
        .iter()
        .filter_map(|r| purposes.get(r.as_str()).copied())
        .collect();
    let all_ranges: BTreeSet<&str> = PortPurpose::ALL
        .iter()
        .flat_map(|p| target.purpose_range(*p))
        .map(String::as_str)
        .collect();

    for name in tagged.into_iter().map(String::as_str) {
        let purpose = purposes.get(name).copied();
        let protected: BTreeSet<&str> = tagged_purposes
            .iter()
            .filter(|p| Some(**p) != purpose)
            .flat_map(|p| target.purpose_range(*p))
            .map(String::as_str)
            .collect();
        let slot = purpose
            .and_then(|p| first_free_in_range(target, p, &used))
            .map(|spec| (spec, false))
            .or_else(|| walk(target, class_of(name), &used, &all_ranges, &protected));
        place(&mut mapping, &mut used, name, class_of(name), purpose, slot);
    }

    let nothing = BTreeSet::new();
    for name in untagged.into_iter().map(String::as_str) {
        let slot = walk(target, class_of(name), &used, &all_ranges, &nothing);
        place(&mut mapping, &mut used, name, class_of(name), None, slot);
    }

    ensure_injective(&mapping)?;
    debug!(
        mapped = mapping.assignments.len(),
        unmapped = mapping.unmapped.len(),
        "resolved port mapping"
    );
    Ok(mapping)
}

fn place<'t>(
    mapping: &mut PortMapping,
    used: &mut BTreeSet<&'t str>,
    source_port: &str,
    source_class: PhysicalClass,
    purpose: Option<PortPurpose>,
    slot: Option<(&'t PortSpec, bool)>,
) {
    let Some((spec, downgraded)) = slot else {
        warn!(port = source_port, "no free target slot");
        mapping.unmapped.push(source_port.to_string());
        return;
    };
    used.insert(spec.name.as_str());
    if downgraded {
        mapping.warnings.push(Warning::PortDowngraded {
            source: source_port.to_string(),
            target: spec.name.clone(),
        });
    }
    mapping.assignments.push(PortAssignment {
        source_port: source_port.to_string(),
        target_port: spec.name.clone(),
        already_in_target_format: false,
        source_class,
        target_class: spec.class,
        purpose,
    });
}

fn first_free_in_range<'t>(
    target: &'t DeviceProfile,
    purpose: PortPurpose,
    used: &BTreeSet<&str>,
) -> Option<&'t PortSpec> {
    target
        .purpose_range(purpose)
        .iter()
        .filter(|name| !used.contains(name.as_str()))
        .find_map(|name| target.port(name))
}

/// Pick a slot for a port of `class`.
///
/// Pools at or above the class come first, lowest first, with purpose-range
/// slots only after ordinary ones. Lower pools follow, nearest first, and the
/// returned flag marks that downgrade.
fn walk<'t>(
    target: &'t DeviceProfile,
    class: PhysicalClass,
    used: &BTreeSet<&str>,
    ranges: &BTreeSet<&str>,
    protected: &BTreeSet<&str>,
) -> Option<(&'t PortSpec, bool)> {
    let upward: Vec<&'t PortSpec> = target
        .pools
        .iter()
        .filter(|(group, _)| group.class() >= class)
        .flat_map(|(_, ports)| ports.iter())
        .collect();
    let downward: Vec<&'t PortSpec> = target
        .pools
        .iter()
        .rev()
        .filter(|(group, _)| group.class() < class)
        .flat_map(|(_, ports)| ports.iter())
        .collect();

    let pick = |slots: &[&'t PortSpec]| -> Option<&'t PortSpec> {
        let mut free = slots.iter().copied().filter(|spec| {
            !used.contains(spec.name.as_str()) && !protected.contains(spec.name.as_str())
        });
        let ordinary = free
            .clone()
            .find(|spec| !ranges.contains(spec.name.as_str()));
        ordinary.or_else(|| free.next())
    };

    if let Some(spec) = pick(&upward) {
        return Some((spec, false));
    }
    pick(&downward).map(|spec| (spec, true))
}

fn ensure_injective(mapping: &PortMapping) -> Result<(), EngineError> {
    let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
    for a in &mapping.assignments {
        if let Some(first) = seen.insert(a.target_port.as_str(), a.source_port.as_str()) {
            return Err(EngineError::DuplicateTarget {
                target: a.target_port.clone(),
                first: first.to_string(),
                second: a.source_port.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::{ensure_injective, resolve};
    use crate::error::{EngineError, ModelRole};
    use crate::ports::{PortAssignment, PortMapping};
    use crate::profile::{DeviceProfile, DeviceRegistry, PhysicalClass, PortPurpose};
    use crate::warning::Warning;

    fn registry() -> DeviceRegistry {
        DeviceRegistry::embedded().expect("registry")
    }

    fn profile<'r>(registry: &'r DeviceRegistry, model: &str) -> &'r DeviceProfile {
        registry.profile(model, ModelRole::Target).expect("profile")
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn management_maps_one_to_one() {
        let reg = registry();
        let mapping = resolve(
            &names(&["ether1", "ether2"]),
            profile(&reg, "CCR1072-12G-4S+"),
            profile(&reg, "CCR2004-16G-2S+"),
            &BTreeMap::new(),
        )
        .expect("resolve");
        assert_eq!(mapping.target_of("ether1"), Some("ether1"));
    }

    #[test]
    fn valid_target_names_are_reserved_before_allocation() {
        let reg = registry();
        // ether2 and ether3 both exist on the target; ether3 must not be
        // handed to anything else even though it comes later in input order.
        let mapping = resolve(
            &names(&["sfp-sfpplus3", "ether3", "ether2"]),
            profile(&reg, "CCR1072-12G-4S+"),
            profile(&reg, "CCR2004-16G-2S+"),
            &BTreeMap::new(),
        )
        .expect("resolve");
        assert_eq!(mapping.target_of("ether3"), Some("ether3"));
        assert_eq!(mapping.target_of("ether2"), Some("ether2"));
        assert!(mapping.get("ether2").expect("ether2").already_in_target_format);
        assert_eq!(mapping.target_of("sfp-sfpplus3"), Some("sfp-sfpplus1"));
    }

    #[test]
    fn mapping_stays_injective_under_pressure() {
        let reg = registry();
        let source = profile(&reg, "CCR1072-12G-4S+");
        let referenced: Vec<String> = source.port_names().map(str::to_string).collect();
        let mapping = resolve(
            &referenced,
            source,
            profile(&reg, "CCR2216-1G-12XS-2XQ"),
            &BTreeMap::new(),
        )
        .expect("resolve");
        let targets: BTreeSet<&str> = mapping
            .assignments
            .iter()
            .map(|a| a.target_port.as_str())
            .collect();
        assert_eq!(targets.len(), mapping.assignments.len());
        // 15 pool ports onto 14 slots: the last 10G port has nowhere to go
        assert_eq!(mapping.assignments.len(), 15);
        assert_eq!(mapping.unmapped, vec!["sfp-sfpplus4".to_string()]);
    }

    #[test]
    fn purposes_draw_from_dedicated_ranges() {
        let reg = registry();
        let mut purposes = BTreeMap::new();
        purposes.insert("ether3".to_string(), PortPurpose::Olt);
        purposes.insert("sfp-sfpplus1".to_string(), PortPurpose::Backhaul);
        purposes.insert("sfp-sfpplus2".to_string(), PortPurpose::SwitchUplink);
        let mapping = resolve(
            &names(&["ether1", "ether2", "ether3", "ether4", "sfp-sfpplus1", "sfp-sfpplus2"]),
            profile(&reg, "CCR1072-12G-4S+"),
            profile(&reg, "CCR2216-1G-12XS-2XQ"),
            &purposes,
        )
        .expect("resolve");
        assert_eq!(mapping.target_of("ether3"), Some("sfp28-11"));
        assert_eq!(mapping.target_of("sfp-sfpplus1"), Some("sfp28-1"));
        assert_eq!(mapping.target_of("sfp-sfpplus2"), Some("sfp28-3"));
        // untagged ports avoid purpose ranges while ordinary slots remain
        assert_eq!(mapping.target_of("ether2"), Some("sfp28-5"));
        assert_eq!(mapping.target_of("ether4"), Some("sfp28-6"));
    }

    #[test]
    fn full_pool_overflows_upward() {
        let reg = registry();
        let source = profile(&reg, "CRS518-16XS-2XQ");
        let referenced: Vec<String> = (1..=14).map(|n| format!("sfp28-{n}")).collect();
        let mapping = resolve(
            &referenced,
            source,
            profile(&reg, "CCR2216-1G-12XS-2XQ"),
            &BTreeMap::new(),
        )
        .expect("resolve");
        assert_eq!(mapping.target_of("sfp28-13"), Some("qsfp28-1-1"));
        assert_eq!(mapping.target_of("sfp28-14"), Some("qsfp28-2-1"));
        assert_eq!(
            mapping.get("sfp28-13").map(|a| a.target_class),
            Some(PhysicalClass::Optical100g)
        );
        assert!(mapping.warnings.is_empty());
    }

    #[test]
    fn lower_pool_is_last_resort_with_warning() {
        let reg = registry();
        let mapping = resolve(
            &names(&["sfp-sfpplus1"]),
            profile(&reg, "CCR1072-12G-4S+"),
            profile(&reg, "CCR1036-12G-4S"),
            &BTreeMap::new(),
        )
        .expect("resolve");
        assert_eq!(mapping.target_of("sfp-sfpplus1"), Some("sfp1"));
        assert!(matches!(
            mapping.warnings.as_slice(),
            [Warning::PortDowngraded { .. }]
        ));
    }

    #[test]
    fn exhaustion_leaves_ports_unmapped() {
        let reg = registry();
        let source = profile(&reg, "CRS326-24G-2S+");
        let referenced: Vec<String> = (2..=24).map(|n| format!("ether{n}")).collect();
        let mapping = resolve(
            &referenced,
            source,
            profile(&reg, "RB5009UG+S+IN"),
            &BTreeMap::new(),
        )
        .expect("resolve");
        // 7 copper + 1 sfp-sfpplus slot on the target
        assert_eq!(mapping.assignments.len(), 8);
        assert_eq!(mapping.unmapped.len(), 15);
        assert_eq!(mapping.unmapped.first().map(String::as_str), Some("ether10"));
    }

    #[test]
    fn duplicate_target_is_fatal() {
        let assignment = |source: &str| PortAssignment {
            source_port: source.to_string(),
            target_port: "sfp28-1".to_string(),
            already_in_target_format: false,
            source_class: PhysicalClass::Copper,
            target_class: PhysicalClass::Optical25g,
            purpose: None,
        };
        let mapping = PortMapping {
            assignments: vec![assignment("ether2"), assignment("ether3")],
            ..PortMapping::default()
        };
        assert!(matches!(
            ensure_injective(&mapping),
            Err(EngineError::DuplicateTarget { .. })
        ));
    }
}
