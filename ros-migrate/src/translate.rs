//! Translate Orchestrator.
//!
//! Wires the engine stages together for one request:
//!
//! 1. **Detect** vendor; exempt vendors are returned untouched
//! 2. **Parse** the export and resolve target then source profiles
//! 3. **Classify** every line against the policy table
//! 4. **Resolve** referenced ports onto the target layout
//! 5. **Fetch** compliance blocks when requested
//! 6. **Rewrite** speeds, then port names, then comment out unmapped ports
//! 7. **Merge** compliance blocks and serialize
//!
//! Only the registry, the policy and the compliance cache outlive a call.

use std::collections::BTreeMap;
use std::sync::Arc;

use ros_export_core::{parse, ConfigDocument};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classify::{classify, ClassificationPolicy, ClassifiedDocument};
use crate::compliance::{BlockOrigin, ComplianceBlockSet, ComplianceSource, HttpScriptProvider};
use crate::config::EngineConfig;
use crate::detect::{detect_loopback, detect_model, detect_vendor, Vendor};
use crate::error::{EngineError, ModelRole};
use crate::firmware::{FirmwareEra, FirmwareVersion};
use crate::merge::{comment_out_unmapped, merge, MergeOptions};
use crate::ports::{
    collect_referenced_ports, infer_purposes, resolve, PortAssignment, PortMapping, PortMatcher,
};
use crate::profile::{DeviceRegistry, PortPurpose};
use crate::speed::rewrite_speeds;
use crate::warning::Warning;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub source_config_text: String,
    pub target_device_model: String,
    pub target_firmware_version: String,
    pub apply_compliance: bool,
    pub strict_preserve: bool,
    /// Overrides the loopback detected from `/ip address`.
    pub loopback_ip: Option<String>,
    /// Overrides the `# model =` line of the export.
    pub source_device_model: Option<String>,
    /// Overrides purposes inferred from interface comments.
    pub port_purposes: BTreeMap<String, PortPurpose>,
}

impl TranslationRequest {
    /// Request with compliance applied and no overrides.
    pub fn new(
        source_config_text: impl Into<String>,
        target_device_model: impl Into<String>,
        target_firmware_version: impl Into<String>,
    ) -> Self {
        Self {
            source_config_text: source_config_text.into(),
            target_device_model: target_device_model.into(),
            target_firmware_version: target_firmware_version.into(),
            apply_compliance: true,
            strict_preserve: false,
            loopback_ip: None,
            source_device_model: None,
            port_purposes: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationResult {
    pub translated_config_text: String,
    pub warnings: Vec<Warning>,
    pub vendor: Vendor,
    pub source_model: Option<String>,
    pub target_model: String,
    pub firmware_era: Option<FirmwareEra>,
    pub port_map: Vec<PortAssignment>,
    pub unmapped: Vec<String>,
    pub compliance_origin: Option<BlockOrigin>,
}

/// Compliance-only run: no port or speed changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComplianceRequest {
    pub config_text: String,
    pub loopback_ip: Option<String>,
    pub strict_preserve: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceResult {
    pub config_text: String,
    pub warnings: Vec<Warning>,
    pub vendor: Vendor,
    pub compliance_origin: Option<BlockOrigin>,
}

/// Long-lived engine state shared by every request.
pub struct Translator {
    registry: DeviceRegistry,
    policy: ClassificationPolicy,
    compliance: ComplianceSource,
}

impl Translator {
    pub fn new(registry: DeviceRegistry, policy: ClassificationPolicy, compliance: ComplianceSource) -> Self {
        Self {
            registry,
            policy,
            compliance,
        }
    }

    /// Build from an engine config, loading override files where set.
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        let (registry, registry_origin) = DeviceRegistry::load(config.registry.profiles_file.as_deref())?;
        let (policy, policy_origin) = ClassificationPolicy::load(config.policy.policy_file.as_deref())?;
        debug!(registry = %registry_origin, policy = %policy_origin, "engine data loaded");

        let settings = &config.compliance;
        let compliance = if settings.offline {
            ComplianceSource::offline()
        } else {
            match HttpScriptProvider::from_settings(settings) {
                Ok(provider) => ComplianceSource::new(Arc::new(provider), &settings.path, settings.ttl()),
                Err(err) => {
                    warn!(%err, "compliance provider unavailable; running offline");
                    ComplianceSource::offline()
                }
            }
        };
        Ok(Self::new(registry, policy, compliance))
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn policy(&self) -> &ClassificationPolicy {
        &self.policy
    }

    pub fn compliance(&self) -> &ComplianceSource {
        &self.compliance
    }

    pub fn translate(&self, request: &TranslationRequest) -> Result<TranslationResult, EngineError> {
        let raw = &request.source_config_text;
        let vendor = detect_vendor(raw);
        if vendor.is_exempt() {
            info!(vendor = vendor.label(), "exempt configuration passed through");
            return Ok(TranslationResult {
                translated_config_text: raw.clone(),
                warnings: vec![exempt_warning(vendor)],
                vendor,
                source_model: None,
                target_model: request.target_device_model.clone(),
                firmware_era: None,
                port_map: Vec::new(),
                unmapped: Vec::new(),
                compliance_origin: None,
            });
        }

        let document = parse(raw);
        let target = self
            .registry
            .profile(&request.target_device_model, ModelRole::Target)?;
        let source_model = request
            .source_device_model
            .clone()
            .or_else(|| detect_model(&document))
            .ok_or(EngineError::SourceModelUndetected)?;
        let source = self.registry.profile(&source_model, ModelRole::Source)?;
        debug!(source = %source.model, target = %target.model, "profiles resolved");

        let mut warnings = Vec::new();
        let era = match FirmwareVersion::parse(&request.target_firmware_version) {
            Some(version) => version.era(),
            None => {
                warnings.push(Warning::UnparseableFirmware {
                    value: request.target_firmware_version.clone(),
                });
                FirmwareEra::Modern
            }
        };
        debug!(%era, "firmware era");

        let loopback = request
            .loopback_ip
            .clone()
            .or_else(|| detect_loopback(&document));
        let mut classified = classify(document, &self.policy, vendor);

        let referenced = collect_referenced_ports(&classified.document, source);
        let mut purposes = infer_purposes(&classified.document, source);
        purposes.extend(
            request
                .port_purposes
                .iter()
                .map(|(port, purpose)| (port.clone(), *purpose)),
        );
        debug!(referenced = referenced.len(), tagged = purposes.len(), "ports collected");

        let mapping = resolve(&referenced, source, target, &purposes)?;
        warnings.extend(mapping.warnings.iter().cloned());

        let blocks = self.fetch_if(request.apply_compliance, loopback.as_deref())?;

        warnings.extend(rewrite_speeds(&mut classified.document, &mapping, era));
        rename_ports(&mut classified.document, &PortMatcher::for_profile(source), &mapping);
        let disabled = comment_out_unmapped(&mut classified.document, &mapping.unmapped);
        for port in &mapping.unmapped {
            let lines_disabled = disabled.get(port).copied().unwrap_or(0);
            warn!(%port, lines_disabled, "port exhausted on target");
            warnings.push(Warning::PortExhaustion {
                port: port.clone(),
                lines_disabled,
            });
        }

        let (text, merge_warnings, origin) = self.merge_and_render(
            classified,
            blocks,
            request.apply_compliance,
            request.strict_preserve,
        )?;
        warnings.extend(merge_warnings);

        info!(
            source = %source.model,
            target = %target.model,
            mapped = mapping.assignments.len(),
            unmapped = mapping.unmapped.len(),
            warnings = warnings.len(),
            "translation complete"
        );
        Ok(TranslationResult {
            translated_config_text: text,
            warnings,
            vendor,
            source_model: Some(source.model.clone()),
            target_model: target.model.clone(),
            firmware_era: Some(era),
            port_map: mapping.assignments,
            unmapped: mapping.unmapped,
            compliance_origin: origin,
        })
    }

    /// Strip managed content and append the compliance blocks, leaving ports
    /// and speeds alone.
    pub fn apply_compliance(&self, request: &ComplianceRequest) -> Result<ComplianceResult, EngineError> {
        let raw = &request.config_text;
        let vendor = detect_vendor(raw);
        if vendor.is_exempt() {
            info!(vendor = vendor.label(), "exempt configuration passed through");
            return Ok(ComplianceResult {
                config_text: raw.clone(),
                warnings: vec![exempt_warning(vendor)],
                vendor,
                compliance_origin: None,
            });
        }

        let document = parse(raw);
        let loopback = request
            .loopback_ip
            .clone()
            .or_else(|| detect_loopback(&document));
        let classified = classify(document, &self.policy, vendor);
        let blocks = self.fetch_if(true, loopback.as_deref())?;
        let (config_text, warnings, origin) =
            self.merge_and_render(classified, blocks, true, request.strict_preserve)?;
        Ok(ComplianceResult {
            config_text,
            warnings,
            vendor,
            compliance_origin: origin,
        })
    }

    fn fetch_if(&self, wanted: bool, loopback: Option<&str>) -> Result<Option<ComplianceBlockSet>, EngineError> {
        if !wanted {
            debug!("compliance not requested; skipping fetch");
            return Ok(None);
        }
        let set = self.compliance.fetch_blocks(loopback)?;
        debug!(origin = %set.origin(), blocks = set.len(), "compliance blocks ready");
        Ok(Some(set))
    }

    fn merge_and_render(
        &self,
        classified: ClassifiedDocument,
        blocks: Option<ComplianceBlockSet>,
        apply_compliance: bool,
        strict_preserve: bool,
    ) -> Result<(String, Vec<Warning>, Option<BlockOrigin>), EngineError> {
        let options = MergeOptions {
            apply_compliance,
            strict_preserve,
        };
        let merged = merge(classified, blocks.as_ref(), options)?;
        let mut warnings: Vec<Warning> = blocks
            .as_ref()
            .map(|set| set.warnings().to_vec())
            .unwrap_or_default();
        warnings.extend(merged.warnings.iter().cloned());
        let origin = merged.compliance.as_ref().map(|set| set.origin().clone());
        Ok((merged.render(), warnings, origin))
    }
}

fn exempt_warning(vendor: Vendor) -> Warning {
    Warning::ExemptPassthrough {
        vendor: vendor.label().to_string(),
    }
}

/// Rename mapped source ports on every entry line.
fn rename_ports(doc: &mut ConfigDocument, matcher: &PortMatcher, mapping: &PortMapping) {
    for section in &mut doc.sections {
        for line in section.lines.iter_mut().filter(|l| l.is_entry()) {
            let renamed = mapping.rewrite(matcher, &matcher.scan_text(line));
            if renamed != line.text {
                line.text = renamed;
            }
        }
    }
}
