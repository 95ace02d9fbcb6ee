use std::fmt::{self, Display, Formatter};

use serde::Serialize;

/// Non-fatal findings attached to a successful translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum Warning {
    /// No free target slot was left for a referenced source port.
    PortExhaustion { port: String, lines_disabled: usize },
    /// A port was placed on a lower-capacity pool because every equal or
    /// higher pool was full.
    PortDowngraded { source: String, target: String },
    /// A `speed=` value did not match any known token and was left as-is.
    UnparseableSpeedToken { port: String, token: String },
    /// The target firmware version string could not be parsed.
    UnparseableFirmware { value: String },
    /// Remote compliance script could not be used.
    ComplianceFallback { reason: String },
    /// Managed content was kept because the compliance set has no block for it.
    MissingComplianceBlock { section: String, block: String },
    /// A compliance block needs the loopback address but none is known.
    MissingLoopback { block: String },
    /// The input belongs to an exempt vendor and was passed through.
    ExemptPassthrough { vendor: String },
}

impl Warning {
    pub fn code(&self) -> &'static str {
        match self {
            Warning::PortExhaustion { .. } => "port_exhaustion",
            Warning::PortDowngraded { .. } => "port_downgraded",
            Warning::UnparseableSpeedToken { .. } => "unparseable_speed_token",
            Warning::UnparseableFirmware { .. } => "unparseable_firmware",
            Warning::ComplianceFallback { .. } => "compliance_fallback",
            Warning::MissingComplianceBlock { .. } => "missing_compliance_block",
            Warning::MissingLoopback { .. } => "missing_loopback",
            Warning::ExemptPassthrough { .. } => "exempt_passthrough",
        }
    }
}

impl Display for Warning {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Warning::PortExhaustion {
                port,
                lines_disabled,
            } => write!(
                f,
                "port {port} has no free slot on the target; {lines_disabled} line(s) commented out"
            ),
            Warning::PortDowngraded { source, target } => write!(
                f,
                "port {source} placed on lower-capacity port {target}; higher pools exhausted"
            ),
            Warning::UnparseableSpeedToken { port, token } => {
                write!(f, "speed '{token}' on {port} not recognized; left unchanged")
            }
            Warning::UnparseableFirmware { value } => write!(
                f,
                "firmware version '{value}' not recognized; assuming modern speed syntax"
            ),
            Warning::ComplianceFallback { reason } => {
                write!(f, "remote compliance script unavailable ({reason}); using built-in fallback")
            }
            Warning::MissingComplianceBlock { section, block } => write!(
                f,
                "managed content in {section} kept: compliance set has no '{block}' block"
            ),
            Warning::MissingLoopback { block } => write!(
                f,
                "compliance block '{block}' references the loopback address but none was supplied or detected"
            ),
            Warning::ExemptPassthrough { vendor } => {
                write!(f, "{vendor} configuration is exempt; returned unchanged")
            }
        }
    }
}
