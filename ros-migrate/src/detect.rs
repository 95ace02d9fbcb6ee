use ros_export_core::tokens::value_of;
use ros_export_core::ConfigDocument;
use serde::Serialize;

/// Detected configuration family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Vendor {
    /// RouterOS `/export` output.
    RouterOs,
    /// Tarana radio configuration. Exempt from translation and compliance.
    Tarana,
    /// Anything else.
    Unknown,
}

impl Vendor {
    pub fn is_exempt(self) -> bool {
        matches!(self, Vendor::Tarana)
    }

    pub fn label(self) -> &'static str {
        match self {
            Vendor::RouterOs => "RouterOS",
            Vendor::Tarana => "Tarana",
            Vendor::Unknown => "unknown",
        }
    }
}

const HEADER_SCAN_LINES: usize = 12;

/// Detect the vendor from raw text.
///
/// Tarana files are recognized by their header comments rather than syntax,
/// since their body can look like anything.
pub fn detect_vendor(raw: &str) -> Vendor {
    let header = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(HEADER_SCAN_LINES)
        .take_while(|line| line.starts_with('#'));

    for line in header {
        let body = line.trim_start_matches('#').trim();
        let lower = body.to_ascii_lowercase();
        if lower.contains("tarana") {
            return Vendor::Tarana;
        }
        if let Some((key, value)) = body.split_once(':') {
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim().to_ascii_uppercase();
            if key == "device-type" && (value == "BN" || value == "RN") {
                return Vendor::Tarana;
            }
        }
        if lower.contains("by routeros") {
            return Vendor::RouterOs;
        }
    }

    if raw.lines().any(|line| line.trim_start().starts_with('/')) {
        Vendor::RouterOs
    } else {
        Vendor::Unknown
    }
}

/// Model from the `# model = ...` export header.
pub fn detect_model(doc: &ConfigDocument) -> Option<String> {
    doc.preamble_value("model")
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

/// Firmware version from the `# ... by RouterOS X.Y.Z` export header.
pub fn detect_firmware(doc: &ConfigDocument) -> Option<String> {
    doc.preamble.iter().find_map(|line| {
        let idx = line.find("by RouterOS")?;
        line[idx + "by RouterOS".len()..]
            .split_whitespace()
            .next()
            .map(str::to_string)
    })
}

/// Address of the first loopback interface found under `/ip address`.
pub fn detect_loopback(doc: &ConfigDocument) -> Option<String> {
    doc.sections_at("/ip address")
        .into_iter()
        .flat_map(|section| section.entries())
        .find_map(|line| {
            let interface = value_of(&line.text, "interface")?;
            if !is_loopback_name(&interface) {
                return None;
            }
            let address = value_of(&line.text, "address")?;
            let ip = address.split('/').next().unwrap_or(&address);
            Some(ip.to_string())
        })
}

fn is_loopback_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    if lower.starts_with("loop") {
        return true;
    }
    lower
        .strip_prefix("lo")
        .is_some_and(|rest| rest.chars().all(|c| c.is_ascii_digit()))
}
