use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

/// A RouterOS version such as `7.19.4`, `6.49.10` or `7.20beta2`.
///
/// Ordering is numeric on major/minor/patch; a pre-release sorts before the
/// matching release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub pre_release: Option<String>,
}

/// Speed-syntax generation implied by a firmware version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FirmwareEra {
    /// Bare rate tokens such as `1Gbps`.
    Legacy,
    /// Media-typed tokens such as `10G-baseSR-LR`.
    Modern,
}

/// First release that uses modern speed tokens.
pub const MODERN_SPEED_SYNTAX: FirmwareVersion = FirmwareVersion {
    major: 7,
    minor: 12,
    patch: 0,
    pre_release: None,
};

impl FirmwareVersion {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let raw = raw
            .strip_prefix('v')
            .or_else(|| raw.strip_prefix('V'))
            .unwrap_or(raw);
        // "7.16.2 (stable)" style suffixes
        let raw = raw.split_whitespace().next()?;

        let mut numbers = Vec::with_capacity(3);
        let mut pre_release = None;
        for (idx, part) in raw.split('.').enumerate() {
            if idx >= 3 {
                return None;
            }
            let digits_end = part
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(part.len());
            if digits_end == 0 {
                return None;
            }
            numbers.push(part[..digits_end].parse::<u32>().ok()?);
            let rest = &part[digits_end..];
            if !rest.is_empty() {
                if pre_release.is_some() || !rest.chars().all(|c| c.is_ascii_alphanumeric()) {
                    return None;
                }
                pre_release = Some(rest.to_string());
            }
        }
        if numbers.len() < 2 {
            return None;
        }
        Some(Self {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers.get(2).copied().unwrap_or(0),
            pre_release,
        })
    }

    pub fn era(&self) -> FirmwareEra {
        if *self >= MODERN_SPEED_SYNTAX {
            FirmwareEra::Modern
        } else {
            FirmwareEra::Legacy
        }
    }
}

impl PartialOrd for FirmwareVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FirmwareVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre_release, &other.pre_release) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl Display for FirmwareVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre_release {
            f.write_str(pre)?;
        }
        Ok(())
    }
}

impl Display for FirmwareEra {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FirmwareEra::Legacy => f.write_str("legacy"),
            FirmwareEra::Modern => f.write_str("modern"),
        }
    }
}
