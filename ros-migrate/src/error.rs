use thiserror::Error;

use crate::classify::policy::PolicyLoadError;
use crate::profile::RegistryLoadError;

/// Fatal engine errors. Anything recoverable is reported as a
/// [`Warning`](crate::warning::Warning) on the successful result instead.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Source or target model is not in the device registry.
    #[error("unknown device model '{model}' ({role}); known models: {known}")]
    UnknownModel {
        model: String,
        role: ModelRole,
        known: String,
    },
    /// Source export carries no `# model =` line and no model was supplied.
    #[error("source device model not detected; pass it explicitly")]
    SourceModelUndetected,
    /// Compliance was requested but neither the remote nor the fallback source
    /// produced any blocks.
    #[error("compliance blocks unavailable: {0}")]
    ComplianceUnavailable(String),
    /// Merge produced a duplicated marker or block. Output is withheld.
    #[error("compliance merge invariant violated: {0}")]
    ReplayOrDuplicateSection(String),
    /// Port allocation produced two sources on one target. Output is withheld.
    #[error("port mapping is not injective: {target} assigned to {first} and {second}")]
    DuplicateTarget {
        target: String,
        first: String,
        second: String,
    },
    #[error(transparent)]
    Registry(#[from] RegistryLoadError),
    #[error(transparent)]
    Policy(#[from] PolicyLoadError),
}

/// Which side of a translation a model belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    Source,
    Target,
}

impl std::fmt::Display for ModelRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelRole::Source => f.write_str("source"),
            ModelRole::Target => f.write_str("target"),
        }
    }
}
