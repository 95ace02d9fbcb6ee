//! RouterOS configuration translation and compliance engine.
//!
//! This library migrates RouterOS `/export` output between device models and
//! firmware generations. Port references are remapped onto the target's port
//! layout, `speed=` syntax is rewritten for the target port class and firmware,
//! and NOC-managed content is stripped from the customer body and replaced by
//! one canonically ordered compliance section.
//!
//! # Architecture
//!
//! ## Data
//!
//! - [`profile`] — Device Profile Registry (embedded `profiles/devices.toml`)
//! - [`config`] — Engine configuration file
//! - [`firmware`] — Firmware version parsing and speed-syntax era
//!
//! ## Analysis
//!
//! - [`detect`] — Vendor, model, firmware and loopback detection
//! - [`classify`] — Managed / site-specific tagging from a rule table
//! - [`ports`] — Port reference discovery and injective target allocation
//!
//! ## Transformation
//!
//! - [`speed`] — Speed token translation per port class and era
//! - [`compliance`] — Remote compliance script, TTL cache and built-in fallback
//! - [`merge`] — Strip managed content and append compliance blocks once
//! - [`translate`] — End-to-end orchestration
//!
//! ## Reporting
//!
//! - [`warning`] — Non-fatal findings returned with every result
//! - [`report`] — Terminal rendering
//!
//! # Examples
//!
//! ```ignore
//! use ros_migrate::translate::{TranslationRequest, Translator};
//! use ros_migrate::config::EngineConfig;
//!
//! let translator = Translator::from_config(&EngineConfig::default())?;
//! let export = std::fs::read_to_string("ccr1072.rsc")?;
//! let result = translator.translate(&TranslationRequest::new(export, "CCR2216-1G-12XS-2XQ", "7.16.2"))?;
//! for warning in &result.warnings {
//!     eprintln!("{warning}");
//! }
//! ```
//!
//! # Built on ros-export-core
//!
//! Parsing, writing and `key=value` token handling live in `ros-export-core`.
//! All device and policy knowledge is contained in this crate.

pub mod classify;
pub mod compliance;
pub mod config;
pub mod detect;
pub mod error;
pub mod firmware;
pub mod merge;
pub mod ports;
pub mod profile;
pub mod report;
pub mod speed;
pub mod translate;
pub mod warning;

pub use error::EngineError;
pub use translate::{ComplianceRequest, TranslationRequest, TranslationResult, Translator};
pub use warning::Warning;
