//! Typed, validated configuration accepted by [`crate::LicenseAuditor`].
//!
//! Mirrors the teacher's `ConfigParser`/`Config` split in `utils/config.rs`:
//! a `serde`-deserializable struct plus a `validate()` method the caller
//! invokes explicitly, rather than validating implicitly during
//! deserialization. Reading this from TOML/JSON/env is the external
//! adapter's job; the core only accepts an already-parsed value.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::classifier::{ClassifierOptions, LicensePolicy};
use crate::resolver::{PerSystemOptions, ResolverOptions};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    pub licenses: LicensePolicy,
    #[serde(default = "default_true")]
    pub production: bool,
    #[serde(default = "default_true")]
    pub development: bool,
    #[serde(default)]
    pub only_direct: bool,
    #[serde(default)]
    pub per_system: std::collections::HashMap<crate::version::System, PerSystemOptions>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub log: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            licenses: LicensePolicy::default(),
            production: true,
            development: true,
            only_direct: false,
            per_system: std::collections::HashMap::new(),
            cwd: None,
            log: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("at least one of `production`/`development` must be true")]
    NoScopeSelected,
}

impl AuditConfig {
    /// Validates cross-field invariants not expressible through `serde`
    /// alone. A config selecting neither production nor development would
    /// classify nothing, which is always a mistake rather than an intended
    /// empty run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.production && !self.development {
            return Err(ConfigError::NoScopeSelected);
        }
        Ok(())
    }

    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            only_direct: self.only_direct,
            production: self.production,
            development: self.development,
            per_system: self.per_system.clone(),
        }
    }

    pub fn classifier_options(&self) -> ClassifierOptions {
        ClassifierOptions {
            production: self.production,
            development: self.development,
            only_direct: self.only_direct,
            per_system: self.per_system.clone(),
        }
    }
}
