//! Crate-wide error composition.
//!
//! Each component owns a narrow `thiserror` enum (`ManifestError`, `InsightsError`,
//! `ResolverError`, `ClassifierError`); [`CoreError`] composes them the way
//! `ResolverError` composes `NpmError`/`PypiError` in the teacher crate.

use thiserror::Error;

use crate::classifier::ClassifierError;
use crate::manifest::ManifestError;
use crate::resolver::ResolverError;

/// Top-level error returned by [`crate::LicenseAuditor::check`].
#[derive(Debug, Error)]
pub enum CoreError {
    /// Manifest discovery/parsing failed in a way that aborts the whole run.
    ///
    /// Per-file parse failures do not reach here; they are captured as
    /// caveats. This variant is reserved for configuration-level failures
    /// (e.g. an unreadable project root).
    #[error("manifest discovery failed: {0}")]
    Manifest(#[from] ManifestError),

    /// The resolution engine could not complete a run.
    #[error("dependency resolution failed: {0}")]
    Resolver(#[from] ResolverError),

    /// The classifier's policy configuration was invalid.
    #[error("license policy error: {0}")]
    Classifier(#[from] ClassifierError),

    /// The configuration handed to the core failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
