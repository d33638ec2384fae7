//! Dependency resolution and SPDX license-policy classification core for a
//! multi-ecosystem SBOM auditor.
//!
//! The crate's public surface is intentionally narrow: construct a
//! [`LicenseAuditor`] with a manifest root, a configuration, and an
//! [`InsightsClient`](insights::InsightsClient) implementation, then call
//! [`LicenseAuditor::check`]. Everything reporter/CLI-specific (flag
//! parsing, output formatting, exit codes, signal handling) lives outside
//! this crate, per the external-adapter boundary.

pub mod classifier;
pub mod clock;
pub mod config;
pub mod error;
pub mod id;
pub mod insights;
pub mod manifest;
pub mod matcher;
pub mod resolver;
pub mod version;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

pub use classifier::AuditResult;
pub use config::AuditConfig;
pub use error::{CoreError, CoreResult};

use classifier::{classify, Caveats};
use clock::{Clock, SystemClock};
use insights::InsightsClient;
use manifest::go::GoReader;
use manifest::maven::MavenReader;
use manifest::npm::NpmReader;
use manifest::pypi::PypiReader;
use manifest::{ManifestReader, MultiReader};
use resolver::ResolutionEngine;

/// The Core's single entry point.
pub struct LicenseAuditor<C: InsightsClient> {
    root: PathBuf,
    config: AuditConfig,
    resolver: ResolutionEngine<C>,
    clock: Arc<dyn Clock>,
}

impl<C: InsightsClient + 'static> LicenseAuditor<C> {
    pub fn new(root: PathBuf, config: AuditConfig, insights_client: Arc<C>) -> Self {
        Self::with_clock(root, config, insights_client, Arc::new(SystemClock))
    }

    pub fn with_clock(
        root: PathBuf,
        config: AuditConfig,
        insights_client: Arc<C>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let resolver_options = config.resolver_options();
        Self {
            root,
            config,
            resolver: ResolutionEngine::new(insights_client, resolver_options),
            clock,
        }
    }

    fn build_reader(&self) -> MultiReader {
        let npm = self.config.per_system.get(&version::System::Npm);
        let maven = self.config.per_system.get(&version::System::Maven);
        let pypi = self.config.per_system.get(&version::System::PyPi);
        let go = self.config.per_system.get(&version::System::Go);

        let readers: Vec<Box<dyn ManifestReader + Send + Sync>> = vec![
            Box::new(NpmReader::new(
                self.root.clone(),
                include_files(npm),
                exclude_files(npm),
                development_files(npm),
                extra_modules(npm),
            )),
            Box::new(MavenReader::new(
                self.root.clone(),
                include_files(maven),
                exclude_files(maven),
                development_files(maven),
                extra_modules(maven),
            )),
            Box::new(PypiReader::new(
                self.root.clone(),
                include_files(pypi),
                exclude_files(pypi),
                development_files(pypi),
                extra_modules(pypi),
                pypi.and_then(|o| o.recursive_requirements).unwrap_or(true),
            )),
            Box::new(GoReader::new(
                self.root.clone(),
                include_files(go),
                exclude_files(go),
                development_files(go),
                extra_modules(go),
            )),
        ];
        MultiReader::new(readers)
    }

    /// Runs one full audit: read manifests, resolve the transitive graph
    /// through the Insights client, classify against the license policy.
    pub async fn check(&self) -> CoreResult<AuditResult> {
        self.config
            .validate()
            .map_err(|e| CoreError::InvalidConfig(e.to_string()))?;

        let started = self.clock.now();
        let reader = self.build_reader();
        let (direct, reader_errors, reader_warnings) = reader.read_all();
        info!(count = direct.len(), "discovered direct dependencies");

        let (resolved, resolver_errors, resolver_warnings) = self.resolver.resolve(direct).await?;

        let mut caveats = Caveats::default();
        caveats.errors.extend(reader_errors);
        caveats.errors.extend(resolver_errors);
        caveats.warnings.extend(reader_warnings);
        caveats.warnings.extend(resolver_warnings);

        let result = classify(
            resolved,
            &self.config.licenses,
            &self.config.classifier_options(),
            caveats,
        )?;

        let elapsed = self.clock.now().duration_since(started);
        info!(?elapsed, allowed = result.allowed.len(), warning = result.warning.len(), forbidden = result.forbidden.len(), "audit complete");

        Ok(result)
    }
}

fn include_files(options: Option<&resolver::PerSystemOptions>) -> Vec<String> {
    options.map(|o| o.include_files.clone()).unwrap_or_default()
}

fn exclude_files(options: Option<&resolver::PerSystemOptions>) -> Vec<String> {
    options.map(|o| o.exclude_files.clone()).unwrap_or_default()
}

fn development_files(options: Option<&resolver::PerSystemOptions>) -> Vec<String> {
    options
        .map(|o| o.development_files.clone())
        .unwrap_or_default()
}

fn extra_modules(options: Option<&resolver::PerSystemOptions>) -> Vec<String> {
    options.map(|o| o.extra_modules.clone()).unwrap_or_default()
}
