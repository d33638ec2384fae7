//! Remote Insights client: a narrow interface over the `deps.dev` v3 gRPC
//! Insights service.
//!
//! Grounded on the teacher's `NpmClient`/`NpmError` split in
//! `services/npm_client.rs` — a thin client type, a `thiserror` error enum,
//! and typed response structs — but the transport itself is gRPC (`tonic`)
//! rather than `reqwest`, so the concrete adapter lives in [`grpc`].

pub mod fake;
pub mod grpc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::version::System;

/// A specific package, independent of version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageKey {
    pub system: System,
    pub name: String,
}

/// A specific version of a package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionKey {
    pub system: System,
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSummary {
    pub version_key: VersionKey,
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionsResponse {
    pub versions: Vec<VersionSummary>,
}

impl VersionsResponse {
    pub fn default_version(&self) -> Option<&VersionSummary> {
        self.versions.iter().find(|v| v.is_default)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version_key: VersionKey,
    pub licenses: Vec<String>,
}

/// A dependency edge's relation to the package whose dependencies were
/// requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    #[serde(rename = "SELF")]
    Self_,
    Direct,
    Indirect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyNode {
    pub version_key: VersionKey,
    pub relation: Relation,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependenciesResponse {
    pub nodes: Vec<DependencyNode>,
}

#[derive(Debug, Error)]
pub enum InsightsError {
    #[error("deadline exceeded after {attempts} attempt(s) for {operation}")]
    DeadlineExceeded { operation: String, attempts: u32 },

    #[error("package not found: {system} {name}")]
    PackageNotFound { system: System, name: String },

    #[error("version not found: {system} {name}@{version}")]
    VersionNotFound {
        system: System,
        name: String,
        version: String,
    },

    #[error("transport error calling {operation}: {message}")]
    Transport { operation: String, message: String },
}

/// The only thing the Core depends on for remote data. Implementors must be
/// safe for concurrent use, typically by wrapping a cloneable
/// `tonic::transport::Channel`.
#[async_trait]
pub trait InsightsClient: Send + Sync {
    async fn get_versions(&self, system: System, name: &str) -> Result<VersionsResponse, InsightsError>;

    async fn get_version(
        &self,
        system: System,
        name: &str,
        version: &str,
    ) -> Result<VersionResponse, InsightsError>;

    async fn get_dependencies(
        &self,
        system: System,
        name: &str,
        version: &str,
    ) -> Result<DependenciesResponse, InsightsError>;
}

/// Maximum attempts (including the original) for a single RPC on
/// deadline-exceeded, per §4.4/§5.
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_version_picks_the_flagged_entry() {
        let response = VersionsResponse {
            versions: vec![
                VersionSummary {
                    version_key: VersionKey {
                        system: System::Npm,
                        name: "left-pad".to_string(),
                        version: "1.0.0".to_string(),
                    },
                    is_default: false,
                },
                VersionSummary {
                    version_key: VersionKey {
                        system: System::Npm,
                        name: "left-pad".to_string(),
                        version: "1.3.0".to_string(),
                    },
                    is_default: true,
                },
            ],
        };
        assert_eq!(
            response.default_version().unwrap().version_key.version,
            "1.3.0"
        );
    }
}
