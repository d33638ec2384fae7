//! In-memory [`InsightsClient`] fake used by the Core's own tests and
//! available to integration tests in `tests/`, standing in for the network
//! the way the teacher's `mockito`-backed tests stand in for the NPM/PyPI
//! registries.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    DependenciesResponse, InsightsClient, InsightsError, VersionResponse, VersionsResponse,
};
use crate::version::System;

#[derive(Debug, Clone, Default)]
pub struct FakePackage {
    pub versions: VersionsResponse,
    pub version_responses: HashMap<String, VersionResponse>,
    pub dependencies: HashMap<String, DependenciesResponse>,
}

/// A fully scripted Insights backend: every response is registered ahead of
/// time by `(system, name)`; anything not registered yields `PackageNotFound`
/// / `VersionNotFound`.
#[derive(Default)]
pub struct FakeInsightsClient {
    packages: Mutex<HashMap<(System, String), FakePackage>>,
}

impl FakeInsightsClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, system: System, name: &str, package: FakePackage) {
        self.packages
            .lock()
            .expect("fake insights lock poisoned")
            .insert((system, name.to_string()), package);
    }
}

#[async_trait]
impl InsightsClient for FakeInsightsClient {
    async fn get_versions(&self, system: System, name: &str) -> Result<VersionsResponse, InsightsError> {
        let packages = self.packages.lock().expect("fake insights lock poisoned");
        packages
            .get(&(system, name.to_string()))
            .map(|p| p.versions.clone())
            .ok_or_else(|| InsightsError::PackageNotFound {
                system,
                name: name.to_string(),
            })
    }

    async fn get_version(
        &self,
        system: System,
        name: &str,
        version: &str,
    ) -> Result<VersionResponse, InsightsError> {
        let packages = self.packages.lock().expect("fake insights lock poisoned");
        packages
            .get(&(system, name.to_string()))
            .and_then(|p| p.version_responses.get(version).cloned())
            .ok_or_else(|| InsightsError::VersionNotFound {
                system,
                name: name.to_string(),
                version: version.to_string(),
            })
    }

    async fn get_dependencies(
        &self,
        system: System,
        name: &str,
        version: &str,
    ) -> Result<DependenciesResponse, InsightsError> {
        let packages = self.packages.lock().expect("fake insights lock poisoned");
        packages
            .get(&(system, name.to_string()))
            .and_then(|p| p.dependencies.get(version).cloned())
            .ok_or_else(|| InsightsError::VersionNotFound {
                system,
                name: name.to_string(),
                version: version.to_string(),
            })
    }
}
