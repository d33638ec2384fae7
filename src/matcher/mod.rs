//! Matching a dependency against a configured [`ModuleSpec`].
//!
//! Grounds on the teacher's `models/dependency.rs` validation helpers for the
//! general shape (small, field-by-field checks returning `bool`), but the
//! matching rules themselves come from the policy-configuration contract:
//! a `ModuleSpec` is either a bare string or an object of optional fields,
//! modeled the way the teacher's `NpmAuthor` enum handles a dynamic JSON
//! shape with `#[serde(untagged)]`.

use regex::Regex;
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

use crate::id::parse_dependency_id;
use crate::manifest::DependencyDeclaration;
use crate::version::{is_valid_version, System};

/// A single module-matching rule from policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModuleSpec {
    /// `"name"`, `"name@version"`, or `"SYSTEM:name@version"`.
    Raw(String),
    Fields(ModuleSpecFields),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleSpecFields {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub semver: Option<String>,
    #[serde(default)]
    pub name_match: Option<String>,
    #[serde(default)]
    pub version_match: Option<String>,
    #[serde(default)]
    pub ignore: bool,
}

impl ModuleSpec {
    fn ignore(&self) -> bool {
        matches!(self, ModuleSpec::Fields(f) if f.ignore)
    }
}

/// Returns true when `dep` satisfies `spec`, per the name/version priority
/// rules: name_match regex beats name equality; version_match regex beats a
/// semver range beats version equality; an absent version constraint matches
/// any version.
pub fn matches(dep: &DependencyDeclaration, spec: &ModuleSpec) -> bool {
    match spec {
        ModuleSpec::Raw(raw) => matches_raw(dep, raw),
        ModuleSpec::Fields(fields) => matches_fields(dep, fields),
    }
}

/// Whether `spec` marks its matches as ignored (skip expansion entirely).
pub fn is_ignored(dep: &DependencyDeclaration, specs: &[ModuleSpec]) -> bool {
    specs.iter().any(|s| s.ignore() && matches(dep, s))
}

fn matches_raw(dep: &DependencyDeclaration, raw: &str) -> bool {
    let (system, name, version) = match parse_dependency_id(raw) {
        Some(parsed) => parsed,
        None => return false,
    };
    if let Some(system) = system {
        if system != dep.system {
            return false;
        }
    }
    if name != dep.name {
        return false;
    }
    match version {
        Some(v) => dep.version.as_deref() == Some(v.as_str()),
        None => true,
    }
}

fn matches_fields(dep: &DependencyDeclaration, fields: &ModuleSpecFields) -> bool {
    if !name_matches(dep, fields) {
        return false;
    }
    version_matches(dep, fields)
}

fn name_matches(dep: &DependencyDeclaration, fields: &ModuleSpecFields) -> bool {
    if let Some(pattern) = &fields.name_match {
        return Regex::new(pattern).is_ok_and(|re| re.is_match(&dep.name));
    }
    match &fields.name {
        Some(name) => name == &dep.name,
        None => true,
    }
}

fn version_matches(dep: &DependencyDeclaration, fields: &ModuleSpecFields) -> bool {
    if let Some(pattern) = &fields.version_match {
        return dep
            .version
            .as_deref()
            .map(|v| Regex::new(pattern).is_ok_and(|re| re.is_match(v)))
            .unwrap_or(false);
    }
    if let Some(range) = &fields.semver {
        return satisfies_range(dep.system, dep.version.as_deref(), range);
    }
    match &fields.version {
        Some(version) => dep.version.as_deref() == Some(version.as_str()),
        None => true,
    }
}

fn satisfies_range(system: System, version: Option<&str>, range: &str) -> bool {
    let Some(v) = version else { return false };
    if !is_valid_version(system, Some(v)) {
        return false;
    }
    let Ok(req) = VersionReq::parse(range) else {
        return false;
    };
    Version::parse(v).is_ok_and(|parsed| req.matches(&parsed))
}
