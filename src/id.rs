//! Canonical dependency identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::version::System;

/// A canonical `SYSTEM:NAME[@VERSION]` identifier.
///
/// Construction always normalizes through [`dependency_id`], so two
/// `DependencyId`s built from the same `(system, name, version)` compare
/// equal regardless of how they were assembled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyId(String);

impl DependencyId {
    pub fn new(system: System, name: &str, version: Option<&str>) -> Self {
        Self(dependency_id(system, name, version))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DependencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Builds the canonical `SYSTEM:NAME` or `SYSTEM:NAME@VERSION` string.
pub fn dependency_id(system: System, name: &str, version: Option<&str>) -> String {
    match version {
        Some(v) if !v.is_empty() => format!("{system}:{name}@{v}"),
        _ => format!("{system}:{name}"),
    }
}

/// Splits a canonical id back into its parts. Used by `ModuleSpec` parsing
/// (`SYSTEM:name@version` raw strings) and by tests asserting the
/// canonicalization round-trip.
pub fn parse_dependency_id(id: &str) -> Option<(Option<System>, String, Option<String>)> {
    let (system_part, rest) = match id.split_once(':') {
        Some((s, r)) => (Some(s.parse::<System>().ok()?), r),
        None => (None, id),
    };
    let (name, version) = match rest.split_once('@') {
        Some((n, v)) => (n.to_string(), Some(v.to_string())),
        None => (rest.to_string(), None),
    };
    Some((system_part, name, version))
}
