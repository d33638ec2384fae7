//! License policy classification.
//!
//! Grounds on the teacher's `ResolverError`-composition idiom for its own
//! `ClassifierError`, and on `utils/validation.rs`'s small free functions
//! returning rich results for the `satisfies`/`all_satisfy` helpers. SPDX
//! satisfaction is delegated to the `spdx` crate rather than a bespoke
//! parser, per the resolved catalog-source design decision.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::id::DependencyId;
use crate::manifest::DependencyDeclaration;
use crate::matcher::{matches, ModuleSpec};
use crate::resolver::{DependencyInfo, PerSystemOptions};

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("invalid license policy: {0}")]
    InvalidPolicy(String),
}

/// How an unclassifiable bucket folds into a definite one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    Warning,
    Forbidden,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicensePolicy {
    #[serde(default)]
    pub allowed: Vec<String>,
    #[serde(default)]
    pub warning: Vec<String>,
    #[serde(default)]
    pub forbidden: Vec<String>,
    #[serde(default = "default_others")]
    pub others: Disposition,
    #[serde(default = "default_unknown")]
    pub unknown: Disposition,
}

fn default_others() -> Disposition {
    Disposition::Forbidden
}

fn default_unknown() -> Disposition {
    Disposition::Warning
}

impl Default for LicensePolicy {
    fn default() -> Self {
        Self {
            allowed: Vec::new(),
            warning: Vec::new(),
            forbidden: Vec::new(),
            others: Disposition::Forbidden,
            unknown: Disposition::Warning,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifierOptions {
    #[serde(default = "default_true")]
    pub production: bool,
    #[serde(default = "default_true")]
    pub development: bool,
    #[serde(default)]
    pub only_direct: bool,
    #[serde(default)]
    pub per_system: std::collections::HashMap<crate::version::System, PerSystemOptions>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Caveats {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditResult {
    pub allowed: Vec<DependencyInfo>,
    pub warning: Vec<DependencyInfo>,
    pub forbidden: Vec<DependencyInfo>,
    pub caveats: Caveats,
}

/// Whether license `ℓ` satisfies policy identifier `i`: SPDX satisfaction
/// when both parse as valid SPDX, otherwise a literal string comparison
/// (with a one-time warning so operators notice a typo'd policy entry).
pub fn satisfies(license: &str, policy_identifier: &str) -> bool {
    match (
        spdx::Expression::parse(license),
        spdx::Expression::parse(policy_identifier),
    ) {
        (Ok(license_expr), Ok(policy_expr)) => {
            license_expr.evaluate(|req| policy_expr.evaluate(|policy_req| policy_req == req))
        }
        _ => {
            warn!(policy_identifier, "license policy identifier is not valid SPDX; falling back to string equality");
            license == policy_identifier
        }
    }
}

/// `∀ℓ∈licenses ∃i∈identifiers: satisfies(ℓ,i)`. An empty `licenses` list is
/// handled by the caller (routed to the unknown bucket before this is ever
/// called).
pub fn all_satisfy(licenses: &[String], identifiers: &[String]) -> bool {
    !licenses.is_empty()
        && licenses
            .iter()
            .all(|license| identifiers.iter().any(|id| satisfies(license, id)))
}

fn passes_prefilters(
    dep: &DependencyInfo,
    options: &ClassifierOptions,
) -> bool {
    if let Some(per_system) = options.per_system.get(&dep.system) {
        if !per_system.modules.is_empty() && !module_matches_any(dep, &per_system.modules) {
            return false;
        }
        if module_matches_any(dep, &per_system.exclude_modules) {
            return false;
        }
    }

    if dep.development && !options.development && (!dep.production || !options.production) {
        return false;
    }
    if dep.production && !options.production && (!dep.development || !options.development) {
        return false;
    }
    if !dep.direct && options.only_direct {
        return false;
    }
    true
}

fn module_matches_any(dep: &DependencyInfo, specs: &[ModuleSpec]) -> bool {
    let declaration = DependencyDeclaration::new(
        dep.system,
        dep.name.clone(),
        dep.version.clone(),
        String::new(),
        dep.production,
        dep.development,
    );
    specs.iter().any(|spec| matches(&declaration, spec))
}

enum Bucket {
    Allowed,
    Warning,
    Forbidden,
}

/// Classifies one surviving dependency per the short-circuit order
/// `unknown -> allowed -> forbidden -> warning -> others`.
fn classify_one(dep: &DependencyInfo, policy: &LicensePolicy) -> Bucket {
    if dep.licenses.is_empty() {
        return match policy.unknown {
            Disposition::Warning => Bucket::Warning,
            Disposition::Forbidden => Bucket::Forbidden,
        };
    }
    if all_satisfy(&dep.licenses, &policy.allowed) {
        return Bucket::Allowed;
    }
    if all_satisfy(&dep.licenses, &policy.forbidden) {
        return Bucket::Forbidden;
    }
    if all_satisfy(&dep.licenses, &policy.warning) {
        return Bucket::Warning;
    }
    match policy.others {
        Disposition::Warning => Bucket::Warning,
        Disposition::Forbidden => Bucket::Forbidden,
    }
}

/// Applies pre-filters then classifies every surviving dependency,
/// producing the final disjoint `AuditResult`.
pub fn classify(
    deps: Vec<DependencyInfo>,
    policy: &LicensePolicy,
    options: &ClassifierOptions,
    mut caveats: Caveats,
) -> Result<AuditResult, ClassifierError> {
    let mut allowed = Vec::new();
    let mut warning = Vec::new();
    let mut forbidden = Vec::new();
    let mut seen: HashSet<DependencyId> = HashSet::new();

    for dep in deps {
        if !seen.insert(dep.id.clone()) {
            continue;
        }
        caveats.errors.extend(dep.errors.clone());
        caveats.warnings.extend(dep.warnings.clone());

        if !passes_prefilters(&dep, options) {
            continue;
        }

        let bucket = classify_one(&dep, policy);
        let mut dep = dep;
        if dep.licenses.is_empty() {
            dep.licenses = vec!["unknown".to_string()];
        }
        match bucket {
            Bucket::Allowed => allowed.push(dep),
            Bucket::Warning => warning.push(dep),
            Bucket::Forbidden => forbidden.push(dep),
        }
    }

    Ok(AuditResult {
        allowed,
        warning,
        forbidden,
        caveats,
    })
}
