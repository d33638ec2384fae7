//! System-aware version validation and normalization.
//!
//! Mirrors the per-ecosystem `VersionParser` split the teacher crate keeps in
//! `models/ecosystem.rs`, but covers the four SBOM-relevant ecosystems and
//! uses the `semver` crate for real SemVer satisfaction instead of the
//! teacher's simplified major/minor/patch comparison.

use std::fmt;

use regex::Regex;
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// The four package ecosystems this crate reads manifests for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum System {
    Npm,
    Maven,
    PyPi,
    Go,
}

impl System {
    /// All systems, in the order manifest discovery runs them.
    pub const ALL: [System; 4] = [System::Npm, System::Maven, System::PyPi, System::Go];
}

impl fmt::Display for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            System::Npm => "NPM",
            System::Maven => "MAVEN",
            System::PyPi => "PYPI",
            System::Go => "GO",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for System {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NPM" => Ok(System::Npm),
            "MAVEN" => Ok(System::Maven),
            "PYPI" => Ok(System::PyPi),
            "GO" => Ok(System::Go),
            other => Err(VersionError::UnknownSystem(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    #[error("unknown system: {0}")]
    UnknownSystem(String),
}

static NUMERIC_DOTTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)*\S*$").expect("static regex"));
static GO_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v\d+(\.\d+)*\S*$").expect("static regex"));

/// Returns false for `None`/empty input, per §4.1.
pub fn is_valid_version(system: System, version: Option<&str>) -> bool {
    let Some(v) = version else { return false };
    if v.is_empty() {
        return false;
    }
    match system {
        System::Npm => Version::parse(v).is_ok(),
        System::PyPi | System::Maven => NUMERIC_DOTTED.is_match(v),
        System::Go => GO_VERSION.is_match(v),
    }
}

/// Normalizes a declared version. Never fails: on any parse failure the
/// input is returned unchanged, per §4.1 ("`resolveVersion` never throws").
pub fn resolve_version(system: System, version: &str) -> String {
    match system {
        System::Npm => resolve_npm_version(version),
        System::PyPi | System::Maven | System::Go => version.to_string(),
    }
}

/// NPM declarations are frequently ranges (`^1.2.3`, `~1.2.0`, `>=1.0.0 <2.0.0`).
/// When the declared value parses as an exact SemVer version it is returned
/// as-is; when it parses as a range, the minimum version satisfying that
/// range is used, matching the "SemVer min of the range" contract.
fn resolve_npm_version(version: &str) -> String {
    if Version::parse(version).is_ok() {
        return version.to_string();
    }
    let Ok(req) = VersionReq::parse(version) else {
        return version.to_string();
    };
    min_satisfying(&req).map_or_else(|| version.to_string(), |v| v.to_string())
}

/// Finds the lowest plausible version satisfying a SemVer requirement by
/// reading the comparator list directly rather than searching a version
/// space — `VersionReq` does not expose its comparators' bounds for
/// minimization, so the declared ranges handled here are the common
/// `^`/`~`/bare-version/comparator forms produced by NPM manifests.
fn min_satisfying(req: &VersionReq) -> Option<Version> {
    let comparator = req.comparators.first()?;
    let major = comparator.major;
    let minor = comparator.minor.unwrap_or(0);
    let patch = comparator.patch.unwrap_or(0);
    let candidate = Version::new(major, minor, patch);
    if req.matches(&candidate) {
        Some(candidate)
    } else {
        // `>x.y.z` excludes the floor; the next patch is the minimum.
        Some(Version::new(major, minor, patch + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn npm_validity() {
        assert!(is_valid_version(System::Npm, Some("1.2.3")));
        assert!(is_valid_version(System::Npm, Some("1.2.3-beta.1")));
        assert!(!is_valid_version(System::Npm, Some("^1.2.3")));
        assert!(!is_valid_version(System::Npm, Some("latest")));
        assert!(!is_valid_version(System::Npm, None));
        assert!(!is_valid_version(System::Npm, Some("")));
    }

    #[test]
    fn pypi_and_maven_validity() {
        assert!(is_valid_version(System::PyPi, Some("1.2.3")));
        assert!(is_valid_version(System::PyPi, Some("1.2.3rc1")));
        assert!(is_valid_version(System::Maven, Some("4.2")));
        assert!(!is_valid_version(System::PyPi, Some("rc1")));
        assert!(!is_valid_version(System::Maven, Some("")));
    }

    #[test]
    fn go_validity() {
        assert!(is_valid_version(System::Go, Some("v1.2.3")));
        assert!(!is_valid_version(System::Go, Some("1.2.3")));
    }

    #[test]
    fn npm_range_minimization() {
        assert_eq!(resolve_version(System::Npm, "^1.2.3"), "1.2.3");
        assert_eq!(resolve_version(System::Npm, "~1.2.0"), "1.2.0");
        assert_eq!(resolve_version(System::Npm, "1.2.3"), "1.2.3");
    }

    #[test]
    fn npm_range_minimization_falls_back_on_unparseable_input() {
        assert_eq!(resolve_version(System::Npm, "latest"), "latest");
        assert_eq!(resolve_version(System::Npm, "*"), "*");
    }

    #[test]
    fn non_npm_systems_are_identity_normalized() {
        assert_eq!(resolve_version(System::PyPi, ">=1.0.0"), ">=1.0.0");
        assert_eq!(resolve_version(System::Go, "v1.2.3"), "v1.2.3");
        assert_eq!(resolve_version(System::Maven, "${property}"), "${property}");
    }

    #[test]
    fn resolve_version_is_idempotent() {
        for (system, raw) in [
            (System::Npm, "^1.2.3"),
            (System::PyPi, ">=1.0.0"),
            (System::Go, "v1.2.3"),
            (System::Maven, "1.2"),
        ] {
            let once = resolve_version(system, raw);
            let twice = resolve_version(system, &once);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn system_display_and_parse_round_trip() {
        for system in System::ALL {
            let s = system.to_string();
            assert_eq!(s.parse::<System>().unwrap(), system);
        }
    }
}
