//! Manifest discovery and parsing, one reader per package ecosystem.
//!
//! The shared glob-discovery/`extra_modules`/error-capture contract lives in
//! [`ManifestReaderBase`], grounded on the teacher's `ConfigParser` in
//! `utils/config.rs` (a small struct wrapping a handful of path-oriented
//! helper methods, each returning a typed `Result`).

pub mod go;
pub mod maven;
pub mod npm;
pub mod pypi;

use std::path::{Path, PathBuf};

use glob::glob;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::version::System;

/// A direct dependency as declared in a manifest file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDeclaration {
    pub system: System,
    pub name: String,
    /// The raw declared value (may be a range, a property reference, or a
    /// plain version), verbatim from the manifest.
    pub version: Option<String>,
    /// Normalized via [`crate::version::resolve_version`]; `None` until the
    /// reader resolves it (readers that can't normalize leave it unset and
    /// the resolution engine fills it in later).
    pub resolved_version: Option<String>,
    pub origin: String,
    pub production: bool,
    pub development: bool,
}

impl DependencyDeclaration {
    pub fn new(
        system: System,
        name: String,
        version: Option<String>,
        origin: String,
        production: bool,
        development: bool,
    ) -> Self {
        Self {
            system,
            name,
            version,
            resolved_version: None,
            origin,
            production,
            development,
        }
    }

    #[must_use]
    pub fn with_resolved_version(mut self, resolved_version: Option<String>) -> Self {
        self.resolved_version = resolved_version;
        self
    }
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse JSON manifest {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to parse XML manifest {path}: {source}")]
    Xml {
        path: String,
        #[source]
        source: quick_xml::Error,
    },
    #[error("invalid glob pattern {pattern}: {source}")]
    Glob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("malformed requirement line in {path}: {line}")]
    MalformedLine { path: String, line: String },
}

/// One discovered manifest file plus whether it was matched by a
/// `development`-designated glob.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub is_development: bool,
}

/// The glob/`extra_modules` contract shared by every per-ecosystem reader.
///
/// A `development` glob match takes precedence over an `include` match for
/// the same path (the file is reported once, as development); `exclude`
/// globs suppress a path from both sets.
pub struct ManifestReaderBase {
    pub system: System,
    pub include_globs: Vec<String>,
    pub development_globs: Vec<String>,
    pub exclude_globs: Vec<String>,
    pub extra_modules: Vec<String>,
    pub root: PathBuf,
}

impl ManifestReaderBase {
    pub fn new(
        system: System,
        include_globs: Vec<String>,
        development_globs: Vec<String>,
        exclude_globs: Vec<String>,
        extra_modules: Vec<String>,
        root: PathBuf,
    ) -> Self {
        Self {
            system,
            include_globs,
            development_globs,
            exclude_globs,
            extra_modules,
            root,
        }
    }

    /// Resolves `include_globs`/`development_globs` against `root`,
    /// deduplicating by path and excluding anything matched by
    /// `exclude_globs`. Development matches win over include matches.
    pub fn discover_files(&self) -> Result<Vec<DiscoveredFile>, ManifestError> {
        let excluded = self.collect(&self.exclude_globs)?;
        let development = self.collect(&self.development_globs)?;
        let included = self.collect(&self.include_globs)?;

        let mut files: Vec<DiscoveredFile> = Vec::new();
        for path in development {
            if !excluded.contains(&path) {
                files.push(DiscoveredFile {
                    path,
                    is_development: true,
                });
            }
        }
        for path in included {
            if excluded.contains(&path) || files.iter().any(|f| f.path == path) {
                continue;
            }
            files.push(DiscoveredFile {
                path,
                is_development: false,
            });
        }
        Ok(files)
    }

    fn collect(&self, patterns: &[String]) -> Result<Vec<PathBuf>, ManifestError> {
        let mut out = Vec::new();
        for pattern in patterns {
            let full_pattern = self.root.join(pattern);
            let pattern_str = full_pattern.to_string_lossy().to_string();
            let paths = glob(&pattern_str).map_err(|source| ManifestError::Glob {
                pattern: pattern_str.clone(),
                source,
            })?;
            for entry in paths {
                match entry {
                    Ok(path) => out.push(path),
                    Err(glob_err) => {
                        return Err(ManifestError::Io {
                            path: glob_err.path().display().to_string(),
                            source: glob_err.into_error(),
                        })
                    }
                }
            }
        }
        Ok(out)
    }

    /// Synthesizes `name@version` entries from `extra_modules` as
    /// both-production-and-development declarations with origin
    /// `"extraModules"`.
    pub fn extra_module_declarations(&self) -> Vec<DependencyDeclaration> {
        self.extra_modules
            .iter()
            .filter_map(|entry| {
                let (name, version) = entry.rsplit_once('@')?;
                Some(DependencyDeclaration::new(
                    self.system,
                    name.to_string(),
                    Some(version.to_string()),
                    "extraModules".to_string(),
                    true,
                    true,
                ))
            })
            .collect()
    }
}

/// Default glob sets per ecosystem, per the manifest-discovery contract.
pub fn default_globs(system: System) -> (Vec<String>, Vec<String>, Vec<String>) {
    match system {
        System::Npm => (
            vec!["**/package.json".to_string()],
            vec![],
            vec!["**/node_modules/**".to_string()],
        ),
        System::Maven => (vec!["**/pom.xml".to_string()], vec![], vec![]),
        System::PyPi => (
            vec!["**/requirements.txt".to_string()],
            vec!["**/requirements-dev.txt".to_string()],
            vec!["**/venv/**".to_string(), "**/.venv/**".to_string()],
        ),
        System::Go => (
            vec!["**/go.mod".to_string()],
            vec![],
            vec!["**/vendor/**".to_string()],
        ),
    }
}

/// Implemented by each per-ecosystem reader.
pub trait ManifestReader {
    fn system(&self) -> System;

    /// Parses a single file. `is_development` is forced by the caller when
    /// the file was discovered via a `development` glob. Returns the parsed
    /// declarations alongside any non-fatal warnings raised while parsing
    /// (an unresolved Maven `${prop}` reference, a stripped PyPI `[extras]`
    /// suffix); a warning never prevents the declaration from being emitted.
    fn read_file(
        &self,
        path: &Path,
        is_development: bool,
    ) -> Result<(Vec<DependencyDeclaration>, Vec<String>), ManifestError>;

    /// Runs discovery, reads every file, and captures per-file failures
    /// into `errors` rather than aborting; returns the concatenated
    /// declarations plus any `extra_modules` entries, plus the concatenated
    /// per-file warnings.
    fn read_all(&self) -> (Vec<DependencyDeclaration>, Vec<String>, Vec<String>);
}

/// Fans out to all four per-ecosystem readers and aggregates their output,
/// matching the `MultiReader` contract in §4.3.
pub struct MultiReader {
    readers: Vec<Box<dyn ManifestReader + Send + Sync>>,
}

impl MultiReader {
    pub fn new(readers: Vec<Box<dyn ManifestReader + Send + Sync>>) -> Self {
        Self { readers }
    }

    pub fn read_all(&self) -> (Vec<DependencyDeclaration>, Vec<String>, Vec<String>) {
        let mut declarations = Vec::new();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        for reader in &self.readers {
            let (mut decls, mut errs, mut warns) = reader.read_all();
            declarations.append(&mut decls);
            errors.append(&mut errs);
            warnings.append(&mut warns);
        }
        (declarations, errors, warnings)
    }
}
