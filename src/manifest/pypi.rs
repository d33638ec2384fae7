//! PyPI `requirements.txt` reader.
//!
//! Line-oriented, grounded on the teacher's `PypiClient` response typing for
//! general per-ecosystem module shape, adapted to manifest parsing: strip
//! comments/blank lines, follow `-r`/`--requirement` includes recursively
//! with a visited-path cycle guard, and match each remaining line against
//! `name OP version`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use super::{
    default_globs, DependencyDeclaration, ManifestError, ManifestReader, ManifestReaderBase,
};
use crate::version::System;

static REQUIREMENT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9_.\-\[\]]+)\s*(==|>=|<=|!=|~=)\s*(\S+)$").expect("static regex")
});

pub struct PypiReader {
    base: ManifestReaderBase,
    recursive_requirements: bool,
}

impl PypiReader {
    pub fn new(
        root: PathBuf,
        extra_include: Vec<String>,
        extra_exclude: Vec<String>,
        extra_development: Vec<String>,
        extra_modules: Vec<String>,
        recursive_requirements: bool,
    ) -> Self {
        let (mut include, mut development, mut exclude) = default_globs(System::PyPi);
        include.extend(extra_include);
        development.extend(extra_development);
        exclude.extend(extra_exclude);
        Self {
            base: ManifestReaderBase::new(System::PyPi, include, development, exclude, extra_modules, root),
            recursive_requirements,
        }
    }

    fn read_lines(
        &self,
        path: &Path,
        is_development: bool,
        visited: &mut HashSet<PathBuf>,
    ) -> Result<(Vec<DependencyDeclaration>, Vec<String>), ManifestError> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if !visited.insert(canonical) {
            return Ok((Vec::new(), Vec::new()));
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let origin = path.display().to_string();
        let mut declarations = Vec::new();
        let mut warnings = Vec::new();

        for raw_line in contents.lines() {
            let line = strip_comment(raw_line).trim();
            if line.is_empty() {
                continue;
            }

            if self.recursive_requirements {
                if let Some(included) = parse_include(line) {
                    let include_path = path
                        .parent()
                        .map(|p| p.join(&included))
                        .unwrap_or_else(|| PathBuf::from(&included));
                    let (mut nested, mut nested_warnings) =
                        self.read_lines(&include_path, is_development, visited)?;
                    declarations.append(&mut nested);
                    warnings.append(&mut nested_warnings);
                    continue;
                }
            } else if parse_include(line).is_some() {
                continue;
            }

            let (name, version, had_extras) = match parse_requirement(line) {
                Some(parsed) => parsed,
                None => {
                    return Err(ManifestError::MalformedLine {
                        path: origin,
                        line: line.to_string(),
                    })
                }
            };

            if had_extras {
                warnings.push(format!("{origin}: dropped [extras] suffix from {name}"));
            }

            declarations.push(DependencyDeclaration::new(
                System::PyPi,
                name,
                version,
                origin.clone(),
                !is_development,
                is_development,
            ));
        }
        Ok((declarations, warnings))
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn parse_include(line: &str) -> Option<String> {
    line.strip_prefix("-r ")
        .or_else(|| line.strip_prefix("--requirement "))
        .map(|rest| rest.trim().to_string())
}

/// Parses `name OP version`, stripping a `[extras]` suffix from the name and
/// reporting whether it was present. `!=` yields a `None` version (an
/// exclusion, not a pin).
fn parse_requirement(line: &str) -> Option<(String, Option<String>, bool)> {
    let captures = REQUIREMENT_LINE.captures(line)?;
    let raw_name = captures.get(1)?.as_str();
    let op = captures.get(2)?.as_str();
    let version = captures.get(3)?.as_str();

    let (name, had_extras) = match raw_name.find('[') {
        Some(idx) => (raw_name[..idx].to_string(), true),
        None => (raw_name.to_string(), false),
    };

    if op == "!=" {
        Some((name, None, had_extras))
    } else {
        Some((name, Some(version.to_string()), had_extras))
    }
}

impl ManifestReader for PypiReader {
    fn system(&self) -> System {
        System::PyPi
    }

    fn read_file(
        &self,
        path: &Path,
        is_development: bool,
    ) -> Result<(Vec<DependencyDeclaration>, Vec<String>), ManifestError> {
        let mut visited = HashSet::new();
        self.read_lines(path, is_development, &mut visited)
    }

    fn read_all(&self) -> (Vec<DependencyDeclaration>, Vec<String>, Vec<String>) {
        let mut declarations = self.base.extra_module_declarations();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let files = match self.base.discover_files() {
            Ok(files) => files,
            Err(err) => {
                errors.push(err.to_string());
                return (declarations, errors, warnings);
            }
        };

        for file in files {
            match self.read_file(&file.path, file.is_development) {
                Ok((mut decls, mut warns)) => {
                    declarations.append(&mut decls);
                    warnings.append(&mut warns);
                }
                Err(err) => errors.push(err.to_string()),
            }
        }
        (declarations, errors, warnings)
    }
}
