//! Go `go.mod` reader.
//!
//! Grounds on the two-regex/state-machine approach for `require (...)` blocks
//! versus single-line `require NAME VERSION` statements used for Go module
//! files elsewhere in the example pack.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use super::{
    default_globs, DependencyDeclaration, ManifestError, ManifestReader, ManifestReaderBase,
};
use crate::version::System;

static SINGLE_REQUIRE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^require\s+(\S+)\s+(\S+)(\s*//\s*indirect)?$").expect("static regex"));
static BLOCK_REQUIRE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+)\s+(\S+)(\s*//\s*indirect)?$").expect("static regex"));

pub struct GoReader {
    base: ManifestReaderBase,
}

impl GoReader {
    pub fn new(
        root: PathBuf,
        extra_include: Vec<String>,
        extra_exclude: Vec<String>,
        extra_development: Vec<String>,
        extra_modules: Vec<String>,
    ) -> Self {
        let (mut include, mut development, mut exclude) = default_globs(System::Go);
        include.extend(extra_include);
        development.extend(extra_development);
        exclude.extend(extra_exclude);
        Self {
            base: ManifestReaderBase::new(System::Go, include, development, exclude, extra_modules, root),
        }
    }
}

impl ManifestReader for GoReader {
    fn system(&self) -> System {
        System::Go
    }

    fn read_file(
        &self,
        path: &Path,
        is_development: bool,
    ) -> Result<(Vec<DependencyDeclaration>, Vec<String>), ManifestError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let origin = path.display().to_string();

        let mut declarations = Vec::new();
        let mut in_require_block = false;

        for raw_line in contents.lines() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            if line == "require (" {
                in_require_block = true;
                continue;
            }
            if in_require_block && line == ")" {
                in_require_block = false;
                continue;
            }

            if in_require_block {
                if let Some(caps) = BLOCK_REQUIRE.captures(line) {
                    declarations.push(build_declaration(&caps, &origin, is_development));
                }
            } else if let Some(caps) = SINGLE_REQUIRE.captures(line) {
                declarations.push(build_declaration(&caps, &origin, is_development));
            }
        }
        Ok((declarations, Vec::new()))
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

fn build_declaration(
    caps: &regex::Captures<'_>,
    origin: &str,
    is_development: bool,
) -> DependencyDeclaration {
    let name = caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default();
    let version = caps.get(2).map(|m| m.as_str().to_string());
    let is_indirect = caps.get(3).is_some();
    let origin = if is_indirect {
        format!("{origin} (indirect)")
    } else {
        origin.to_string()
    };
    DependencyDeclaration::new(
        System::Go,
        name,
        version,
        origin,
        !is_development,
        is_development,
    )
}
