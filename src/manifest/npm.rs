//! NPM `package.json` reader.
//!
//! Grounds on the teacher's `NpmPackageResponse`/`npm_to_package` JSON typing
//! style in `services/npm_client.rs`, adapted to read a manifest file on disk
//! instead of a registry response body.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use super::{
    default_globs, DependencyDeclaration, ManifestError, ManifestReader, ManifestReaderBase,
};
use crate::version::{resolve_version, System};

#[derive(Debug, Deserialize)]
struct PackageJson {
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "devDependencies")]
    dev_dependencies: BTreeMap<String, String>,
}

pub struct NpmReader {
    base: ManifestReaderBase,
}

impl NpmReader {
    pub fn new(
        root: std::path::PathBuf,
        extra_include: Vec<String>,
        extra_exclude: Vec<String>,
        extra_development: Vec<String>,
        extra_modules: Vec<String>,
    ) -> Self {
        let (mut include, mut development, mut exclude) = default_globs(System::Npm);
        include.extend(extra_include);
        development.extend(extra_development);
        exclude.extend(extra_exclude);
        Self {
            base: ManifestReaderBase::new(System::Npm, include, development, exclude, extra_modules, root),
        }
    }
}

impl ManifestReader for NpmReader {
    fn system(&self) -> System {
        System::Npm
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
        let parsed: PackageJson =
            serde_json::from_str(&contents).map_err(|source| ManifestError::Json {
                path: path.display().to_string(),
                source,
            })?;
        let origin = path.display().to_string();

        let mut declarations = Vec::new();
        for (name, version) in parsed.dependencies {
            let resolved = resolve_version(System::Npm, &version);
            declarations.push(
                DependencyDeclaration::new(
                    System::Npm,
                    name,
                    Some(version),
                    origin.clone(),
                    !is_development,
                    is_development,
                )
                .with_resolved_version(Some(resolved)),
            );
        }
        for (name, version) in parsed.dev_dependencies {
            let resolved = resolve_version(System::Npm, &version);
            declarations.push(
                DependencyDeclaration::new(
                    System::Npm,
                    name,
                    Some(version),
                    origin.clone(),
                    false,
                    true,
                )
                .with_resolved_version(Some(resolved)),
            );
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
