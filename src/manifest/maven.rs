//! Maven `pom.xml` reader.
//!
//! Grounds on the `quick_xml::{Reader, events::Event}` streaming-parse style
//! and `${property}` interpolation approach used for Maven POMs elsewhere in
//! the example pack, adapted to emit [`DependencyDeclaration`]s instead of a
//! resolved `Pom` model.

use std::collections::BTreeMap;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use super::{
    default_globs, DependencyDeclaration, ManifestError, ManifestReader, ManifestReaderBase,
};
use crate::version::System;

#[derive(Debug, Default, Clone)]
struct RawDependency {
    group_id: Option<String>,
    artifact_id: Option<String>,
    version: Option<String>,
    scope: Option<String>,
}

pub struct MavenReader {
    base: ManifestReaderBase,
}

impl MavenReader {
    pub fn new(
        root: std::path::PathBuf,
        extra_include: Vec<String>,
        extra_exclude: Vec<String>,
        extra_development: Vec<String>,
        extra_modules: Vec<String>,
    ) -> Self {
        let (mut include, mut development, mut exclude) = default_globs(System::Maven);
        include.extend(extra_include);
        development.extend(extra_development);
        exclude.extend(extra_exclude);
        Self {
            base: ManifestReaderBase::new(System::Maven, include, development, exclude, extra_modules, root),
        }
    }
}

/// Parses the `<properties>` block and every `<dependency>` entry (inside or
/// outside `<dependencies>`) from a pom.xml document.
fn parse_pom(contents: &str) -> Result<(BTreeMap<String, String>, Vec<RawDependency>), quick_xml::Error> {
    let mut reader = Reader::from_str(contents);
    reader.config_mut().trim_text(true);

    let mut properties = BTreeMap::new();
    let mut dependencies = Vec::new();

    let mut path: Vec<String> = Vec::new();
    let mut current: Option<RawDependency> = None;
    let mut text_buf = String::new();

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "dependency" {
                    current = Some(RawDependency::default());
                }
                path.push(name);
                text_buf.clear();
            }
            Event::Text(e) => {
                text_buf.push_str(&e.unescape().unwrap_or_default());
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let value = text_buf.trim().to_string();
                text_buf.clear();

                let in_properties = path.len() >= 2 && path[path.len() - 2] == "properties";
                let in_dependency = current.is_some()
                    && path.last().map(String::as_str) != Some("dependency")
                    && path.len() >= 2
                    && path[path.len() - 2] == "dependency";

                if in_properties && !value.is_empty() {
                    properties.insert(name.clone(), value.clone());
                } else if in_dependency {
                    if let Some(dep) = current.as_mut() {
                        match name.as_str() {
                            "groupId" => dep.group_id = Some(value),
                            "artifactId" => dep.artifact_id = Some(value),
                            "version" => dep.version = Some(value),
                            "scope" => dep.scope = Some(value),
                            _ => {}
                        }
                    }
                }

                if name == "dependency" {
                    if let Some(dep) = current.take() {
                        dependencies.push(dep);
                    }
                }
                path.pop();
            }
            _ => {}
        }
        buf.clear();
    }

    Ok((properties, dependencies))
}

/// Resolves a `${...}` reference against `properties`, plus the Maven
/// built-ins used commonly enough to matter for license auditing
/// (`project.version`, `project.groupId`).
fn interpolate(raw: &str, properties: &BTreeMap<String, String>, group_id: &str, version: &str) -> Option<String> {
    if let Some(inner) = raw.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        match inner {
            "project.version" | "pom.version" => Some(version.to_string()),
            "project.groupId" | "pom.groupId" => Some(group_id.to_string()),
            other => properties.get(other).cloned(),
        }
    } else {
        Some(raw.to_string())
    }
}

impl ManifestReader for MavenReader {
    fn system(&self) -> System {
        System::Maven
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
        let (properties, raw_deps) = parse_pom(&contents).map_err(|source| ManifestError::Xml {
            path: path.display().to_string(),
            source,
        })?;
        let origin = path.display().to_string();
        let project_group_id = properties.get("groupId").cloned().unwrap_or_default();
        let project_version = properties.get("version").cloned().unwrap_or_default();

        let mut declarations = Vec::new();
        let mut warnings = Vec::new();
        for dep in raw_deps {
            let group_id = dep.group_id.unwrap_or_default();
            let artifact_id = dep.artifact_id.unwrap_or_default();
            let name = format!("{group_id}:{artifact_id}");

            let version = match dep.version {
                Some(raw) => {
                    let resolved = interpolate(&raw, &properties, &project_group_id, &project_version);
                    if resolved.is_none() {
                        warnings.push(format!(
                            "{origin}: {name}: could not resolve property reference {raw}"
                        ));
                    }
                    resolved
                }
                None => None,
            };

            let (production, development) = if is_development {
                (false, true)
            } else {
                match dep.scope.as_deref() {
                    Some("test" | "provided" | "runtime") => (false, true),
                    _ => (true, false),
                }
            };

            declarations.push(DependencyDeclaration::new(
                System::Maven,
                name,
                version,
                origin.clone(),
                production,
                development,
            ));
        }
        Ok((declarations, warnings))
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
