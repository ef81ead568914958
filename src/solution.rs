//! Solution snapshot loading
//!
//! The engine does not parse project manifests itself; a reader collaborator
//! serializes the solution state (projects, frameworks, reference entries,
//! central version maps, mitigation justifications) into a TOML snapshot,
//! and this module turns that snapshot into the engine's input types.
//!
//! # Examples
//!
//! ```
//! use depmon::solution::Solution;
//!
//! let solution = Solution::from_toml(
//!     r#"
//!     [[project]]
//!     name = "App"
//!     path = "App/App.csproj"
//!     framework = "net6.0"
//!
//!     [[project.reference]]
//!     id = "Newtonsoft.Json"
//!     version = "[13.0,)"
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(solution.entries.len(), 1);
//! ```

use crate::reference::{
    PackageIdentity, PackageReference, ProjectContext, ProjectTarget, ReferenceEntry,
    VersionSource,
};
use crate::version::{parse_lenient, VersionRange};
use crate::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A fully loaded solution snapshot: engine input plus write-back hints.
#[derive(Debug, Default)]
pub struct Solution {
    /// The file holding central version definitions, for update write-back.
    pub central_file: Option<PathBuf>,
    pub entries: Vec<ReferenceEntry>,
    pub contexts: HashMap<ProjectTarget, ProjectContext>,
}

impl Solution {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let file: SolutionFile = toml::from_str(text)?;
        file.try_into()
    }

    pub fn projects(&self) -> impl Iterator<Item = &ProjectTarget> {
        self.contexts.keys()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct SolutionFile {
    central_file: Option<PathBuf>,
    #[serde(default, rename = "project")]
    projects: Vec<ProjectSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct ProjectSection {
    name: String,
    path: PathBuf,
    framework: crate::framework::TargetFramework,
    #[serde(default)]
    central_management: bool,
    #[serde(default)]
    transitive_pinning: bool,
    /// Centrally declared versions, id -> lenient version string.
    #[serde(default)]
    central_versions: HashMap<String, String>,
    #[serde(default, rename = "reference")]
    references: Vec<ReferenceSection>,
    #[serde(default, rename = "mitigation")]
    mitigations: Vec<MitigationSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct ReferenceSection {
    id: String,
    version: VersionRange,
    #[serde(default = "SourceDto::direct")]
    source: SourceDto,
    #[serde(default)]
    pinned: bool,
    pinned_version: Option<VersionRange>,
    #[serde(default)]
    private_assets: bool,
    justification: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct MitigationSection {
    id: String,
    version: String,
    justification: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum SourceDto {
    Direct,
    LocalOverride,
    CentralOverride,
    CentralDefinition,
}

impl SourceDto {
    fn direct() -> Self {
        Self::Direct
    }
}

impl From<SourceDto> for VersionSource {
    fn from(dto: SourceDto) -> Self {
        match dto {
            SourceDto::Direct => VersionSource::Direct,
            SourceDto::LocalOverride => VersionSource::LocalOverride,
            SourceDto::CentralOverride => VersionSource::CentralOverride,
            SourceDto::CentralDefinition => VersionSource::CentralDefinition,
        }
    }
}

impl TryFrom<SolutionFile> for Solution {
    type Error = crate::Error;

    fn try_from(file: SolutionFile) -> Result<Self> {
        let mut entries = Vec::new();
        let mut contexts = HashMap::new();

        for section in file.projects {
            let target = ProjectTarget {
                name: section.name,
                path: section.path,
                framework: section.framework,
            };
            if contexts.contains_key(&target) {
                return Err(crate::Error::InvalidSolution(format!(
                    "duplicate project entry '{}'",
                    target
                )));
            }

            let mut central_versions = HashMap::new();
            for (id, version) in section.central_versions {
                central_versions.insert(id.into(), parse_lenient(&version)?);
            }

            let mut mitigations = HashMap::new();
            for mitigation in section.mitigations {
                let identity =
                    PackageIdentity::new(mitigation.id, parse_lenient(&mitigation.version)?);
                mitigations.insert(identity, mitigation.justification);
            }

            for reference in section.references {
                if file.central_file.is_none()
                    && matches!(
                        reference.source,
                        SourceDto::CentralOverride | SourceDto::CentralDefinition
                    )
                {
                    return Err(crate::Error::InvalidSolution(format!(
                        "reference '{}' uses a centrally managed version but no central-file is set",
                        reference.id
                    )));
                }
                let mut declared = PackageReference::new(reference.id, reference.version);
                if reference.pinned || reference.pinned_version.is_some() {
                    declared = declared.pinned(reference.pinned_version);
                }
                entries.push(ReferenceEntry {
                    reference: declared,
                    project: target.clone(),
                    source: reference.source.into(),
                    private_asset: reference.private_assets,
                    justification: reference.justification,
                });
            }

            contexts.insert(
                target,
                ProjectContext {
                    central_management_enabled: section.central_management,
                    transitive_pinning_enabled: section.transitive_pinning,
                    central_versions,
                    mitigations,
                },
            );
        }

        Ok(Solution {
            central_file: file.central_file,
            entries,
            contexts,
        })
    }
}
