//! Update computation
//!
//! Translates a chosen target version for one declared reference into the
//! concrete manifest edits a writer collaborator must apply. The engine never
//! touches project files itself; it only describes the edits: which file,
//! which item kind, which id to match, and the new version string.
//!
//! One reference can fan out to several edits. A centrally managed version is
//! updated once in the central definition file regardless of how many
//! projects consume it, while direct attributes and local overrides are
//! updated per project file.

use crate::audit::PackageReferenceInfo;
use crate::reference::{PackageId, VersionSource};
use semver::Version;
use std::collections::HashSet;
use std::path::PathBuf;

/// The manifest item kind an update applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateItem {
    /// The `Version` attribute on the reference item itself.
    ReferenceVersion,
    /// A per-project `VersionOverride` attribute.
    LocalOverride,
    /// The centrally managed version definition.
    CentralDefinition,
}

/// One manifest edit: set the version for `id` on `item` in `file`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionUpdate {
    pub file: PathBuf,
    pub item: UpdateItem,
    pub id: PackageId,
    pub new_version: Version,
}

impl std::fmt::Display for VersionUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let item = match self.item {
            UpdateItem::ReferenceVersion => "version",
            UpdateItem::LocalOverride => "version override",
            UpdateItem::CentralDefinition => "central definition",
        };
        write!(
            f,
            "{}: {} {} -> {}",
            self.file.display(),
            item,
            self.id,
            self.new_version
        )
    }
}

/// Compute the edit set that moves one declared reference to `new_version`.
///
/// `central_file` names the file holding central version definitions; it is
/// only consulted for entries whose version comes from central management.
/// A central-sourced entry without a known central file cannot be expressed
/// as an edit; it is skipped with a warning.
pub fn plan_update(
    reference: &PackageReferenceInfo,
    new_version: &Version,
    central_file: Option<&PathBuf>,
) -> Vec<VersionUpdate> {
    let mut seen = HashSet::new();
    let mut updates = Vec::new();

    for entry in reference.entries() {
        let update = match entry.source {
            VersionSource::Direct => VersionUpdate {
                file: entry.project.path.clone(),
                item: UpdateItem::ReferenceVersion,
                id: entry.reference.id.clone(),
                new_version: new_version.clone(),
            },
            VersionSource::LocalOverride => VersionUpdate {
                file: entry.project.path.clone(),
                item: UpdateItem::LocalOverride,
                id: entry.reference.id.clone(),
                new_version: new_version.clone(),
            },
            VersionSource::CentralOverride | VersionSource::CentralDefinition => {
                let Some(file) = central_file else {
                    tracing::warn!(
                        id = %entry.reference.id,
                        project = %entry.project,
                        "no central definition file known, skipping the central version edit"
                    );
                    continue;
                };
                VersionUpdate {
                    file: file.clone(),
                    item: UpdateItem::CentralDefinition,
                    id: entry.reference.id.clone(),
                    new_version: new_version.clone(),
                }
            }
        };
        if seen.insert(update.clone()) {
            updates.push(update);
        }
    }

    updates
}

/// The newest published version of matching stability for a resolved
/// reference, when it is ahead of the current resolution.
pub fn latest_matching(reference: &PackageReferenceInfo) -> Option<Version> {
    let info = reference.resolved()?;
    if !info.is_outdated() {
        return None;
    }
    let prerelease = crate::version::is_prerelease(info.version());
    info.catalog()
        .versions()
        .iter()
        .find(|v| crate::version::is_prerelease(v) == prerelease)
        .cloned()
}
