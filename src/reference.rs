//! Package identities and manifest reference entries
//!
//! The manifest-reader collaborator hands the engine a flat list of
//! [`ReferenceEntry`] records: one per occurrence of a package reference in a
//! project + target-framework pairing. Entries sharing the same
//! [`PackageReference`] identity (case-insensitive id + declared range) are
//! grouped for display and update propagation.

use crate::framework::TargetFramework;
use crate::version::VersionRange;
use semver::Version;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

/// A case-insensitive package id.
///
/// The original spelling is preserved for display; equality, hashing, and
/// ordering ignore ASCII case so `Newtonsoft.Json` and `newtonsoft.json`
/// name the same package.
#[derive(Debug, Clone)]
pub struct PackageId(String);

impl PackageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for PackageId {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for PackageId {}

impl Hash for PackageId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.0.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
    }
}

impl PartialOrd for PackageId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0
            .bytes()
            .map(|b| b.to_ascii_lowercase())
            .cmp(other.0.bytes().map(|b| b.to_ascii_lowercase()))
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl serde::Serialize for PackageId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for PackageId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self(<String as serde::Deserialize>::deserialize(deserializer)?))
    }
}

impl From<&str> for PackageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PackageId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// A fully resolved package identity: id plus one exact published version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageIdentity {
    pub id: PackageId,
    pub version: Version,
}

impl PackageIdentity {
    pub fn new(id: impl Into<PackageId>, version: Version) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}

/// A declared package reference: id plus a version range, with pin flags.
///
/// Equality and hashing cover only id + range, so entries from different
/// projects declaring the same package at the same range group together.
/// A reference is never mutated when the user applies an update; a new value
/// pinned to the chosen version replaces it (see [`PackageReference::with_version`]).
#[derive(Debug, Clone)]
pub struct PackageReference {
    pub id: PackageId,
    pub range: VersionRange,
    pub is_pinned: bool,
    /// Optional narrower range of acceptable versions for a pinned reference.
    pub pinned_range: Option<VersionRange>,
}

impl PackageReference {
    pub fn new(id: impl Into<PackageId>, range: VersionRange) -> Self {
        Self {
            id: id.into(),
            range,
            is_pinned: false,
            pinned_range: None,
        }
    }

    pub fn pinned(mut self, pinned_range: Option<VersionRange>) -> Self {
        self.is_pinned = true;
        self.pinned_range = pinned_range;
        self
    }

    /// A replacement reference pinned to a chosen concrete version.
    pub fn with_version(&self, version: Version) -> Self {
        Self {
            id: self.id.clone(),
            range: VersionRange::exact(version),
            is_pinned: self.is_pinned,
            pinned_range: self.pinned_range.clone(),
        }
    }
}

impl PartialEq for PackageReference {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.range == other.range
    }
}

impl Eq for PackageReference {}

impl Hash for PackageReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.range.hash(state);
    }
}

/// Which manifest element supplies the version for a reference entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionSource {
    /// A plain `Version` attribute on the reference itself.
    Direct,
    /// A per-project `VersionOverride` shadowing the central version.
    LocalOverride,
    /// The reference inherits the centrally managed version.
    CentralOverride,
    /// The central definition itself (no direct reference in the project).
    CentralDefinition,
}

/// One project + target-framework pairing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectTarget {
    pub name: String,
    /// Path to the project file, for open-in-editor and write-back actions.
    pub path: PathBuf,
    pub framework: TargetFramework,
}

impl fmt::Display for ProjectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.framework)
    }
}

/// Central package-management state for one project.
#[derive(Debug, Clone, Default)]
pub struct ProjectContext {
    pub central_management_enabled: bool,
    pub transitive_pinning_enabled: bool,
    /// Centrally declared versions, keyed by package id.
    pub central_versions: HashMap<PackageId, Version>,
    /// User-supplied vulnerability-mitigation justifications by identity.
    pub mitigations: HashMap<PackageIdentity, String>,
}

/// One concrete occurrence of a package reference inside one project.
///
/// Produced by the manifest-reader collaborator; read-only afterward.
#[derive(Debug, Clone)]
pub struct ReferenceEntry {
    pub reference: PackageReference,
    pub project: ProjectTarget,
    pub source: VersionSource,
    /// Private assets do not flow to consumers of this project, but the
    /// project itself still builds against the package, so the audit treats
    /// the entry like any other. Carried for manifest write-back.
    pub private_asset: bool,
    pub justification: Option<String>,
}
