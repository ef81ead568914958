//! Package registry client trait and metadata types
//!
//! A registry is an opaque external service supporting four operations:
//! list versions by id, resolve dependency-info versions by id (a richer
//! query that additionally confirms listedness, and which some registries
//! cannot serve), get metadata by exact identity (deprecation, vulnerability
//! advisories, project URL), and get declared dependency groups by identity.
//!
//! Any client implementing [`RegistryClient`] is a valid source; the session
//! queries its configured clients in a fixed priority order (see
//! [`crate::catalog`]). The production implementation is
//! [`crate::registry_http::HttpRegistryClient`]; tests substitute in-memory
//! clients.

use crate::reference::{PackageId, PackageIdentity};
use crate::version::VersionRange;
use crate::framework::TargetFramework;
use crate::Result;
use async_trait::async_trait;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Vulnerability advisory severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Moderate,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Low => "Low",
            Severity::Moderate => "Moderate",
            Severity::High => "High",
            Severity::Critical => "Critical",
        };
        f.write_str(label)
    }
}

/// One vulnerability advisory attached to a package version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vulnerability {
    pub severity: Severity,
    pub advisory_url: String,
}

/// A suggested replacement for a deprecated package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlternatePackage {
    pub id: PackageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<VersionRange>,
}

/// Deprecation metadata for a package version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deprecation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate: Option<AlternatePackage>,
}

/// Registry-authoritative metadata for one exact package version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation: Option<Deprecation>,
    #[serde(default)]
    pub vulnerabilities: Vec<Vulnerability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_url: Option<String>,
}

/// One declared dependency: id plus the range the depending package accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclaredDependency {
    pub id: PackageId,
    pub range: VersionRange,
}

/// Raw dependency data from a registry: one group per target framework.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyGroup {
    pub target_framework: TargetFramework,
    #[serde(default)]
    pub dependencies: Vec<DeclaredDependency>,
}

/// A package registry client.
///
/// Implementations must map "the registry has no record" to an empty list or
/// `None` rather than an error, and must surface a categorical inability to
/// serve the dependency-info query as [`crate::Error::UnsupportedOperation`]
/// so the session can degrade that registry to plain queries.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Short name used in logs and health tracking.
    fn name(&self) -> &str;

    /// All published versions of a package, in no particular order.
    /// Empty when the registry has no package with this id.
    async fn list_versions(&self, id: &PackageId) -> Result<Vec<Version>>;

    /// Richer version query that only reports listed versions.
    ///
    /// Returns [`crate::Error::UnsupportedOperation`] when this registry
    /// categorically cannot serve it.
    async fn dependency_info_versions(&self, id: &PackageId) -> Result<Vec<Version>>;

    /// Metadata for one exact version; `None` when the registry has no
    /// record for it (a definitive negative, not an error).
    async fn metadata(&self, identity: &PackageIdentity) -> Result<Option<PackageMetadata>>;

    /// Declared dependency groups for one exact version.
    async fn dependency_groups(&self, identity: &PackageIdentity) -> Result<Vec<DependencyGroup>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Moderate);
        assert!(Severity::Moderate < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_severity_serialization() {
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "\"high\"");
        let parsed: Severity = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(parsed, Severity::Critical);
    }

    #[test]
    fn test_metadata_parse_defaults() {
        let metadata: PackageMetadata = serde_json::from_str("{}").unwrap();
        assert!(metadata.deprecation.is_none());
        assert!(metadata.vulnerabilities.is_empty());
        assert!(metadata.project_url.is_none());
    }

    #[test]
    fn test_metadata_parse_full() {
        let json = r#"{
            "deprecation": {
                "message": "Use Bar instead",
                "reasons": ["Legacy"],
                "alternate": { "id": "Bar", "range": "[2.0,)" }
            },
            "vulnerabilities": [
                { "severity": "high", "advisory_url": "https://example.org/advisories/1" }
            ],
            "project_url": "https://example.org/foo"
        }"#;

        let metadata: PackageMetadata = serde_json::from_str(json).unwrap();
        let deprecation = metadata.deprecation.unwrap();
        assert_eq!(deprecation.message.as_deref(), Some("Use Bar instead"));
        assert_eq!(deprecation.reasons, vec!["Legacy".to_string()]);
        assert_eq!(deprecation.alternate.unwrap().id, PackageId::new("bar"));
        assert_eq!(metadata.vulnerabilities.len(), 1);
        assert_eq!(metadata.vulnerabilities[0].severity, Severity::High);
    }

    #[test]
    fn test_dependency_group_parse() {
        let json = r#"{
            "target_framework": "net6.0",
            "dependencies": [
                { "id": "Bar", "range": "[1.0,)" }
            ]
        }"#;

        let group: DependencyGroup = serde_json::from_str(json).unwrap();
        assert_eq!(group.target_framework, "net6.0".parse().unwrap());
        assert_eq!(group.dependencies.len(), 1);
        assert_eq!(group.dependencies[0].id, PackageId::new("Bar"));
    }
}
