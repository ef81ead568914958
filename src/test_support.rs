//! In-memory scripted registry for unit tests.

use crate::reference::{PackageId, PackageIdentity};
use crate::registry::{DependencyGroup, PackageMetadata, RegistryClient};
use crate::version::parse_lenient;
use crate::{Error, Result};
use async_trait::async_trait;
use semver::Version;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A scripted registry: fixed data, optional failure modes, call counters.
#[derive(Default)]
pub(crate) struct ScriptedRegistry {
    name: String,
    versions: HashMap<PackageId, Vec<Version>>,
    metadata: HashMap<PackageIdentity, PackageMetadata>,
    groups: HashMap<PackageIdentity, Vec<DependencyGroup>>,
    dependency_info_unsupported: bool,
    unreachable: bool,
    pub list_calls: AtomicUsize,
    pub dependency_info_calls: AtomicUsize,
    pub metadata_calls: AtomicUsize,
    pub group_calls: AtomicUsize,
}

impl ScriptedRegistry {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_versions(mut self, id: &str, versions: &[&str]) -> Self {
        self.versions.insert(
            PackageId::new(id),
            versions.iter().map(|v| parse_lenient(v).unwrap()).collect(),
        );
        self
    }

    pub fn with_metadata(mut self, id: &str, version: &str, metadata: PackageMetadata) -> Self {
        let identity = PackageIdentity::new(id, parse_lenient(version).unwrap());
        self.metadata.insert(identity, metadata);
        self
    }

    pub fn with_groups(mut self, id: &str, version: &str, groups: Vec<DependencyGroup>) -> Self {
        let identity = PackageIdentity::new(id, parse_lenient(version).unwrap());
        self.groups.insert(identity, groups);
        self
    }

    /// The dependency-info query categorically fails on this registry.
    pub fn without_dependency_info(mut self) -> Self {
        self.dependency_info_unsupported = true;
        self
    }

    /// Every call fails with a network-style error.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    fn check_reachable(&self) -> Result<()> {
        if self.unreachable {
            Err(Error::Other(format!("{}: connection refused", self.name)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RegistryClient for ScriptedRegistry {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_versions(&self, id: &PackageId) -> Result<Vec<Version>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        Ok(self.versions.get(id).cloned().unwrap_or_default())
    }

    async fn dependency_info_versions(&self, id: &PackageId) -> Result<Vec<Version>> {
        self.dependency_info_calls.fetch_add(1, Ordering::SeqCst);
        if self.dependency_info_unsupported {
            return Err(Error::UnsupportedOperation {
                registry: self.name.clone(),
                operation: "dependency info".to_string(),
            });
        }
        self.check_reachable()?;
        Ok(self.versions.get(id).cloned().unwrap_or_default())
    }

    async fn metadata(&self, identity: &PackageIdentity) -> Result<Option<PackageMetadata>> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        Ok(self.metadata.get(identity).cloned())
    }

    async fn dependency_groups(&self, identity: &PackageIdentity) -> Result<Vec<DependencyGroup>> {
        self.group_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        Ok(self.groups.get(identity).cloned().unwrap_or_default())
    }
}

/// Shorthand for a dependency group literal.
pub(crate) fn group(framework: &str, deps: &[(&str, &str)]) -> DependencyGroup {
    DependencyGroup {
        target_framework: framework.parse().unwrap(),
        dependencies: deps
            .iter()
            .map(|(id, range)| crate::registry::DeclaredDependency {
                id: PackageId::new(*id),
                range: range.parse().unwrap(),
            })
            .collect(),
    }
}
