//! Version catalog fetching
//!
//! A [`PackageCatalog`] is the full descending-sorted set of published
//! versions for one package id, together with the registry endpoint that
//! served it. Registries are tried in their configured priority order and
//! the first one returning at least one version wins; results are never
//! merged across registries. Access failures are recorded against the
//! failing registry and the fetcher moves on, so a dead registry degrades
//! the catalog source rather than the whole audit.

use crate::reference::PackageId;
use crate::session::{RegistryEndpoint, ResolutionSession};
use crate::Result;
use semver::Version;
use std::sync::Arc;

/// All published versions of one package, newest first.
///
/// Immutable once resolved; cached per session keyed by id with a
/// medium-length expiration, since new versions appear over time.
#[derive(Clone)]
pub struct PackageCatalog {
    id: PackageId,
    versions: Vec<Version>,
    registry: Arc<RegistryEndpoint>,
}

impl PackageCatalog {
    pub fn id(&self) -> &PackageId {
        &self.id
    }

    /// Published versions in descending order.
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn newest(&self) -> &Version {
        // A catalog is only built from a non-empty version list.
        &self.versions[0]
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.versions.iter().any(|v| v == version)
    }

    /// The registry endpoint that served this catalog. Metadata and
    /// dependency groups for this package come from the same endpoint.
    pub fn registry(&self) -> &Arc<RegistryEndpoint> {
        &self.registry
    }
}

impl std::fmt::Debug for PackageCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageCatalog")
            .field("id", &self.id)
            .field("versions", &self.versions)
            .field("registry", &self.registry.name())
            .finish()
    }
}

impl ResolutionSession {
    /// Resolve the version catalog for a package id.
    ///
    /// Returns `None` when no configured registry has any version of the id;
    /// the negative result is cached for the same window as a positive one.
    pub async fn catalog(&self, id: &PackageId) -> Result<Option<Arc<PackageCatalog>>> {
        self.ensure_active()?;
        let registries = self.registries().await?;
        self.catalogs
            .get_or_fetch(id.clone(), || fetch_catalog(self, id, registries))
            .await
    }
}

impl ResolutionSession {
    /// Resolve a declared range to the best-matching published version.
    ///
    /// A range that is literally a single pinned version short-circuits to
    /// that exact version without consulting the catalog at all.
    pub async fn resolve_version(
        &self,
        id: &PackageId,
        range: &crate::version::VersionRange,
    ) -> Result<Option<Version>> {
        if let Some(exact) = range.as_exact() {
            return Ok(Some(exact.clone()));
        }
        let Some(catalog) = self.catalog(id).await? else {
            return Ok(None);
        };
        Ok(range.best_match(catalog.versions().iter()).cloned())
    }
}

async fn fetch_catalog(
    session: &ResolutionSession,
    id: &PackageId,
    registries: Arc<Vec<Arc<RegistryEndpoint>>>,
) -> Result<Option<Arc<PackageCatalog>>> {
    for endpoint in registries.iter() {
        session.ensure_active()?;

        // A tripped registry contributes no further results this session.
        if !endpoint.health.is_accessible() {
            continue;
        }

        let fetched = query_versions(endpoint, id).await;
        session.ensure_active()?;

        match fetched {
            Ok(versions) if !versions.is_empty() => {
                let mut versions = versions;
                versions.sort_unstable_by(|a, b| b.cmp(a));
                versions.dedup();
                return Ok(Some(Arc::new(PackageCatalog {
                    id: id.clone(),
                    versions,
                    registry: endpoint.clone(),
                })));
            }
            Ok(_) => continue,
            Err(error) if error.is_cancelled() => return Err(error),
            Err(error) => {
                endpoint
                    .health
                    .record_access_error(&endpoint.access_error(error));
                continue;
            }
        }
    }

    Ok(None)
}

/// Prefer the richer dependency-info query (it additionally confirms
/// listedness); fall back to the plain version list only when the registry
/// signals the operation is categorically unsupported.
async fn query_versions(endpoint: &RegistryEndpoint, id: &PackageId) -> Result<Vec<Version>> {
    if !endpoint.health.dependency_info_supported() {
        return endpoint.client.list_versions(id).await;
    }

    match endpoint.client.dependency_info_versions(id).await {
        Err(error) if error.is_unsupported() => {
            endpoint.health.mark_dependency_info_unsupported();
            endpoint.client.list_versions(id).await
        }
        other => other,
    }
}
