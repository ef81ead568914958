//! Package metadata resolution
//!
//! A [`PackageInfo`] is a fully resolved package identity plus everything
//! the audit needs to know about it: deprecation, vulnerability advisories,
//! project URL, and whether a newer version of matching stability exists.
//!
//! `PackageInfo` is immutable and equal by identity only; the transitive
//! graph treats two instances with the same id + version as the same node
//! regardless of which traversal path produced them. Context-dependent
//! annotations (pinned flag, mitigation justification) live in a per-walk
//! annotation table instead (see [`crate::transitive`]), so a cached node
//! is never written to after construction.

use crate::catalog::PackageCatalog;
use crate::reference::{PackageId, PackageIdentity};
use crate::registry::{Deprecation, PackageMetadata, Vulnerability};
use crate::session::ResolutionSession;
use crate::version::is_prerelease;
use crate::Result;
use semver::Version;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A resolved package identity with its registry-authoritative metadata.
#[derive(Clone)]
pub struct PackageInfo {
    identity: PackageIdentity,
    catalog: Arc<PackageCatalog>,
    metadata: PackageMetadata,
    outdated: bool,
}

impl PackageInfo {
    pub fn identity(&self) -> &PackageIdentity {
        &self.identity
    }

    pub fn id(&self) -> &PackageId {
        &self.identity.id
    }

    pub fn version(&self) -> &Version {
        &self.identity.version
    }

    pub fn catalog(&self) -> &Arc<PackageCatalog> {
        &self.catalog
    }

    pub fn is_outdated(&self) -> bool {
        self.outdated
    }

    pub fn deprecation(&self) -> Option<&Deprecation> {
        self.metadata.deprecation.as_ref()
    }

    pub fn is_deprecated(&self) -> bool {
        self.metadata.deprecation.is_some()
    }

    pub fn vulnerabilities(&self) -> &[Vulnerability] {
        &self.metadata.vulnerabilities
    }

    pub fn is_vulnerable(&self) -> bool {
        !self.metadata.vulnerabilities.is_empty()
    }

    pub fn project_url(&self) -> Option<&str> {
        self.metadata.project_url.as_deref()
    }

    pub fn has_issues(&self) -> bool {
        self.outdated || self.is_deprecated() || self.is_vulnerable()
    }

    /// Short human-readable issue summary, e.g. `outdated, 1 vulnerability`.
    pub fn issue_summary(&self) -> Option<String> {
        let mut parts = Vec::new();
        if self.outdated {
            parts.push("outdated".to_string());
        }
        if self.is_deprecated() {
            parts.push("deprecated".to_string());
        }
        match self.metadata.vulnerabilities.len() {
            0 => {}
            1 => parts.push("1 vulnerability".to_string()),
            n => parts.push(format!("{} vulnerabilities", n)),
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

impl PartialEq for PackageInfo {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for PackageInfo {}

impl Hash for PackageInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

impl std::fmt::Debug for PackageInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageInfo")
            .field("identity", &self.identity.to_string())
            .field("outdated", &self.outdated)
            .field("deprecated", &self.is_deprecated())
            .field("vulnerabilities", &self.metadata.vulnerabilities.len())
            .finish()
    }
}

/// Outdated policy: compare against the first catalog entry (newest-first)
/// whose prerelease flag matches the identity's own. If no catalog version
/// shares the flag, the baseline defaults to 0.0.0, which never compares
/// greater, so the package is reported up to date.
fn compute_outdated(identity: &PackageIdentity, catalog: &PackageCatalog) -> bool {
    let prerelease = is_prerelease(&identity.version);
    match catalog
        .versions()
        .iter()
        .find(|v| is_prerelease(v) == prerelease)
    {
        Some(baseline) => *baseline > identity.version,
        None => false,
    }
}

impl ResolutionSession {
    /// Resolve full package info for one exact identity.
    ///
    /// Returns `None` when the id is unknown to every registry or the
    /// serving registry has no metadata record for the exact version; both
    /// are definitive negatives and are cached without retry.
    pub async fn package_info(
        &self,
        identity: &PackageIdentity,
    ) -> Result<Option<Arc<PackageInfo>>> {
        self.ensure_active()?;
        self.infos
            .get_or_fetch(identity.clone(), || fetch_info(self, identity))
            .await
    }
}

async fn fetch_info(
    session: &ResolutionSession,
    identity: &PackageIdentity,
) -> Result<Option<Arc<PackageInfo>>> {
    let Some(catalog) = session.catalog(&identity.id).await? else {
        return Ok(None);
    };

    let endpoint = catalog.registry().clone();
    if !endpoint.health.is_accessible() {
        return Ok(None);
    }

    session.ensure_active()?;
    let metadata = match endpoint.client.metadata(identity).await {
        Ok(metadata) => metadata,
        Err(error) if error.is_cancelled() => return Err(error),
        Err(error) => {
            endpoint
                .health
                .record_access_error(&endpoint.access_error(error));
            return Ok(None);
        }
    };
    session.ensure_active()?;

    let Some(metadata) = metadata else {
        // No record for this exact version: a definitive negative.
        return Ok(None);
    };

    let outdated = compute_outdated(identity, &catalog);
    Ok(Some(Arc::new(PackageInfo {
        identity: identity.clone(),
        catalog,
        metadata,
        outdated,
    })))
}
