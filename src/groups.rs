//! Dependency group fetching
//!
//! Fetches the raw declared dependency groups (one per target framework)
//! for an exact package identity from the registry that serves it. Any
//! registry failure here degrades to "no dependencies found for this node"
//! so a single dead package can never abort an in-progress graph walk.

use crate::reference::PackageIdentity;
use crate::registry::DependencyGroup;
use crate::session::ResolutionSession;
use crate::Result;
use std::sync::Arc;

impl ResolutionSession {
    /// Declared dependency groups for one exact identity.
    ///
    /// Pseudo-reference packages (configured ignore ids) return an empty
    /// list without any network call: they are declared but never
    /// physically included in a build, and must not pollute the transitive
    /// graph or trigger spurious vulnerability warnings.
    pub async fn dependency_groups(
        &self,
        identity: &PackageIdentity,
    ) -> Result<Arc<Vec<DependencyGroup>>> {
        self.ensure_active()?;

        if self.is_pseudo_reference(&identity.id) {
            return Ok(Arc::new(Vec::new()));
        }

        self.groups
            .get_or_fetch(identity.clone(), || fetch_groups(self, identity))
            .await
    }
}

async fn fetch_groups(
    session: &ResolutionSession,
    identity: &PackageIdentity,
) -> Result<Arc<Vec<DependencyGroup>>> {
    let Some(catalog) = session.catalog(&identity.id).await? else {
        return Ok(Arc::new(Vec::new()));
    };

    let endpoint = catalog.registry().clone();
    if !endpoint.health.is_accessible() {
        return Ok(Arc::new(Vec::new()));
    }

    session.ensure_active()?;
    let groups = match endpoint.client.dependency_groups(identity).await {
        Ok(groups) => groups,
        Err(error) if error.is_cancelled() => return Err(error),
        Err(error) => {
            endpoint
                .health
                .record_access_error(&endpoint.access_error(error));
            Vec::new()
        }
    };
    session.ensure_active()?;

    Ok(Arc::new(groups))
}
