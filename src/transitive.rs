//! Transitive dependency resolution
//!
//! A breadth-first walk over the declared dependency graph of one project +
//! target-framework pairing. The walk applies three policies at each step:
//!
//! - **Nearest-framework group selection** — each package's dependency group
//!   is chosen by framework compatibility, falling back to the union of all
//!   declared groups rather than silently dropping dependencies (false
//!   positives are preferred over missed vulnerability detections).
//! - **Central transitive pinning** — when the project pins an id centrally
//!   at a higher version than the naturally resolved one, the pinned version
//!   is substituted and annotated.
//! - **Version supersession** — the highest version requested anywhere in
//!   the graph wins per id; lower-version duplicates never displace an
//!   already-resolved higher version, and all parent edges are canonicalized
//!   to the final node per id after the walk.
//!
//! Per-walk context (pinned flag, mitigation justification) lives in an
//! annotation table keyed by identity, not on the cached [`PackageInfo`]
//! nodes, so concurrent walks sharing the session cache can never race on
//! node state.

use crate::framework::select_nearest;
use crate::metadata::PackageInfo;
use crate::reference::{PackageId, PackageIdentity, ProjectContext, ProjectTarget};
use crate::registry::DeclaredDependency;
use crate::session::ResolutionSession;
use crate::Result;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Per-walk annotations for one resolved node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeAnnotations {
    /// Set when the central version map overrode the natural resolution.
    pub pinned: bool,
    /// User-supplied vulnerability-mitigation justification, if any.
    pub mitigation: Option<String>,
}

/// The strictly transitive packages of one walk, as a child → parents map.
///
/// Parent pointers are many-to-many and support rendering a dependency tree
/// upward from any node.
#[derive(Debug, Default)]
pub struct TransitivePackages {
    parents_by_child: HashMap<Arc<PackageInfo>, HashSet<Arc<PackageInfo>>>,
}

impl TransitivePackages {
    pub fn len(&self) -> usize {
        self.parents_by_child.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents_by_child.is_empty()
    }

    pub fn packages(&self) -> impl Iterator<Item = &Arc<PackageInfo>> {
        self.parents_by_child.keys()
    }

    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&Arc<PackageInfo>, &HashSet<Arc<PackageInfo>>)> {
        self.parents_by_child.iter()
    }

    /// Find a transitive node and its parents by identity.
    pub fn get(
        &self,
        identity: &PackageIdentity,
    ) -> Option<(&Arc<PackageInfo>, &HashSet<Arc<PackageInfo>>)> {
        self.parents_by_child
            .iter()
            .find(|(node, _)| node.identity() == identity)
    }

    pub fn contains_id(&self, id: &PackageId) -> bool {
        self.parents_by_child.keys().any(|node| node.id() == id)
    }
}

/// The full result of one transitive walk.
#[derive(Debug)]
pub struct TransitiveDependencies {
    pub project: ProjectTarget,
    /// The top-level resolved package set the walk was seeded with.
    pub top_level: Vec<Arc<PackageInfo>>,
    /// Centrally defined packages inherited by the project without a direct
    /// reference entry; reported but not traversed.
    pub inherited: HashMap<PackageId, Arc<PackageInfo>>,
    pub transitive: TransitivePackages,
    /// Pinned / mitigation annotations for nodes in this walk.
    pub annotations: HashMap<PackageIdentity, NodeAnnotations>,
}

impl TransitiveDependencies {
    pub fn annotations_for(&self, identity: &PackageIdentity) -> Option<&NodeAnnotations> {
        self.annotations.get(identity)
    }

    pub fn is_pinned(&self, identity: &PackageIdentity) -> bool {
        self.annotations
            .get(identity)
            .is_some_and(|a| a.pinned)
    }
}

/// Resolve the strictly transitive dependencies of one project.
///
/// The walk degrades gracefully node-by-node: registry failures surface as
/// "no dependencies found for this node" at the fetch layer and never abort
/// the walk. Only cancellation propagates.
pub async fn resolve_transitive(
    session: &ResolutionSession,
    project: &ProjectTarget,
    context: &ProjectContext,
    top_level: Vec<Arc<PackageInfo>>,
    inherited: HashMap<PackageId, Arc<PackageInfo>>,
) -> Result<TransitiveDependencies> {
    let mut queue: VecDeque<Arc<PackageInfo>> = top_level.iter().cloned().collect();
    let mut visited: HashMap<PackageId, Arc<PackageInfo>> = HashMap::new();
    // Edges are recorded by id and canonicalized through `visited` after the
    // walk, so every edge ends up pointing at the final node per id.
    let mut raw_edges: HashMap<PackageId, HashSet<PackageId>> = HashMap::new();
    let mut annotations: HashMap<PackageIdentity, NodeAnnotations> = HashMap::new();

    while let Some(node) = queue.pop_front() {
        session.ensure_active()?;

        // Supersession: an equal-or-newer version already resolved for this
        // id never gets displaced by a duplicate found elsewhere.
        match visited.get(node.id()) {
            Some(existing) if existing.version() >= node.version() => continue,
            _ => {
                visited.insert(node.id().clone(), node.clone());
            }
        }

        if let Some(justification) = context.mitigations.get(node.identity()) {
            annotations
                .entry(node.identity().clone())
                .or_default()
                .mitigation = Some(justification.clone());
        }

        let groups = session.dependency_groups(node.identity()).await?;
        let declared = select_dependencies(project, &groups);

        for dependency in declared {
            session.ensure_active()?;

            if session.is_pseudo_reference(&dependency.id) {
                continue;
            }

            let Some(mut version) =
                session.resolve_version(&dependency.id, &dependency.range).await?
            else {
                continue;
            };

            let mut pinned = false;
            if context.central_management_enabled && context.transitive_pinning_enabled {
                if let Some(central) = context.central_versions.get(&dependency.id) {
                    if *central > version {
                        version = central.clone();
                        pinned = true;
                    }
                }
            }

            let identity = PackageIdentity::new(dependency.id.clone(), version);
            let Some(child) = session.package_info(&identity).await? else {
                continue;
            };

            if pinned {
                annotations.entry(identity.clone()).or_default().pinned = true;
            }

            raw_edges
                .entry(dependency.id.clone())
                .or_default()
                .insert(node.id().clone());
            queue.push_back(child);
        }
    }

    let top_identities: HashSet<&PackageIdentity> =
        top_level.iter().map(|info| info.identity()).collect();

    let mut parents_by_child = HashMap::new();
    for (child_id, parent_ids) in raw_edges {
        let Some(child) = visited.get(&child_id) else {
            continue;
        };
        // Top-level packages appearing as dependency-graph roots are not
        // transitive; their parent is the project itself.
        if top_identities.contains(child.identity()) {
            continue;
        }
        let parents: HashSet<Arc<PackageInfo>> = parent_ids
            .iter()
            .filter_map(|parent_id| visited.get(parent_id))
            .filter(|parent| parent.identity() != child.identity())
            .cloned()
            .collect();
        if parents.is_empty() {
            continue;
        }
        parents_by_child.insert(child.clone(), parents);
    }

    // Annotations for superseded identities are dropped with their nodes.
    let live: HashSet<PackageIdentity> = visited
        .values()
        .map(|info| info.identity().clone())
        .collect();
    annotations.retain(|identity, _| live.contains(identity));

    Ok(TransitiveDependencies {
        project: project.clone(),
        top_level,
        inherited,
        transitive: TransitivePackages { parents_by_child },
        annotations,
    })
}

/// Pick the declared dependencies for the project's framework, preferring
/// the nearest compatible group and falling back to the union of all groups.
fn select_dependencies(
    project: &ProjectTarget,
    groups: &[crate::registry::DependencyGroup],
) -> Vec<DeclaredDependency> {
    let frameworks: Vec<_> = groups.iter().map(|g| g.target_framework.clone()).collect();
    match select_nearest(&project.framework, &frameworks) {
        Some(index) => groups[index].dependencies.clone(),
        None => groups
            .iter()
            .flat_map(|g| g.dependencies.iter().cloned())
            .collect(),
    }
}
