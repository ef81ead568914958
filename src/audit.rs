//! Audit orchestration
//!
//! Ties the resolution layers together for one manifest snapshot: groups the
//! flat reference-entry list by declared identity, resolves every distinct
//! reference to a concrete package concurrently, then runs one transitive
//! walk per project + target-framework pairing. All fan-out goes through the
//! shared [`ResolutionSession`], so concurrent walks deduplicate their
//! registry traffic.

use crate::metadata::PackageInfo;
use crate::reference::{
    PackageId, PackageIdentity, PackageReference, ProjectContext, ProjectTarget, ReferenceEntry,
};
use crate::session::ResolutionSession;
use crate::transitive::{resolve_transitive, TransitiveDependencies};
use crate::Result;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;

/// One distinct declared reference with every entry that declared it and the
/// package it resolved to.
#[derive(Debug)]
pub struct PackageReferenceInfo {
    reference: PackageReference,
    entries: Vec<ReferenceEntry>,
    resolved: Option<Arc<PackageInfo>>,
}

impl PackageReferenceInfo {
    pub fn reference(&self) -> &PackageReference {
        &self.reference
    }

    /// All manifest occurrences of this reference.
    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn projects(&self) -> impl Iterator<Item = &ProjectTarget> {
        self.entries.iter().map(|entry| &entry.project)
    }

    /// The resolved package, or `None` when no configured registry could
    /// satisfy the declared range (or the id is a pseudo-reference).
    pub fn resolved(&self) -> Option<&Arc<PackageInfo>> {
        self.resolved.as_ref()
    }

    pub fn is_used_by(&self, project: &ProjectTarget) -> bool {
        self.entries.iter().any(|entry| &entry.project == project)
    }
}

/// The full result of one audit run.
#[derive(Debug)]
pub struct AuditReport {
    /// Distinct references, sorted by id for stable display.
    pub references: Vec<PackageReferenceInfo>,
    /// One transitive walk result per project + framework pairing.
    pub projects: Vec<TransitiveDependencies>,
}

impl AuditReport {
    /// Every resolved top-level package with at least one reported issue.
    pub fn flagged(&self) -> impl Iterator<Item = &Arc<PackageInfo>> {
        self.references
            .iter()
            .filter_map(|r| r.resolved())
            .filter(|info| info.has_issues())
    }
}

/// Run a full audit over one manifest snapshot.
///
/// `contexts` supplies the central package-management state per project;
/// projects absent from the map audit with defaults.
pub async fn audit(
    session: &ResolutionSession,
    entries: Vec<ReferenceEntry>,
    contexts: &HashMap<ProjectTarget, ProjectContext>,
) -> Result<AuditReport> {
    session.ensure_active()?;

    // Group by declared identity: same id + range across projects is one row.
    let mut grouped: Vec<(PackageReference, Vec<ReferenceEntry>)> = Vec::new();
    for entry in entries {
        match grouped.iter_mut().find(|(r, _)| *r == entry.reference) {
            Some((_, members)) => members.push(entry),
            None => grouped.push((entry.reference.clone(), vec![entry])),
        }
    }
    grouped.sort_by(|(a, _), (b, _)| {
        a.id.cmp(&b.id)
            .then_with(|| a.range.to_string().cmp(&b.range.to_string()))
    });

    let resolutions = join_all(
        grouped
            .iter()
            .map(|(reference, _)| resolve_reference(session, reference)),
    )
    .await;

    let mut references = Vec::with_capacity(grouped.len());
    for ((reference, members), resolved) in grouped.into_iter().zip(resolutions) {
        references.push(PackageReferenceInfo {
            reference,
            entries: members,
            resolved: resolved?,
        });
    }

    // Every project with a reference entry or a context gets a walk; a
    // project can inherit central definitions without declaring anything
    // directly.
    let mut projects: Vec<ProjectTarget> = references
        .iter()
        .flat_map(|r| r.projects().cloned())
        .chain(contexts.keys().cloned())
        .collect();
    projects.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.path.cmp(&b.path))
            .then_with(|| a.framework.to_string().cmp(&b.framework.to_string()))
    });
    projects.dedup();

    let default_context = ProjectContext::default();
    let walks = join_all(projects.iter().map(|project| {
        let context = contexts.get(project).unwrap_or(&default_context);
        walk_project(session, project, context, &references)
    }))
    .await;

    let projects = walks.into_iter().collect::<Result<Vec<_>>>()?;

    Ok(AuditReport {
        references,
        projects,
    })
}

async fn resolve_reference(
    session: &ResolutionSession,
    reference: &PackageReference,
) -> Result<Option<Arc<PackageInfo>>> {
    if session.is_pseudo_reference(&reference.id) {
        return Ok(None);
    }
    let range = reference.pinned_range.as_ref().unwrap_or(&reference.range);
    let Some(version) = session.resolve_version(&reference.id, range).await? else {
        return Ok(None);
    };
    session
        .package_info(&PackageIdentity::new(reference.id.clone(), version))
        .await
}

async fn walk_project(
    session: &ResolutionSession,
    project: &ProjectTarget,
    context: &ProjectContext,
    references: &[PackageReferenceInfo],
) -> Result<TransitiveDependencies> {
    let top_level: Vec<Arc<PackageInfo>> = references
        .iter()
        .filter(|r| r.is_used_by(project))
        .filter_map(|r| r.resolved().cloned())
        .collect();

    let inherited = resolve_inherited(session, project, context, references).await?;

    resolve_transitive(session, project, context, top_level, inherited).await
}

/// Centrally defined versions with no direct reference entry in the project.
/// They still flow into the project's build, so they are resolved and
/// reported, but never traversed.
async fn resolve_inherited(
    session: &ResolutionSession,
    project: &ProjectTarget,
    context: &ProjectContext,
    references: &[PackageReferenceInfo],
) -> Result<HashMap<PackageId, Arc<PackageInfo>>> {
    if !context.central_management_enabled {
        return Ok(HashMap::new());
    }

    let mut candidates = Vec::new();
    for (id, version) in &context.central_versions {
        if session.is_pseudo_reference(id) {
            continue;
        }
        let directly_referenced = references
            .iter()
            .any(|r| &r.reference.id == id && r.is_used_by(project));
        if !directly_referenced {
            candidates.push(PackageIdentity::new(id.clone(), version.clone()));
        }
    }

    let infos = join_all(
        candidates
            .iter()
            .map(|identity| session.package_info(identity)),
    )
    .await;

    let mut inherited = HashMap::new();
    for (identity, info) in candidates.into_iter().zip(infos) {
        if let Some(info) = info? {
            inherited.insert(identity.id, info);
        }
    }
    Ok(inherited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::VersionSource;
    use crate::registry::{PackageMetadata, RegistryClient, Severity, Vulnerability};
    use crate::session::SessionOptions;
    use crate::test_support::{group, ScriptedRegistry};
    use semver::Version;

    fn project(name: &str, framework: &str) -> ProjectTarget {
        ProjectTarget {
            name: name.to_string(),
            path: format!("{name}/{name}.csproj").into(),
            framework: framework.parse().unwrap(),
        }
    }

    fn entry(id: &str, range: &str, project: ProjectTarget) -> ReferenceEntry {
        ReferenceEntry {
            reference: PackageReference::new(id, range.parse().unwrap()),
            project,
            source: VersionSource::Direct,
            private_asset: false,
            justification: None,
        }
    }

    fn session_with(registry: ScriptedRegistry) -> ResolutionSession {
        ResolutionSession::new(
            vec![Arc::new(registry) as Arc<dyn RegistryClient>],
            SessionOptions::default(),
        )
    }

    fn vulnerable_high() -> PackageMetadata {
        PackageMetadata {
            vulnerabilities: vec![Vulnerability {
                severity: Severity::High,
                advisory_url: "https://example.org/advisories/42".to_string(),
            }],
            ..PackageMetadata::default()
        }
    }

    /// Catalog: Foo {1.0, 1.5, 2.0}; Foo@1.5 carries a High advisory and
    /// depends on Bar [1.0,); Bar {1.0, 2.0}.
    fn scenario_registry() -> ScriptedRegistry {
        ScriptedRegistry::named("primary")
            .with_versions("Foo", &["2.0", "1.5", "1.0"])
            .with_metadata("Foo", "1.5", vulnerable_high())
            .with_groups("Foo", "1.5", vec![group("net6.0", &[("Bar", "[1.0,)")])])
            .with_versions("Bar", &["2.0", "1.0"])
            .with_metadata("Bar", "2.0", PackageMetadata::default())
    }

    #[tokio::test]
    async fn test_end_to_end_vulnerable_reference() {
        let session = session_with(scenario_registry());
        let app = project("App", "net6.0");
        let entries = vec![entry("Foo", "[1.0,2.0)", app.clone())];

        let report = audit(&session, entries, &HashMap::new()).await.unwrap();

        assert_eq!(report.references.len(), 1);
        let info = report.references[0].resolved().unwrap();
        assert_eq!(info.version(), &Version::new(1, 5, 0));
        assert!(info.is_vulnerable());
        assert!(info.is_outdated());
        assert_eq!(report.flagged().count(), 1);

        // Bar@2.0 is transitive with Foo@1.5 as its only parent.
        assert_eq!(report.projects.len(), 1);
        let walk = &report.projects[0];
        let bar = PackageIdentity::new("Bar", Version::new(2, 0, 0));
        let (_, parents) = walk.transitive.get(&bar).unwrap();
        let parent_identities: Vec<String> =
            parents.iter().map(|p| p.identity().to_string()).collect();
        assert_eq!(parent_identities, vec!["Foo@1.5.0".to_string()]);
    }

    #[tokio::test]
    async fn test_audit_is_idempotent_within_session() {
        let session = session_with(scenario_registry());
        let app = project("App", "net6.0");
        let entries = vec![entry("Foo", "[1.0,2.0)", app.clone())];

        let first = audit(&session, entries.clone(), &HashMap::new()).await.unwrap();
        let second = audit(&session, entries, &HashMap::new()).await.unwrap();

        let versions = |report: &AuditReport| -> Vec<String> {
            report
                .references
                .iter()
                .filter_map(|r| r.resolved())
                .map(|i| i.identity().to_string())
                .collect()
        };
        assert_eq!(versions(&first), versions(&second));
        assert_eq!(
            first.projects[0].transitive.len(),
            second.projects[0].transitive.len()
        );
    }

    #[tokio::test]
    async fn test_same_reference_in_two_projects_groups_once() {
        let session = session_with(scenario_registry());
        let entries = vec![
            entry("Foo", "[1.0,2.0)", project("App", "net6.0")),
            entry("Foo", "[1.0,2.0)", project("Lib", "net6.0")),
        ];

        let report = audit(&session, entries, &HashMap::new()).await.unwrap();

        assert_eq!(report.references.len(), 1);
        assert_eq!(report.references[0].entries().len(), 2);
        // One walk per project, both seeded with the same resolved node.
        assert_eq!(report.projects.len(), 2);
    }

    #[tokio::test]
    async fn test_unresolvable_reference_reported_without_package() {
        let session = session_with(scenario_registry());
        let entries = vec![entry("Ghost", "[1.0,)", project("App", "net6.0"))];

        let report = audit(&session, entries, &HashMap::new()).await.unwrap();
        assert_eq!(report.references.len(), 1);
        assert!(report.references[0].resolved().is_none());
        assert!(report.projects[0].transitive.is_empty());
    }

    #[tokio::test]
    async fn test_inherited_central_definition_reported_not_traversed() {
        let registry = scenario_registry()
            .with_versions("Central.Only", &["3.0"])
            .with_metadata("Central.Only", "3.0", PackageMetadata::default())
            .with_groups(
                "Central.Only",
                "3.0",
                vec![group("net6.0", &[("Bar", "[1.0,)")])],
            );
        let session = session_with(registry);
        let app = project("App", "net6.0");

        let context = ProjectContext {
            central_management_enabled: true,
            central_versions: HashMap::from([("Central.Only".into(), Version::new(3, 0, 0))]),
            ..ProjectContext::default()
        };
        let contexts = HashMap::from([(app.clone(), context)]);
        let entries = vec![entry("Foo", "[1.0,2.0)", app)];

        let report = audit(&session, entries, &contexts).await.unwrap();
        let walk = &report.projects[0];

        let inherited = walk.inherited.get(&PackageId::new("Central.Only")).unwrap();
        assert_eq!(inherited.version(), &Version::new(3, 0, 0));
        // Not traversed: its dependency group contributes no nodes beyond
        // what Foo already pulled in, and it is not itself transitive.
        assert!(!walk.transitive.contains_id(&"Central.Only".into()));
    }

    #[tokio::test]
    async fn test_project_without_direct_references_still_walked() {
        let registry = ScriptedRegistry::named("primary")
            .with_versions("Central.Only", &["1.0"])
            .with_metadata("Central.Only", "1.0", PackageMetadata::default());
        let session = session_with(registry);
        let app = project("App", "net6.0");

        let context = ProjectContext {
            central_management_enabled: true,
            central_versions: HashMap::from([("Central.Only".into(), Version::new(1, 0, 0))]),
            ..ProjectContext::default()
        };
        let contexts = HashMap::from([(app.clone(), context)]);

        // No reference entries at all; the project exists only via its context.
        let report = audit(&session, Vec::new(), &contexts).await.unwrap();

        assert_eq!(report.projects.len(), 1);
        let walk = &report.projects[0];
        assert_eq!(walk.project, app);
        let inherited = walk.inherited.get(&PackageId::new("Central.Only")).unwrap();
        assert_eq!(inherited.version(), &Version::new(1, 0, 0));
    }

    #[tokio::test]
    async fn test_pinned_range_drives_resolution() {
        let session = session_with(scenario_registry());
        let app = project("App", "net6.0");
        let reference =
            PackageReference::new("Foo", "[1.0,)".parse().unwrap()).pinned(Some("[1.5]".parse().unwrap()));
        let entries = vec![ReferenceEntry {
            reference,
            project: app,
            source: VersionSource::Direct,
            private_asset: false,
            justification: None,
        }];

        let report = audit(&session, entries, &HashMap::new()).await.unwrap();
        let info = report.references[0].resolved().unwrap();
        // Without the pin the range would resolve to 2.0.
        assert_eq!(info.version(), &Version::new(1, 5, 0));
    }

    #[tokio::test]
    async fn test_cancelled_session_aborts_audit() {
        let session = session_with(scenario_registry());
        session.cancel();

        let err = audit(
            &session,
            vec![entry("Foo", "[1.0,2.0)", project("App", "net6.0"))],
            &HashMap::new(),
        )
        .await
        .unwrap_err();
        assert!(err.is_cancelled());
    }
}
