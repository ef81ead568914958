//! depmon - dependency audit engine for project manifests
//!
//! depmon audits a set of software projects for outdated, deprecated, or
//! vulnerable third-party package dependencies, direct and transitive, and
//! computes the manifest edits needed to move to better versions:
//!
//! - Interval version ranges resolved against live registry catalogs
//! - Prioritized multi-registry fallback with per-session health tracking
//! - Per-project transitive graph walks with nearest-framework dependency
//!   group selection and central version pinning
//! - Deprecation and vulnerability advisories aggregated per package
//! - Single-flight session caching so concurrent walks share one fetch
//!
//! # Examples
//!
//! ```no_run
//! use depmon::{audit, Config, HttpRegistryClient, ResolutionSession};
//! use depmon::solution::Solution;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let solution = Solution::load("solution.toml".as_ref())?;
//!
//! let clients = config
//!     .registries
//!     .iter()
//!     .map(|source| {
//!         HttpRegistryClient::from_source(source, config.request_timeout())
//!             .map(|client| Arc::new(client) as Arc<dyn depmon::RegistryClient>)
//!     })
//!     .collect::<depmon::Result<Vec<_>>>()?;
//!
//! let session = ResolutionSession::new(clients, config.session_options());
//! let report = audit(&session, solution.entries, &solution.contexts).await?;
//!
//! println!("{} packages flagged", report.flagged().count());
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`reference`] - Package ids, identities, and manifest reference entries
//! - [`version`] - Lenient version parsing and interval version ranges
//! - [`framework`] - Target framework monikers and nearest-match selection
//! - [`registry`] - Registry client trait and advisory metadata types
//! - [`registry_http`] - HTTP registry client
//! - [`session`] - Resolution session: caches, registries, cancellation
//! - [`catalog`] - Version catalog fetching with registry fallback
//! - [`metadata`] - Per-version metadata and issue detection
//! - [`transitive`] - Transitive dependency graph resolution
//! - [`audit`] - Audit orchestration across projects
//! - [`update`] - Manifest update computation
//! - [`solution`] - Solution snapshot loading
//! - [`config`] - User configuration management
//! - [`error`] - Error types and result handling

pub mod audit;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod framework;
pub mod groups;
pub mod health;
pub mod metadata;
pub mod reference;
pub mod registry;
pub mod registry_http;
pub mod session;
pub mod solution;
pub mod transitive;
pub mod update;
pub mod version;

#[cfg(test)]
pub(crate) mod test_support;

pub use audit::{audit, AuditReport, PackageReferenceInfo};
pub use catalog::PackageCatalog;
pub use config::{Config, RegistrySource};
pub use error::{Error, Result};
pub use framework::TargetFramework;
pub use metadata::PackageInfo;
pub use reference::{
    PackageId, PackageIdentity, PackageReference, ProjectContext, ProjectTarget, ReferenceEntry,
    VersionSource,
};
pub use registry::{
    DeclaredDependency, DependencyGroup, Deprecation, PackageMetadata, RegistryClient, Severity,
    Vulnerability,
};
pub use registry_http::HttpRegistryClient;
pub use session::{ResolutionSession, SessionOptions};
pub use transitive::{resolve_transitive, TransitiveDependencies};
pub use update::{latest_matching, plan_update, UpdateItem, VersionUpdate};
pub use version::VersionRange;
