//! Resolution session lifecycle
//!
//! A [`ResolutionSession`] lives for one "solution load": it owns the shared
//! single-flight caches, the cancellation scope, and the prioritized list of
//! registry endpoints. It is created when a solution is opened or refreshed
//! and torn down (cancelling in-flight work, discarding the caches) when the
//! solution closes. Nothing survives across sessions, which guarantees
//! per-session annotations can never leak into a later resolution pass.
//!
//! The registry list is loaded once, asynchronously, on first use; queries
//! issued before the load completes await it.

use crate::cache::SingleFlight;
use crate::catalog::PackageCatalog;
use crate::health::RegistryHealth;
use crate::metadata::PackageInfo;
use crate::reference::{PackageId, PackageIdentity};
use crate::registry::{DependencyGroup, RegistryClient};
use crate::{Error, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tokio_util::sync::CancellationToken;

/// A configured registry paired with its per-session health state.
pub struct RegistryEndpoint {
    pub client: Arc<dyn RegistryClient>,
    pub health: RegistryHealth,
}

impl RegistryEndpoint {
    pub fn new(client: Arc<dyn RegistryClient>) -> Self {
        let health = RegistryHealth::new(client.name().to_string());
        Self { client, health }
    }

    pub fn name(&self) -> &str {
        self.health.registry_name()
    }

    /// Wrap a client failure so the logged error chain names this registry.
    pub fn access_error(&self, source: Error) -> Error {
        Error::RegistryAccess {
            registry: self.name().to_string(),
            source: Box::new(source),
        }
    }
}

/// Session tuning knobs.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Pseudo-reference package ids (declared but never physically present;
    /// they must not appear in the transitive graph).
    pub ignored_ids: Vec<PackageId>,
    /// Catalog entries go stale as new versions are published.
    pub catalog_ttl: Duration,
    /// Per-identity metadata and dependency groups are registry-authoritative
    /// and change rarely within a session.
    pub metadata_ttl: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            ignored_ids: Vec::new(),
            catalog_ttl: Duration::from_secs(20 * 60),
            metadata_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

type RegistryLoadFuture =
    Pin<Box<dyn Future<Output = Result<Vec<Arc<dyn RegistryClient>>>> + Send>>;

/// Shared state for one resolution pass over a solution.
pub struct ResolutionSession {
    options: SessionOptions,
    loader: Mutex<Option<RegistryLoadFuture>>,
    registries: OnceCell<Arc<Vec<Arc<RegistryEndpoint>>>>,
    cancel: CancellationToken,
    pub(crate) catalogs: SingleFlight<PackageId, Option<Arc<PackageCatalog>>>,
    pub(crate) infos: SingleFlight<PackageIdentity, Option<Arc<PackageInfo>>>,
    pub(crate) groups: SingleFlight<PackageIdentity, Arc<Vec<DependencyGroup>>>,
}

impl ResolutionSession {
    /// Create a session over an already-resolved registry list.
    pub fn new(clients: Vec<Arc<dyn RegistryClient>>, options: SessionOptions) -> Self {
        let endpoints: Vec<Arc<RegistryEndpoint>> = clients
            .into_iter()
            .map(|client| Arc::new(RegistryEndpoint::new(client)))
            .collect();
        Self {
            catalogs: SingleFlight::new(options.catalog_ttl),
            infos: SingleFlight::new(options.metadata_ttl),
            groups: SingleFlight::new(options.metadata_ttl),
            options,
            loader: Mutex::new(None),
            registries: OnceCell::new_with(Some(Arc::new(endpoints))),
            cancel: CancellationToken::new(),
        }
    }

    /// Create a session whose registry list is produced asynchronously.
    ///
    /// The loader runs at most once; queries issued before it completes
    /// await the same load.
    pub fn with_loader<F, Fut>(loader: F, options: SessionOptions) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<Arc<dyn RegistryClient>>>> + Send + 'static,
    {
        Self {
            catalogs: SingleFlight::new(options.catalog_ttl),
            infos: SingleFlight::new(options.metadata_ttl),
            groups: SingleFlight::new(options.metadata_ttl),
            options,
            loader: Mutex::new(Some(Box::pin(loader()))),
            registries: OnceCell::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// The prioritized registry endpoints, loading them on first use.
    pub async fn registries(&self) -> Result<Arc<Vec<Arc<RegistryEndpoint>>>> {
        let endpoints = self
            .registries
            .get_or_try_init(|| async {
                let load = {
                    let mut slot = self.loader.lock().await;
                    slot.take().ok_or_else(|| {
                        Error::Other("registry list failed to load earlier this session".to_string())
                    })?
                };
                let clients = load.await?;
                let endpoints: Vec<Arc<RegistryEndpoint>> = clients
                    .into_iter()
                    .map(|client| Arc::new(RegistryEndpoint::new(client)))
                    .collect();
                Ok::<_, Error>(Arc::new(endpoints))
            })
            .await?;
        Ok(endpoints.clone())
    }

    /// Whether an id names a configured pseudo-reference package.
    pub fn is_pseudo_reference(&self, id: &PackageId) -> bool {
        self.options.ignored_ids.iter().any(|ignored| ignored == id)
    }

    /// Cooperative cancellation check; call before and after every registry
    /// round trip and between graph-walk steps.
    pub fn ensure_active(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancel all outstanding work in this session.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for ResolutionSession {
    fn drop(&mut self) {
        // Tearing a session down abandons all in-flight fetches.
        self.cancel.cancel();
    }
}
