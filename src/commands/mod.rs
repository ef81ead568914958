use anyhow::{Context, Result};
use depmon::solution::Solution;
use depmon::{Config, HttpRegistryClient, RegistryClient, ResolutionSession};
use std::path::Path;
use std::sync::Arc;

pub mod audit;
pub mod tree;
pub mod update;

/// Load user config and the solution snapshot, and build a session over the
/// configured registries.
pub(crate) fn load(solution_path: &Path) -> Result<(ResolutionSession, Solution)> {
    let config = Config::load().context("failed to load configuration")?;
    let solution = Solution::load(solution_path).with_context(|| {
        format!(
            "failed to load solution snapshot {}",
            solution_path.display()
        )
    })?;

    let clients = config
        .registries
        .iter()
        .map(|source| {
            HttpRegistryClient::from_source(source, config.request_timeout())
                .map(|client| Arc::new(client) as Arc<dyn RegistryClient>)
        })
        .collect::<depmon::Result<Vec<_>>>()
        .context("failed to construct registry clients")?;

    let session = ResolutionSession::new(clients, config.session_options());
    Ok((session, solution))
}
