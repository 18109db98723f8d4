//! Cache generation lifecycle.
//!
//! ### Install
//! - Skip waiting, so the new generation takes over as soon as it is
//!   installed instead of after every old page closes
//!
//! ### Activate
//! 1. Claim every open foreground instance
//! 2. Sweep stale generations (`reconcile_generations`)
//! 3. Refresh the manifest in the active generation (`populate_manifest`)
//!
//! Step 2 finishes before step 3 starts.

use std::sync::Arc;

use futures_util::future::join_all;
use swcache_client::{FetchRequest, Network, resolve};
use swcache_core::{CacheHandle, CacheStore, Error};

use crate::context::{AgentContext, AgentState};
use crate::host::{ClientDirectory, Registration};

/// Outcome of a manifest population pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulateReport {
    /// Entries fetched and stored.
    pub stored: usize,
    /// Entries already present and left alone.
    pub skipped: usize,
    /// Entries that could not be fetched or stored.
    pub failed: usize,
}

enum EntryOutcome {
    Stored,
    Skipped,
    Failed,
}

pub struct LifecycleManager {
    ctx: Arc<AgentContext>,
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
}

impl LifecycleManager {
    pub fn new(ctx: Arc<AgentContext>, store: Arc<dyn CacheStore>, network: Arc<dyn Network>) -> Self {
        Self { ctx, store, network }
    }

    /// Install: `Unregistered → Installing → Installed`.
    ///
    /// Installing again once `Installed` is a no-op, and overlapping
    /// installs both succeed.
    pub async fn install(&self, registration: &dyn Registration) -> Result<(), Error> {
        if self.ctx.state().await == AgentState::Installed {
            tracing::debug!("agent already installed");
            return Ok(());
        }

        self.ctx
            .transition(&[AgentState::Unregistered, AgentState::Installing], AgentState::Installing)
            .await?;

        registration.skip_waiting().await?;
        self.ctx
            .transition(&[AgentState::Installing, AgentState::Installed], AgentState::Installed)
            .await?;

        tracing::info!(version = self.ctx.version(), "agent installed");
        Ok(())
    }

    /// Activate: `Installed → Activating → Activated`.
    ///
    /// A failed activation stays in `Activating` and may be retried.
    pub async fn activate(&self, clients: &dyn ClientDirectory) -> Result<(), Error> {
        self.ctx
            .transition(&[AgentState::Installed, AgentState::Activating], AgentState::Activating)
            .await?;

        let claimed = clients.claim().await?;
        tracing::debug!(claimed, "claimed foreground instances");

        self.reconcile_generations().await?;
        let report = self.populate_manifest(true).await?;

        self.ctx
            .transition(&[AgentState::Activating], AgentState::Activated)
            .await?;

        tracing::info!(
            version = self.ctx.version(),
            stored = report.stored,
            failed = report.failed,
            "agent activated"
        );
        Ok(())
    }

    /// Ensure every manifest path has an entry in the active generation.
    ///
    /// Without `force_refresh`, paths that already have an entry are left
    /// alone. Failures are isolated per path and counted in the report; only
    /// failing to open the active generation is an error.
    pub async fn populate_manifest(&self, force_refresh: bool) -> Result<PopulateReport, Error> {
        let cache = self.store.open(&self.ctx.active_cache_name()).await?;
        let manifest = self.ctx.manifest();
        if manifest.is_empty() {
            tracing::debug!(cache = cache.name(), "manifest is empty, nothing to populate");
            return Ok(PopulateReport::default());
        }

        let outcomes = join_all(
            manifest
                .iter()
                .map(|path| self.populate_entry(&cache, path, force_refresh)),
        )
        .await;

        let mut report = PopulateReport::default();
        for outcome in outcomes {
            match outcome {
                EntryOutcome::Stored => report.stored += 1,
                EntryOutcome::Skipped => report.skipped += 1,
                EntryOutcome::Failed => report.failed += 1,
            }
        }

        tracing::debug!(
            cache = cache.name(),
            entries = manifest.len(),
            force_refresh,
            stored = report.stored,
            skipped = report.skipped,
            failed = report.failed,
            "manifest populated"
        );
        Ok(report)
    }

    async fn populate_entry(&self, cache: &CacheHandle, path: &str, force_refresh: bool) -> EntryOutcome {
        if !force_refresh {
            match self.store.get(cache, path).await {
                Ok(Some(_)) => return EntryOutcome::Skipped,
                Ok(None) => {}
                Err(e) => tracing::warn!(path, "cache lookup failed, refetching: {e}"),
            }
        }

        let url = match resolve(self.ctx.origin(), path) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(path, "skipping manifest entry: {e}");
                return EntryOutcome::Failed;
            }
        };

        let response = match self.network.fetch(&FetchRequest::get(url).uncredentialed()).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(path, "manifest fetch failed: {e}");
                return EntryOutcome::Failed;
            }
        };

        if !response.status.is_success() {
            tracing::warn!(path, status = response.status.as_u16(), "manifest fetch returned non-success status");
            return EntryOutcome::Failed;
        }

        match self.store.put(cache, path, &response.snapshot()).await {
            Ok(()) => EntryOutcome::Stored,
            Err(e) => {
                tracing::warn!(path, "failed to store manifest entry: {e}");
                EntryOutcome::Failed
            }
        }
    }

    /// Delete every generation of this agent other than the active one.
    ///
    /// Only names of the form `{prefix}-<positive integer>` are touched.
    /// Deletions run concurrently; one failing does not stop the others.
    /// Returns the names that were deleted.
    pub async fn reconcile_generations(&self) -> Result<Vec<String>, Error> {
        let registry = self.ctx.registry();
        let stale: Vec<String> = self
            .store
            .list_names()
            .await?
            .into_iter()
            .filter(|name| registry.is_stale(name))
            .collect();

        let results = join_all(stale.iter().map(|name| self.store.delete(name))).await;

        let mut deleted = Vec::new();
        for (name, result) in stale.into_iter().zip(results) {
            match result {
                Ok(true) => {
                    tracing::info!(cache = %name, "deleted stale cache generation");
                    deleted.push(name);
                }
                Ok(false) => tracing::debug!(cache = %name, "stale generation already gone"),
                Err(e) => tracing::warn!(cache = %name, "failed to delete stale generation: {e}"),
            }
        }
        Ok(deleted)
    }
}
