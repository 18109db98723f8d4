//! Process-wide agent state.
//!
//! One [`AgentContext`] exists per agent instance and is shared by every
//! handler. It owns the deployment identity (origin, version, manifest) and
//! the only mutable agent-wide state: the lifecycle state and the online
//! status reported by foreground instances.

use std::fmt;

use swcache_client::parse_origin;
use swcache_core::{AgentConfig, Error, Manifest, VersionRegistry};
use tokio::sync::RwLock;
use url::Url;

/// Agent lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Unregistered,
    Installing,
    Installed,
    Activating,
    Activated,
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentState::Unregistered => "unregistered",
            AgentState::Installing => "installing",
            AgentState::Installed => "installed",
            AgentState::Activating => "activating",
            AgentState::Activated => "activated",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct AgentContext {
    origin: Url,
    registry: VersionRegistry,
    manifest: Manifest,
    /// Unset until a foreground instance reports in.
    online: RwLock<Option<bool>>,
    state: RwLock<AgentState>,
}

impl AgentContext {
    pub fn new(origin: Url, registry: VersionRegistry, manifest: Manifest) -> Self {
        Self {
            origin,
            registry,
            manifest,
            online: RwLock::new(None),
            state: RwLock::new(AgentState::Unregistered),
        }
    }

    pub fn from_config(config: &AgentConfig) -> Result<Self, Error> {
        let origin = parse_origin(&config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self::new(origin, config.version_registry(), config.manifest()))
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn registry(&self) -> &VersionRegistry {
        &self.registry
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn version(&self) -> u32 {
        self.registry.version()
    }

    pub fn active_cache_name(&self) -> String {
        self.registry.active_cache_name()
    }

    pub async fn online_status(&self) -> Option<bool> {
        *self.online.read().await
    }

    pub async fn set_online(&self, online: bool) {
        *self.online.write().await = Some(online);
    }

    pub async fn state(&self) -> AgentState {
        *self.state.read().await
    }

    /// Move to `to` if the current state is one of `from`.
    ///
    /// Returns the state that was replaced.
    pub async fn transition(&self, from: &[AgentState], to: AgentState) -> Result<AgentState, Error> {
        let mut state = self.state.write().await;
        let previous = *state;
        if !from.contains(&previous) {
            return Err(Error::InvalidTransition { from: previous.to_string(), to: to.to_string() });
        }
        *state = to;
        tracing::debug!(%previous, next = %to, "agent state changed");
        Ok(previous)
    }
}
