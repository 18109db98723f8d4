//! The agent: wires host events to the lifecycle manager, router and
//! client channel.

use std::sync::Arc;

use serde_json::Value;
use swcache_client::{FetchRequest, Network};
use swcache_core::{CacheStore, Error};
use tokio::task::JoinHandle;

use crate::context::AgentContext;
use crate::events::{DispatchOutcome, ExtendableEvent, HostEvent};
use crate::host::{ClientDirectory, Registration};
use crate::lifecycle::LifecycleManager;
use crate::messaging::{ClientChannel, StatusRequest};
use crate::router::{RequestRouter, Routed};

/// Background request-interception agent.
///
/// Cloning is cheap; clones share all state.
#[derive(Clone)]
pub struct ServiceAgent {
    ctx: Arc<AgentContext>,
    lifecycle: Arc<LifecycleManager>,
    router: Arc<RequestRouter>,
    channel: Arc<ClientChannel>,
    clients: Arc<dyn ClientDirectory>,
    registration: Arc<dyn Registration>,
}

impl ServiceAgent {
    pub fn new(
        ctx: Arc<AgentContext>, store: Arc<dyn CacheStore>, network: Arc<dyn Network>,
        clients: Arc<dyn ClientDirectory>, registration: Arc<dyn Registration>,
    ) -> Self {
        Self {
            lifecycle: Arc::new(LifecycleManager::new(Arc::clone(&ctx), Arc::clone(&store), Arc::clone(&network))),
            router: Arc::new(RequestRouter::new(Arc::clone(&ctx), store, network)),
            channel: Arc::new(ClientChannel::new(Arc::clone(&ctx), Arc::clone(&clients))),
            ctx,
            clients,
            registration,
        }
    }

    pub fn context(&self) -> &Arc<AgentContext> {
        &self.ctx
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    /// Startup: announce the agent and ask open pages for their status.
    ///
    /// Failures are logged, never returned.
    pub async fn start(&self) -> Vec<JoinHandle<()>> {
        tracing::info!(version = self.ctx.version(), "agent is starting");
        match self.request_status().await {
            Ok(listeners) => listeners,
            Err(e) => {
                tracing::error!("startup status request failed: {e}");
                Vec::new()
            }
        }
    }

    /// Ask every foreground instance to report whether it is online.
    pub async fn request_status(&self) -> Result<Vec<JoinHandle<()>>, Error> {
        let message = serde_json::to_value(StatusRequest::default())
            .map_err(|e| Error::ChannelClosed(format!("failed to encode status request: {e}")))?;
        self.channel.broadcast(message).await
    }

    pub fn on_install(&self, event: &mut ExtendableEvent) {
        let lifecycle = Arc::clone(&self.lifecycle);
        let registration = Arc::clone(&self.registration);
        event.wait_until(async move { lifecycle.install(registration.as_ref()).await });
    }

    pub fn on_activate(&self, event: &mut ExtendableEvent) {
        let lifecycle = Arc::clone(&self.lifecycle);
        let clients = Arc::clone(&self.clients);
        event.wait_until(async move { lifecycle.activate(clients.as_ref()).await });
    }

    pub fn on_message(&self, event: &mut ExtendableEvent, payload: Value) {
        let channel = Arc::clone(&self.channel);
        event.wait_until(async move {
            channel.on_incoming(&payload).await;
            Ok(())
        });
    }

    pub async fn on_fetch(&self, request: &FetchRequest) -> Option<Routed> {
        self.router.route(request).await
    }

    /// Deliver a host event and wait for it to settle.
    ///
    /// Failures are logged and reported in the outcome; they never panic
    /// or tear down the agent.
    pub async fn dispatch(&self, event: HostEvent) -> DispatchOutcome {
        let name = event.name();
        let mut extendable = ExtendableEvent::new(name);

        match event {
            HostEvent::Install => self.on_install(&mut extendable),
            HostEvent::Activate => self.on_activate(&mut extendable),
            HostEvent::Message(payload) => self.on_message(&mut extendable, payload),
            HostEvent::Fetch(request) => {
                return match self.on_fetch(&request).await {
                    Some(routed) => DispatchOutcome::Responded(routed),
                    None => DispatchOutcome::Fallthrough,
                };
            }
        }

        match extendable.settle().await {
            Ok(()) => DispatchOutcome::Settled,
            Err(e) => DispatchOutcome::Failed(e),
        }
    }
}
