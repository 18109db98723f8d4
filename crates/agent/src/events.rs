//! Host lifecycle events.
//!
//! Handlers register outstanding work on an [`ExtendableEvent`]; the host
//! keeps the agent alive until every registered future settles.

use std::future::Future;

use futures_util::future::{BoxFuture, FutureExt, join_all};
use serde_json::Value;
use swcache_client::FetchRequest;
use swcache_core::Error;

use crate::router::Routed;

/// Event delivered by the host.
#[derive(Debug, Clone)]
pub enum HostEvent {
    Install,
    Activate,
    Message(Value),
    Fetch(FetchRequest),
}

impl HostEvent {
    pub fn name(&self) -> &'static str {
        match self {
            HostEvent::Install => "install",
            HostEvent::Activate => "activate",
            HostEvent::Message(_) => "message",
            HostEvent::Fetch(_) => "fetch",
        }
    }
}

/// What the host should do once a dispatched event settles.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// All deferred work finished.
    Settled,
    /// Deferred work failed; already logged.
    Failed(Error),
    /// The agent answered a fetch.
    Responded(Routed),
    /// The agent declined a fetch; apply default handling.
    Fallthrough,
}

/// Deferral handle carried by lifecycle events.
pub struct ExtendableEvent {
    name: &'static str,
    pending: Vec<BoxFuture<'static, Result<(), Error>>>,
}

impl ExtendableEvent {
    pub fn new(name: &'static str) -> Self {
        Self { name, pending: Vec::new() }
    }

    /// Keep the event open until `work` completes.
    pub fn wait_until<F>(&mut self, work: F)
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        self.pending.push(work.boxed());
    }

    /// Await every deferred future; returns the first failure.
    pub async fn settle(self) -> Result<(), Error> {
        let mut first_error = None;
        for result in join_all(self.pending).await {
            if let Err(e) = result {
                tracing::error!(event = self.name, "deferred work failed: {e}");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
