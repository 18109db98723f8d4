//! Agent ↔ foreground-instance messaging.
//!
//! The agent asks every foreground instance for its status by handing each
//! one a dedicated [`MessagePort`]. Replies arrive on the agent-held end and
//! are applied to the shared [`AgentContext`]. Nothing correlates replies to
//! requests; whichever status arrives last wins.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use swcache_core::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::context::AgentContext;
use crate::host::ClientDirectory;

/// One end of a two-endpoint message channel.
#[derive(Debug)]
pub struct MessagePort {
    tx: mpsc::UnboundedSender<Value>,
    rx: mpsc::UnboundedReceiver<Value>,
}

impl MessagePort {
    /// Create two connected endpoints.
    pub fn pair() -> (MessagePort, MessagePort) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (MessagePort { tx: a_tx, rx: a_rx }, MessagePort { tx: b_tx, rx: b_rx })
    }

    /// Send a message to the other end.
    pub fn post(&self, message: Value) -> Result<(), Error> {
        self.tx
            .send(message)
            .map_err(|_| Error::ChannelClosed("peer endpoint dropped".into()))
    }

    /// Next message from the other end; `None` once it is dropped.
    pub async fn recv(&mut self) -> Option<Value> {
        self.rx.recv().await
    }
}

/// Agent → client request asking for a status update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub request_status_update: bool,
}

impl Default for StatusRequest {
    fn default() -> Self {
        Self { request_status_update: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub is_online: bool,
}

/// Client → agent payload. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_update: Option<StatusUpdate>,
}

/// Apply an incoming payload to the context.
///
/// Returns true if the payload carried a status update.
pub async fn handle_incoming(ctx: &AgentContext, payload: &Value) -> bool {
    match serde_json::from_value::<ClientMessage>(payload.clone()) {
        Ok(ClientMessage { status_update: Some(update) }) => {
            ctx.set_online(update.is_online).await;
            tracing::info!(is_online = update.is_online, "client reported status");
            true
        }
        Ok(_) => {
            tracing::debug!("ignoring client message without status update");
            false
        }
        Err(e) => {
            tracing::debug!("ignoring unrecognized client message: {e}");
            false
        }
    }
}

/// Broadcast channel to every foreground instance.
pub struct ClientChannel {
    ctx: Arc<AgentContext>,
    clients: Arc<dyn ClientDirectory>,
}

impl ClientChannel {
    pub fn new(ctx: Arc<AgentContext>, clients: Arc<dyn ClientDirectory>) -> Self {
        Self { ctx, clients }
    }

    /// Post `message` to every foreground instance, controlled or not.
    ///
    /// Each recipient gets its own reply port; a listener task drains it
    /// into [`handle_incoming`]. Returns the listener handles; dropping them
    /// leaves the listeners running. Delivery failures are logged per
    /// recipient.
    pub async fn broadcast(&self, message: Value) -> Result<Vec<JoinHandle<()>>, Error> {
        let clients = self.clients.match_all(true).await?;
        let mut listeners = Vec::with_capacity(clients.len());

        for client in clients {
            let (agent_end, client_end) = MessagePort::pair();
            listeners.push(self.listen(agent_end));

            if let Err(e) = client.post_message(message.clone(), client_end).await {
                tracing::warn!(client = client.id(), "failed to deliver message: {e}");
            }
        }

        tracing::debug!(recipients = listeners.len(), "broadcast sent");
        Ok(listeners)
    }

    /// Handle a payload delivered outside a broadcast reply port.
    pub async fn on_incoming(&self, payload: &Value) -> bool {
        handle_incoming(&self.ctx, payload).await
    }

    fn listen(&self, mut port: MessagePort) -> JoinHandle<()> {
        let ctx = Arc::clone(&self.ctx);
        tokio::spawn(async move {
            while let Some(payload) = port.recv().await {
                handle_incoming(&ctx, &payload).await;
            }
        })
    }
}
