//! Host capabilities the agent consumes, and an in-process host.
//!
//! The agent never reaches host globals directly. Foreground instances,
//! the registration handle and (in `swcache-client`) the network are
//! injected through these traits, so the same agent runs against a browser
//! binding, the native `swcache-host` binary, or test fakes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{Value, json};
use swcache_core::Error;

use crate::messaging::{MessagePort, StatusRequest};

/// An open page that the agent may control.
#[async_trait]
pub trait Client: Send + Sync {
    fn id(&self) -> &str;

    /// Deliver a message along with the port the page should reply on.
    async fn post_message(&self, message: Value, port: MessagePort) -> Result<(), Error>;
}

/// Directory of foreground instances.
#[async_trait]
pub trait ClientDirectory: Send + Sync {
    /// Every known instance; uncontrolled ones only when asked.
    async fn match_all(&self, include_uncontrolled: bool) -> Result<Vec<Arc<dyn Client>>, Error>;

    /// Take control of every open instance. Returns how many changed hands.
    async fn claim(&self) -> Result<usize, Error>;
}

/// The agent's registration with its host.
#[async_trait]
pub trait Registration: Send + Sync {
    /// Activate as soon as installed instead of waiting for old pages to close.
    async fn skip_waiting(&self) -> Result<(), Error>;
}

/// In-process page that answers status requests with a fixed online flag.
#[derive(Debug)]
pub struct LocalClient {
    id: String,
    controlled: AtomicBool,
    online: bool,
    received: Mutex<Vec<Value>>,
}

impl LocalClient {
    pub fn new(id: impl Into<String>, controlled: bool, online: bool) -> Self {
        Self {
            id: id.into(),
            controlled: AtomicBool::new(controlled),
            online,
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn is_controlled(&self) -> bool {
        self.controlled.load(Ordering::SeqCst)
    }

    /// Messages delivered so far, oldest first.
    pub fn received(&self) -> Vec<Value> {
        self.received.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Client for LocalClient {
    fn id(&self) -> &str {
        &self.id
    }

    async fn post_message(&self, message: Value, port: MessagePort) -> Result<(), Error> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());

        let wants_status = serde_json::from_value::<StatusRequest>(message)
            .map(|m| m.request_status_update)
            .unwrap_or(false);
        if wants_status {
            port.post(json!({ "statusUpdate": { "isOnline": self.online } }))?;
        }
        // Dropping the port closes the reply channel.
        Ok(())
    }
}

/// In-process [`ClientDirectory`].
#[derive(Debug, Default)]
pub struct LocalClients {
    clients: Vec<Arc<LocalClient>>,
}

impl LocalClients {
    pub fn new(clients: Vec<LocalClient>) -> Self {
        Self { clients: clients.into_iter().map(Arc::new).collect() }
    }

    pub fn get(&self, id: &str) -> Option<Arc<LocalClient>> {
        self.clients.iter().find(|c| c.id == id).cloned()
    }
}

#[async_trait]
impl ClientDirectory for LocalClients {
    async fn match_all(&self, include_uncontrolled: bool) -> Result<Vec<Arc<dyn Client>>, Error> {
        Ok(self
            .clients
            .iter()
            .filter(|c| include_uncontrolled || c.is_controlled())
            .map(|c| Arc::clone(c) as Arc<dyn Client>)
            .collect())
    }

    async fn claim(&self) -> Result<usize, Error> {
        Ok(self
            .clients
            .iter()
            .filter(|c| !c.controlled.swap(true, Ordering::SeqCst))
            .count())
    }
}

/// In-process [`Registration`].
#[derive(Debug, Default)]
pub struct LocalRegistration {
    skipped_waiting: AtomicBool,
}

impl LocalRegistration {
    pub fn skipped_waiting(&self) -> bool {
        self.skipped_waiting.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Registration for LocalRegistration {
    async fn skip_waiting(&self) -> Result<(), Error> {
        self.skipped_waiting.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_match_all_filters_uncontrolled() {
        let clients = LocalClients::new(vec![LocalClient::new("a", true, true), LocalClient::new("b", false, true)]);

        let controlled = clients.match_all(false).await.unwrap();
        assert_eq!(controlled.iter().map(|c| c.id()).collect::<Vec<_>>(), vec!["a"]);

        let all = clients.match_all(true).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_claim_takes_control() {
        let clients = LocalClients::new(vec![LocalClient::new("a", true, true), LocalClient::new("b", false, true)]);

        assert_eq!(clients.claim().await.unwrap(), 1);
        assert!(clients.get("b").unwrap().is_controlled());
        assert_eq!(clients.claim().await.unwrap(), 0);
        assert_eq!(clients.match_all(false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_local_client_replies_to_status_request() {
        let client = LocalClient::new("a", true, false);
        let (mut agent_end, client_end) = MessagePort::pair();

        client
            .post_message(json!({"requestStatusUpdate": true}), client_end)
            .await
            .unwrap();

        assert_eq!(agent_end.recv().await, Some(json!({"statusUpdate": {"isOnline": false}})));
        assert_eq!(agent_end.recv().await, None);
    }

    #[tokio::test]
    async fn test_local_client_silent_on_other_messages() {
        let client = LocalClient::new("a", true, true);
        let (mut agent_end, client_end) = MessagePort::pair();

        client.post_message(json!({"reload": true}), client_end).await.unwrap();

        assert_eq!(agent_end.recv().await, None);
        assert_eq!(client.received(), vec![json!({"reload": true})]);
    }

    #[tokio::test]
    async fn test_registration_skip_waiting() {
        let registration = LocalRegistration::default();
        assert!(!registration.skipped_waiting());
        registration.skip_waiting().await.unwrap();
        assert!(registration.skipped_waiting());
    }
}
