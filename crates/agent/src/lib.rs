//! Background request-interception agent for swcache.
//!
//! The agent sits between a web application's pages and the network. It
//! keeps one versioned cache generation per deployment, sweeps older ones
//! on activation, answers same-origin requests network-first with a cache
//! fallback, and collects online/offline status from open pages.
//!
//! Every host service is injected: storage through
//! [`swcache_core::CacheStore`], the network through
//! [`swcache_client::Network`], and pages through [`host::ClientDirectory`].

pub mod agent;
pub mod context;
pub mod events;
pub mod host;
pub mod lifecycle;
pub mod messaging;
pub mod router;

#[cfg(test)]
pub(crate) mod testing;

pub use agent::ServiceAgent;
pub use context::{AgentContext, AgentState};
pub use events::{DispatchOutcome, ExtendableEvent, HostEvent};
pub use host::{Client, ClientDirectory, LocalClient, LocalClients, LocalRegistration, Registration};
pub use lifecycle::{LifecycleManager, PopulateReport};
pub use messaging::{ClientChannel, ClientMessage, MessagePort, StatusRequest, StatusUpdate};
pub use router::{RequestRouter, Routed};
