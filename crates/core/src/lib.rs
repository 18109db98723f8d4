//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - The named-cache store abstraction with SQLite and in-memory backends
//! - Cache generation naming and the always-cached manifest
//! - Unified error types
//! - Host configuration

pub mod config;
pub mod error;
pub mod manifest;
pub mod store;
pub mod version;

pub use config::{AgentConfig, ConfigError};
pub use error::Error;
pub use manifest::Manifest;
pub use store::{CacheHandle, CacheStore, MemoryCacheStore, Snapshot, SqliteCacheStore};
pub use version::VersionRegistry;
