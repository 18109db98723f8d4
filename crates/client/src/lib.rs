//! Client code for swcache.
//!
//! This crate provides the network-fetch capability the agent routes
//! requests through, along with origin and cache-key helpers.

pub mod fetch;

pub use fetch::{
    CacheMode, Credentials, FetchConfig, FetchRequest, FetchResponse, HttpNetwork, Method, Network, StatusCode, cache_key,
    header, parse_origin, resolve, same_origin,
};
