//! swcache native host.
//!
//! Runs the agent outside a browser: loads configuration, opens the SQLite
//! cache store, installs and activates the agent, then routes one request
//! path per stdin line. Each routed request prints a JSON line on stdout;
//! logs go to stderr.

use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use swcache_agent::{AgentContext, DispatchOutcome, HostEvent, LocalClient, LocalClients, LocalRegistration, ServiceAgent};
use swcache_client::{FetchConfig, FetchRequest, HttpNetwork, resolve};
use swcache_core::{AgentConfig, SqliteCacheStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AgentConfig::load()?;
    let ctx = Arc::new(AgentContext::from_config(&config)?);

    tracing::info!(
        origin = %ctx.origin(),
        cache = %ctx.active_cache_name(),
        db_path = %config.db_path.display(),
        "Starting swcache host"
    );

    let store = SqliteCacheStore::open(&config.db_path).await?;
    let network = HttpNetwork::new(FetchConfig::from(&config))?;
    let clients = Arc::new(LocalClients::new(vec![LocalClient::new("local-page", false, true)]));

    let agent = ServiceAgent::new(
        Arc::clone(&ctx),
        Arc::new(store),
        Arc::new(network),
        clients,
        Arc::new(LocalRegistration::default()),
    );

    agent.start().await;
    for event in [HostEvent::Install, HostEvent::Activate] {
        if let DispatchOutcome::Failed(e) = agent.dispatch(event).await {
            tracing::error!("lifecycle event failed: {e}");
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let path = line.trim();
        if path.is_empty() {
            continue;
        }

        let url = match resolve(ctx.origin(), path) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(path, "skipping request: {e}");
                continue;
            }
        };

        let result = match agent.dispatch(HostEvent::Fetch(FetchRequest::get(url))).await {
            DispatchOutcome::Responded(routed) => json!({
                "path": path,
                "source": routed.source(),
                "status": routed.status(),
                "content_type": routed.content_type(),
                "bytes": routed.body().len(),
            }),
            _ => json!({ "path": path, "source": "fallthrough" }),
        };
        println!("{result}");
    }

    Ok(())
}
