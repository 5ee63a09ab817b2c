use anyhow::Context;
use clap::Parser; // for cli
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crosslink_gateway::client::{EfilingClient, PeerApi, PeerClient, VideoArchivingClient};
use crosslink_gateway::config::{Args, EnvCredentialSource, PeerKind};
use crosslink_gateway::gateway::Gateway;
use crosslink_gateway::peer_health::{PeerHealth, health_checker};
use crosslink_gateway::rate_limit::RateLimiter;
use crosslink_gateway::server::build_router;
use crosslink_gateway::state::AppState;
use crosslink_gateway::records::InMemoryRecords;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // parse cli arguments
    let args = Args::parse();

    let limiter = Arc::new(RateLimiter::new(args.rate_limit_config()));
    let credentials = Arc::new(EnvCredentialSource::new(args.api_key_vars.clone()));
    let gateway = Arc::new(Gateway::new(limiter, credentials));

    let store = match &args.records {
        Some(path) => {
            let store = InMemoryRecords::from_json_file(path)
                .with_context(|| format!("loading records from {}", path.display()))?;
            info!(count = store.len(), path = %path.display(), "work requests loaded");
            Arc::new(store)
        }
        None => {
            warn!("no --records file given; every lookup will answer not found");
            Arc::new(InMemoryRecords::default())
        }
    };

    let peer = match &args.peer_url {
        Some(url) => Some(Arc::new(build_peer(&args, url)?)),
        None => None,
    };

    // spawn the background peer health checker
    let peer_health = match &peer {
        Some(peer) => {
            let health = Arc::new(PeerHealth::new(peer.peer().base_url()));
            tokio::spawn(health_checker(
                peer.clone(),
                health.clone(),
                Duration::from_secs(args.health_interval),
            ));
            Some(health)
        }
        None => None,
    };

    let state = Arc::new(AppState {
        gateway,
        records: store.clone(),
        directory: store,
        peer,
        peer_health,
    });
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    info!(
        addr = %addr,
        peer = ?args.peer_url,
        peer_kind = ?args.peer_kind,
        rate_limit = args.rate_limit,
        rate_window_secs = args.rate_window,
        "crosslink gateway listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_peer(args: &Args, url: &str) -> anyhow::Result<PeerApi> {
    let timeout = args.peer_timeout();
    let api_key = args.peer_api_key.clone();
    if api_key.is_none() {
        warn!(peer = %url, "no peer API key set; outbound calls go without X-API-Key");
    }

    Ok(match args.peer_kind {
        PeerKind::VideoArchiving => PeerApi::VideoArchiving(VideoArchivingClient::new(
            PeerClient::new("video-archiving", url, api_key, timeout)?,
        )),
        PeerKind::Efiling => PeerApi::Efiling(EfilingClient::new(PeerClient::new(
            "efiling", url, api_key, timeout,
        )?)),
    })
}
