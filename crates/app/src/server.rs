//! HTTP upgrade endpoint: a single WebSocket route gated by the connection
//! admission policy, each accepted connection handed off to its own
//! session task.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::connect_info::ConnectInfo;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use vox_foundation::config::ServerConfig;
use vox_foundation::shutdown::ShutdownGuard;
use vox_pool::Pool;

use crate::providers::{PooledAsr, PooledTts};
use crate::rate_limit::ConnectionGate;
use crate::session;

#[derive(Clone)]
struct AppState {
    config: Arc<ServerConfig>,
    asr_pool: Arc<Pool<PooledAsr>>,
    tts_pool: Arc<Pool<PooledTts>>,
    gate: Arc<ConnectionGate>,
    shutdown: ShutdownGuard,
}

pub fn router(
    config: Arc<ServerConfig>,
    asr_pool: Arc<Pool<PooledAsr>>,
    tts_pool: Arc<Pool<PooledTts>>,
    shutdown: ShutdownGuard,
) -> Router {
    let gate = Arc::new(ConnectionGate::new(&config.rate_limit));
    gate.spawn_cleanup(Duration::from_secs(config.rate_limit.cleanup_interval_s.max(1)));

    let state = AppState {
        config,
        asr_pool,
        tts_pool,
        gate,
        shutdown,
    };

    Router::new().route("/ws", get(ws_handler)).with_state(state)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let Some(permit) = state.gate.admit(peer.ip()).await else {
        tracing::debug!(%peer, "rejecting connection: rate limited or at capacity");
        return axum::http::StatusCode::TOO_MANY_REQUESTS.into_response();
    };

    ws.on_upgrade(move |socket| async move {
        let _permit = permit;
        session::run(socket, state.config, state.asr_pool, state.tts_pool, state.shutdown).await;
    })
}
