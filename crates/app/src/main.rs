mod cli;
mod logging;
mod providers;
mod rate_limit;
mod server;
mod session;
mod transport_ws;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use vox_foundation::config::ServerConfig;
use vox_foundation::shutdown::ShutdownHandler;
use vox_pool::Pool;

use providers::{MockAsrProvider, MockTtsProvider, PooledAsr, PooledTts};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let _log_guard = logging::init()?;

    let mut config = ServerConfig::load(cli.config.as_deref())?;
    if let Some(pool_size) = cli.pool_size {
        config.pool.size = pool_size;
    }
    if cli.no_rate_limit {
        config.rate_limit.enabled = false;
    }
    let config = Arc::new(config);

    let sample_rate = config.audio.sample_rate;
    let channels = config.audio.channels;
    let sample_width = config.audio.sample_width;

    let asr_pool = Arc::new(Pool::new(config.pool.size, Arc::new(|| Ok(PooledAsr(Box::new(MockAsrProvider))))));
    asr_pool.initialize().await?;

    let tts_pool = Arc::new(Pool::new(
        config.pool.size,
        Arc::new(move || Ok(PooledTts(Box::new(MockTtsProvider::new(sample_rate, channels, sample_width))))),
    ));
    tts_pool.initialize().await?;

    let shutdown = ShutdownHandler::new().install();

    let app = server::router(config.clone(), asr_pool.clone(), tts_pool.clone(), shutdown.clone());
    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;
    tracing::info!(%addr, "starting vox-server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let shutdown_signal = shutdown.clone();
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move { shutdown_signal.wait().await })
        .await?;

    asr_pool.close().await;
    tts_pool.close().await;
    tracing::info!("vox-server shut down cleanly");
    Ok(())
}
