use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "vox-server", author, version, about = "Streaming voice-agent pipeline server")]
pub struct Cli {
    /// Address to bind the WebSocket server to.
    #[arg(long, default_value = "0.0.0.0", env = "VOX_HOST")]
    pub host: String,

    /// Port to bind the WebSocket server to.
    #[arg(long, default_value_t = 8787, env = "VOX_PORT")]
    pub port: u16,

    /// Optional TOML config file, merged over the built-in defaults.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the model-provider pool size from the config file/defaults.
    #[arg(long)]
    pub pool_size: Option<usize>,

    /// Disable rate limiting regardless of config.
    #[arg(long)]
    pub no_rate_limit: bool,
}
