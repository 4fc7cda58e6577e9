use anyhow::Result;
use axum::Router;
use clap::Parser;
use dumpview_server::{build_app, ProxyConfig, CACHE_CAPACITY};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

#[derive(Parser)]
struct Args {
    /// Backend API base URL
    #[arg(long, default_value = "http://localhost:9090/api/v1/")]
    upstream: Url,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 9091)]
    port: u16,
    /// Directory with the built UI, served at /
    #[arg(long)]
    static_dir: Option<PathBuf>,
    /// Forward every request instead of answering repeats from memory
    #[arg(long, default_value_t = false)]
    no_cache: bool,
    /// Responses kept in memory before the oldest is dropped
    #[arg(long, default_value_t = CACHE_CAPACITY)]
    cache_capacity: usize,
    /// Upstream request timeout seconds (0 = none)
    #[arg(long, default_value_t = 0)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let app: Router = build_app(ProxyConfig {
        upstream: args.upstream.clone(),
        static_dir: args.static_dir.clone(),
        cache: !args.no_cache,
        cache_capacity: args.cache_capacity,
        timeout: (args.timeout_secs > 0).then(|| Duration::from_secs(args.timeout_secs)),
    })?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, upstream = %args.upstream, "proxy listening");
    axum::serve(listener, app).await?;
    Ok(())
}
