use anyhow::{Context, Result};
use clap::Parser;
use multimodal_sessions::{create_router, AppState, Config};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "multimodal-sessions", about = "Multimodal session capture and analysis service")]
struct Args {
    /// Config file (without extension), resolved by the config crate
    #[arg(long, default_value = "config/multimodal-sessions")]
    config: String,

    /// Override the configured HTTP port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config))?;

    let bind = cfg.service.http.bind.clone();
    let port = args.port.unwrap_or(cfg.service.http.port);

    info!("{} starting", cfg.service.name);
    info!("streaming backend: {}", cfg.backend.stream_url);
    info!("analysis backend: {}", cfg.backend.analyze_url);

    let state = AppState::from_config(&cfg)?;
    let app = create_router(state);

    let addr = format!("{}:{}", bind, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
