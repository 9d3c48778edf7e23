use anyhow::{Context, Result};
use call_transcriber::{create_router, AppState, Config, SinkBuilder, SinkKind};
use clap::Parser;
use tracing::{info, Level};

#[derive(Debug, Parser)]
#[command(name = "call-transcriber", about = "Relay phone call audio to real-time transcription")]
struct Args {
    /// Config file, extension optional
    #[arg(short, long, default_value = "config/call-transcriber")]
    config: String,

    /// Override service.http.port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override sink.kind
    #[arg(long, value_enum)]
    sink: Option<SinkKind>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();
    } else {
        tracing_subscriber::fmt::init();
    }

    let mut cfg = Config::load(&args.config)?;
    if let Some(port) = args.port {
        cfg.service.http.port = port;
    }
    if let Some(kind) = args.sink {
        cfg.sink.kind = kind;
    }

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!(
        "Transcription: {} at {} Hz",
        cfg.transcription.encoding.as_str(),
        cfg.transcription.sample_rate
    );
    info!("Transcript sink: {:?}", cfg.sink.kind);

    let sinks = SinkBuilder::from_config(&cfg.sink).await?;

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let app = create_router(AppState::new(cfg, sinks));

    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
