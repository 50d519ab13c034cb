//! Feedback server - HTTP front end for the feedback orchestrator.

mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use coach::io::alert::WebhookNotifier;
use coach::io::config::{DEFAULT_CONFIG_PATH, load_config};
use coach::orchestrate::LlmOrchestrator;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "coach-server")]
#[command(about = "HTTP server for verified candidate feedback")]
struct Args {
    /// Address to bind the server to (overrides `server.bind`)
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on (overrides `server.port`)
    #[arg(long)]
    port: Option<u16>,

    /// Config file path
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("coach_server=info".parse()?)
                .add_directive("coach=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let cfg = load_config(&args.config)?;
    let orchestrator = LlmOrchestrator::from_config(&cfg).context("build orchestrator")?;
    let notifier = WebhookNotifier::from_config(&cfg.alerts).context("build alert notifier")?;
    info!(
        model = %cfg.llm.model,
        max_retries = cfg.max_retries,
        deadline_secs = cfg.run_deadline().as_secs(),
        alerts = notifier.is_some(),
        "starting coach-server"
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = AppState::new(orchestrator).with_notifier(notifier);
    let app = routes::router(state).layer(cors);

    let bind = args.bind.unwrap_or(cfg.server.bind);
    let port = args.port.unwrap_or(cfg.server.port);
    let addr: SocketAddr = format!("{bind}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {bind}:{port}"))?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
