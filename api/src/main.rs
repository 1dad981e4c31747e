use std::net::{IpAddr, SocketAddr};

use axum::Router;
use clap::Parser;
use daemon_mcp_runtime::{DEFAULT_DOCUMENT_URL, DocumentSource};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod middleware;
mod routes;
mod state;

#[derive(Parser)]
#[command(
    name = "daemon-api",
    version,
    about = "Daemon MCP server: JSON-RPC tools over a personal profile document"
)]
struct Cli {
    /// URL of the section-tagged daemon document
    #[arg(long, env = "DAEMON_DOCUMENT_URL", default_value = DEFAULT_DOCUMENT_URL)]
    document_url: String,

    /// Interface to bind
    #[arg(long, env = "DAEMON_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,
}

pub(crate) fn build_router(app_state: state::AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::mcp_http::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(middleware::cors::apply)),
        )
        .with_state(app_state)
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "daemon_api=info,daemon_mcp_runtime=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let app_state = state::AppState {
        source: DocumentSource::new(cli.document_url),
    };
    tracing::info!(document_url = %app_state.source.url(), "Daemon document source configured");

    let app = build_router(app_state);

    let addr = SocketAddr::new(cli.host, cli.port);
    tracing::info!("Daemon MCP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
