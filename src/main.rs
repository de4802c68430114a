use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use speaking_coach::{api::AppState, build_app, config::RelayConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // -----------------------------
    // Logging
    // -----------------------------
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting speaking coach relay...");

    // -----------------------------
    // Config / shared state
    // -----------------------------
    let config = RelayConfig::from_env()?;
    if !config.has_api_key() {
        warn!("OPENAI_API_KEY is not set; /chat will answer with a configuration error");
    }
    if config.speech.is_none() {
        warn!("BAIDU_API_KEY / BAIDU_SECRET_KEY not set; speech recognition is disabled");
    }

    let state = AppState::new(&config)?;
    let app = build_app(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;

    info!("🌐 HTTP listening on http://{addr}");
    info!(upstream = %config.upstream_url, "DeepSeek API configured");
    info!("🩺 Health check at http://{addr}/health");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
}
