use pdf_analyzer::api::{create_router, AppState};
use pdf_analyzer::infrastructure::{load_credentials, AppConfig};
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "pdf_analyzer=debug,api=debug,tower_http=debug";

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::load()?;
    let credentials = load_credentials();
    for provider in [
        pdf_analyzer::domain::ModelProvider::OpenAi,
        pdf_analyzer::domain::ModelProvider::Watsonx,
    ] {
        if !credentials.has(provider) {
            info!(
                provider = %provider,
                missing = ?credentials.missing(provider),
                "credentials not set in environment; they can be entered per session"
            );
        }
    }

    let addr = SocketAddr::new(config.config.server.host.parse()?, config.config.server.port);

    let state = AppState::from_config(config, credentials).await?;
    let session = state.session.clone();
    let app = create_router(state);

    info!("API server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = session.close().await {
        warn!(error = %e, "failed to release session resources");
    }

    Ok(())
}
