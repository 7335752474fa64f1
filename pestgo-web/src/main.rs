use dotenvy::dotenv;
use pestgo_web::config::get_configuration;
use pestgo_web::i18n::{LanguageContext, Translator};
use pestgo_web::services::{HostedBackend, LocalStorage, RemoteService};
use pestgo_web::session::AuthSession;
use pestgo_web::startup::build_router;
use pestgo_web::AppState;
use service_core::observability::logging::init_tracing;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        "pestgo-web",
        &configuration.telemetry.log_level,
        configuration.telemetry.otlp_endpoint.as_deref(),
    );

    pestgo_web::services::metrics::init_metrics()
        .map_err(|e| anyhow::anyhow!("Failed to register metrics: {}", e))?;

    let storage = Arc::new(LocalStorage::open(&configuration.storage.path).await);
    let translator = Arc::new(
        Translator::embedded().map_err(|e| anyhow::anyhow!("Invalid translation table: {}", e))?,
    );
    let language = Arc::new(LanguageContext::load(translator, Arc::clone(&storage)).await);

    let backend: Arc<dyn RemoteService> = Arc::new(HostedBackend::new(
        configuration.backend.clone(),
        Arc::clone(&storage),
    ));
    let session = AuthSession::start(backend, configuration.session.clone());

    let app = build_router(AppState::new(Arc::clone(&session), language));

    let address = format!(
        "{}:{}",
        configuration.server.host, configuration.server.port
    );
    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
        anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
    })?;

    info!("Starting pestgo-web on http://{}", address);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    session.shutdown();

    served.map_err(|e| {
        tracing::error!("Server error: {}", e);
        anyhow::anyhow!("Server error: {}", e)
    })?;

    info!("pestgo-web stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
