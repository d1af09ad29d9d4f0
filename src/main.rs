use std::sync::Arc;

use gearbox::backend::PocketBaseClient;
use gearbox::config::AppConfig;
use gearbox::state::AppState;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env().expect("invalid configuration");
    let backend =
        PocketBaseClient::new(&config.pocketbase_url, config.timeouts).expect("record store client init failed");
    tracing::info!(pocketbase_url = %config.pocketbase_url, "record store client initialized");

    let port = config.port;
    let state = AppState::new(config, Arc::new(backend));
    let app = gearbox::routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "gearbox listening");
    axum::serve(listener, app).await.expect("server failed");
}
