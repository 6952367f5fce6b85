mod config;
mod frame;
mod hub;
mod routes;
mod services;
mod state;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Optional .env file; real environment wins.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::Config::from_env().expect("invalid configuration");
    tracing::info!(
        sweep_secs = config.sweep_interval.as_secs(),
        client_buffer = config.client_buffer,
        hub_buffer = config.hub_buffer,
        cors = ?config.cors_origins,
        "config loaded"
    );

    // Coordinator task owns all room state; the sweeper runs inside it.
    let (hub, _hub_task) = hub::spawn(config.hub_buffer, config.sweep_interval);

    let addr = config.bind_addr();
    let state = state::AppState::new(hub, config);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    tracing::info!(%addr, "roomsync listening");
    axum::serve(listener, app).await.expect("server failed");
}
