use anyhow::Context;
use skyseat_api::{app, AppState};
use skyseat_core::FlightService;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skyseat_api=debug,skyseat_core=info,skyseat_store=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = skyseat_store::Config::load().context("Failed to load config")?;
    let seat_map = skyseat_store::build_seat_map(&config.fleet).context("Invalid fleet configuration")?;
    tracing::info!(
        flights = seat_map.len(),
        acquire_timeout = ?config.gate.acquire_timeout(),
        "Seat map ready"
    );

    let state = AppState::new(FlightService::with_acquire_timeout(
        seat_map,
        config.gate.acquire_timeout(),
    ));

    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.server.host, config.server.port))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
