use anyhow::Result;
use storefront::{db, events::EventPublisher, telemetry, AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    telemetry::init(&config.log_level, config.log_json);

    let pool = db::connect(&config).await?;
    db::prepare(&pool, &config).await?;
    let events = EventPublisher::connect(config.nats_url.as_deref()).await;

    let addr = config.bind_addr();
    let state = AppState::new(pool, config, events);
    if state.stripe.is_none() { tracing::info!("Stripe not configured, payment intents disabled"); }
    let app = storefront::router(state);

    tracing::info!("storefront listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    tracing::info!("storefront stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
