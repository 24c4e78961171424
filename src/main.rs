use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use lunachat_backend::config::Config;
use lunachat_backend::server::router::router;
use lunachat_backend::state::AppState;
use lunachat_backend::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    logging::init(&config);

    let state = AppState::initialize(config).await;

    let bind_addr = format!("127.0.0.1:{}", state.config.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app: Router = router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
