// ParentPick Server - JSON API and gated frontend

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use parentpick::{app_state::AppState, config::Config, routes::create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("parentpick=info,tower_http=info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    let addr = config.server_address();

    // Initialize application state
    let app_state = AppState::new(config).await?;
    if let Some(dir) = app_state.config.server.static_dir.as_deref() {
        info!("Serving frontend from {}", dir);
    }

    let app = create_router(app_state);

    info!("ParentPick server listening on http://{}", addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
