//! Backdrop Timer - A state-managed countdown timer service
//!
//! This is the main entry point for the backdrop-timer application.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use backdrop_timer::{
    api::create_router,
    config::Config,
    services::ImagenClient,
    state::{AppState, DisplayPreferences},
    tasks::countdown_task,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "backdrop_timer={},tower_http=info",
            config.log_level()
        ))
        .init();

    info!("Starting backdrop-timer server v1.0.0");
    info!(
        "Configuration: host={}, port={}, duration={}min",
        config.host, config.port, config.duration
    );

    let api_key = config.api_key();
    if api_key.is_none() {
        tracing::warn!(
            "No generation API key found in ${}; background generation will fail until one is set",
            config.api_key_env
        );
    }

    let generator = Arc::new(ImagenClient::new(
        config.generation_endpoint.clone(),
        config.generation_model.clone(),
        api_key,
    ));

    // Load persisted display preferences (defaults when absent)
    let preferences = DisplayPreferences::load(&config.preferences_file);

    // Create application state
    let state = Arc::new(AppState::new(
        config.port,
        config.host.clone(),
        config.duration,
        preferences,
        config.preferences_file.clone(),
        generator,
    ));

    // Start the countdown scheduler background task
    let countdown_state = Arc::clone(&state);
    tokio::spawn(async move {
        countdown_task(countdown_state).await;
    });

    // Create HTTP router with all endpoints
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /timer/start-pause    - Start or pause the countdown");
    info!("  POST /timer/reset          - Reset to the configured duration");
    info!("  POST /timer/duration       - Set the duration in minutes");
    info!("  GET  /status               - Observed state for the UI");
    info!("  GET  /gallery              - Curated gallery entries");
    info!("  POST /background/gallery   - Select a gallery background");
    info!("  POST /background/upload    - Upload a background image");
    info!("  POST /background/generate  - Generate a background image");
    info!("  GET  /health               - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}
