//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own, without the workspace's `scribe-run` wrapper.
//!
//! ## Intended use
//! Useful for development and debugging when you want the REST server (with OpenAPI/Swagger
//! UI) and nothing else.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the scribe REST API server
///
/// # Environment Variables
/// - `SCRIBE_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - plus those read by [`api_rest::state_from_env`]
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration cannot be resolved,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("SCRIBE_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    tracing::info!("-- Starting scribe REST API on {}", addr);

    let app = api_rest::router(api_rest::state_from_env()?);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
