use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the scribe application
///
/// Loads `.env`, resolves configuration and serves the REST API.
///
/// # Environment Variables
/// - `SCRIBE_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `SCRIBE_DATA_DIR`: Directory for note storage (default: "/scribe_data")
/// - `SCRIBE_DEFAULT_FORMAT`: Format requested for transcripts without a role
/// - `SCRIBE_STRUCTURE_COMMAND`: Program used to structure transcripts (optional)
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("scribe_run=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("scribe_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("SCRIBE_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let state = api_rest::state_from_env()?;
    let app = api_rest::router(state);

    tracing::info!("++ Starting scribe REST on {}", rest_addr);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
