/// Kudos admin service
///
/// Serves the kudos feed with scope-based admin moderation.
use kudos_admin::{config::ServerConfig, context::AppContext, error::KudosResult, server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> KudosResult<()> {
    // Load configuration
    let config = ServerConfig::from_env()?;

    // Initialize logging; RUST_LOG overrides the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Starting kudos-admin v{} (database {:?})",
        config.service.version,
        config.storage.database
    );

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}
