//! SumDash API server

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use sumdash_auth::{
    cors_layer, create_auth_service, create_routes, AccountDirectory, AuthConfig,
    InMemoryDirectory, PgDirectory, ServerConfig,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // Configuration errors are fatal: never serve without a signing secret.
    let auth_config = AuthConfig::from_env().context("invalid authentication configuration")?;
    let server_config = ServerConfig::from_env().context("invalid server configuration")?;

    let directory: Arc<dyn AccountDirectory> = match &server_config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .context("failed to connect to database")?;
            let directory = PgDirectory::new(pool);
            directory
                .migrate()
                .await
                .context("failed to migrate account directory")?;
            Arc::new(directory)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; accounts are kept in memory");
            Arc::new(InMemoryDirectory::new())
        }
    };

    let auth = create_auth_service(auth_config, directory)?;

    let cors = cors_layer(&server_config.cors_origin)?;

    let app = create_routes(auth).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    );

    let listener = tokio::net::TcpListener::bind(server_config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", server_config.bind_addr))?;
    tracing::info!("SumDash API listening on {}", server_config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}
