//! Entry point for the raw data source HTTP service.
//!
//! Serves `GET /data` and `GET /health` over the source PostgreSQL store,
//! which is the endpoint the ETL extract step reads from. Startup sequence:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Establishing a PostgreSQL connection pool
//! - Creating the `data` table if it does not exist
//! - Binding the Axum HTTP server and serving requests
//!
//! # Environment Variables
//! - `SOURCE_DATABASE_URL` (**required**) – PostgreSQL connection string
//! - `DB_POOL_MAX` (optional) – maximum number of DB connections (default: 5)
//! - `SOURCE_API_PORT` (optional) – listen port (default: 8000)
use std::net::SocketAddr;

use anyhow::Result;
use axum::Router;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;

use sensorflow_etl::{config, config::mask_db_url, routes, schema, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    telemetry::init_tracing();
    dotenv().ok();

    let cfg = config::load_source_api_config()?;
    cfg.log_config();

    let masked_url = mask_db_url(&cfg.source_db_url);
    tracing::info!("Attempting to connect to database: {}", masked_url);

    let pool = PgPoolOptions::new()
        .max_connections(cfg.db_pool_max)
        .connect(&cfg.source_db_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database '{}': {}", masked_url, e))?;

    tracing::info!("Successfully connected to database");

    schema::create_source_schema(&pool).await?;

    let app: Router = routes::router(pool);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
