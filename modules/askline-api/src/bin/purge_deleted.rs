//! Maintenance binary: physically remove questions that have been in
//! DELETED status longer than the retention window. The only path that
//! drops question rows.
//!
//! Usage: `purge_deleted [days]` (default 30).

use anyhow::Result;
use chrono::{Duration, Utc};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use askline_common::Config;
use askline_store::PgQuestionStore;

const DEFAULT_RETENTION_DAYS: i64 = 30;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("askline=info".parse()?))
        .init();

    let days = std::env::args()
        .nth(1)
        .map(|arg| arg.parse::<i64>())
        .transpose()?
        .unwrap_or(DEFAULT_RETENTION_DAYS);

    let config = Config::from_env();
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await?;

    let cutoff = Utc::now() - Duration::days(days);
    let purged = PgQuestionStore::new(pool).purge_deleted(cutoff).await?;
    info!(purged, days, "purge complete");

    Ok(())
}
