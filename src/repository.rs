//! PostgreSQL persistence for observed rates.
//!
//! Write-only: the `rates` table is an append-only log and this module never
//! reads, updates or deletes rows.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, instrument};

use crate::error::Result;
use crate::types::Rate;

const INSERT_RATE: &str = "INSERT INTO rates (ask, bid, timestamp) VALUES ($1, $2, $3)";

/// Destination for fetched rates.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateSink: Send + Sync {
    async fn save_rate(&self, rate: &Rate) -> Result<()>;
}

/// Open a connection pool. Fails fast if the database is unreachable.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Apply the embedded migrations in `migrations/`.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// [`RateSink`] backed by the `rates` table.
#[derive(Clone)]
pub struct PgRateRepository {
    pool: PgPool,
}

impl PgRateRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RateSink for PgRateRepository {
    #[instrument(name = "save_rate", skip_all)]
    async fn save_rate(&self, rate: &Rate) -> Result<()> {
        let result = sqlx::query(INSERT_RATE)
            .bind(rate.ask())
            .bind(rate.bid())
            .bind(rate.timestamp())
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => {
                info!(
                    ask = rate.ask(),
                    bid = rate.bid(),
                    timestamp = %rate.timestamp(),
                    "rate saved"
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    ask = rate.ask(),
                    bid = rate.bid(),
                    timestamp = %rate.timestamp(),
                    error = %e,
                    "failed to save rate"
                );
                Err(e.into())
            }
        }
    }
}
