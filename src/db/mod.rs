//! Database connection management

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::config::PostgresConfig;

/// PostgreSQL database connection pool
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    pub async fn connect(config: &PostgresConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await?;

        tracing::info!("PostgreSQL connection pool established");
        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Install the engine's tables and indexes.
    ///
    /// Idempotent; intended to run at service bootstrap. The partial unique
    /// index backs the at-most-one-pending rule at the storage level, on top
    /// of the application-level existence check.
    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        init_schema(&self.pool).await
    }
}

/// Schema setup against an arbitrary pool (used by tests as well)
pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS branch_stock_tb (
            branch_id BIGINT NOT NULL,
            medication_id BIGINT NOT NULL,
            quantity BIGINT NOT NULL DEFAULT 0 CHECK (quantity >= 0),
            reserved_quantity BIGINT NOT NULL DEFAULT 0 CHECK (reserved_quantity >= 0),
            last_updated TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            PRIMARY KEY (branch_id, medication_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stock_transfers_tb (
            transfer_id BIGSERIAL PRIMARY KEY,
            from_branch_id BIGINT NOT NULL,
            to_branch_id BIGINT NOT NULL,
            medication_id BIGINT NOT NULL,
            quantity BIGINT NOT NULL CHECK (quantity > 0),
            status SMALLINT NOT NULL DEFAULT 0,
            reason TEXT NOT NULL DEFAULT '',
            requested_by BIGINT NOT NULL,
            approved_by BIGINT,
            requested_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            completed_at TIMESTAMPTZ,
            notes TEXT,
            CHECK (from_branch_id <> to_branch_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // status = 0 is Pending; see transfer::TransferStatus
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS uniq_pending_transfer
            ON stock_transfers_tb (from_branch_id, to_branch_id, medication_id)
            WHERE status = 0
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Schema setup complete");
    Ok(())
}
