// Postgres config store
// One table, unique on config_hash; the constraint is what makes concurrent saves idempotent.

use async_trait::async_trait;
use log::{info, warn};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

use super::store::{ConfigStore, StoreError};
use crate::utils::logging::mask_database_url;

const CREATE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS starter_configs (
    id BIGSERIAL PRIMARY KEY,
    config_hash TEXT NOT NULL UNIQUE,
    json_config TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

pub struct PostgresConfigStore {
    pool: Pool<Postgres>,
}

fn map_sqlx_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate,
        _ => StoreError::Backend(e.to_string()),
    }
}

fn is_transient(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::Tls(_)
    )
}

impl PostgresConfigStore {
    /// Connect with a short exponential backoff on transient failures, then ensure the table.
    pub async fn connect(database_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        info!(
            "[PHASE: database] [STEP: connect] Connecting config store: {}",
            mask_database_url(database_url)
        );

        let retry_strategy = ExponentialBackoff::from_millis(150)
            .factor(2)
            .max_delay(Duration::from_secs(2))
            .take(3)
            .map(jitter);

        let attempt = || async {
            PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(timeout)
                .connect(database_url)
                .await
        };

        let pool = RetryIf::spawn(retry_strategy, attempt, |e: &sqlx::Error| {
            let transient = is_transient(e);
            if transient {
                warn!(
                    "[PHASE: database] [STEP: connect] Transient connect failure, retrying: {}",
                    e
                );
            }
            transient
        })
        .await
        .map_err(|e| StoreError::Backend(format!("connect failed: {}", e)))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE_SQL)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for PostgresConfigStore {
    async fn insert(&self, config_hash: &str, json_config: &str) -> Result<(), StoreError> {
        // Plain INSERT: a unique violation is the "already stored" signal.
        sqlx::query("INSERT INTO starter_configs (config_hash, json_config) VALUES ($1, $2)")
            .bind(config_hash)
            .bind(json_config)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn fetch(&self, config_hash: &str) -> Result<Option<String>, StoreError> {
        sqlx::query_scalar::<_, String>(
            "SELECT json_config FROM starter_configs WHERE config_hash = $1",
        )
        .bind(config_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
