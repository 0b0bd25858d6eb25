use async_trait::async_trait;
use sqlx::{query, query_as};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

#[cfg(feature = "sqlite")]
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
#[cfg(feature = "sqlite")]
use std::str::FromStr;

#[cfg(feature = "postgres")]
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::account::{Account, AccountStatus};
use crate::config::{get_config, DatabaseConfig};
use crate::errors::{SweepError, SweepResult};
use crate::store::AccountStore;

/// Unified database abstraction over SQLite and Postgres.
///
/// Reads and writes the `accounts` table:
///
/// ```sql
/// CREATE TABLE accounts (
///     id TEXT PRIMARY KEY,
///     name TEXT NOT NULL,
///     contact_name TEXT,
///     email TEXT,
///     plan TEXT NOT NULL,
///     status TEXT NOT NULL,
///     trial_end TIMESTAMPTZ NOT NULL
/// );
/// ```
///
/// Available variants depend on enabled features:
/// - `sqlite` feature enables `Database::SQLite`
/// - `postgres` feature enables `Database::Postgres`
#[derive(Debug, Clone)]
pub enum Database {
    #[cfg(feature = "sqlite")]
    SQLite(SqlitePool),
    #[cfg(feature = "postgres")]
    Postgres(PgPool),
}

fn db_err(op: &str, e: sqlx::Error) -> SweepError {
    error!("{op} failed: {e}");
    SweepError::StoreError(format!("database error: {e}"))
}

impl Database {
    /// Connect using the global configuration.
    pub async fn new() -> SweepResult<Arc<Self>> {
        let config = get_config()?;
        Self::connect(&config.database).await.map(Arc::new)
    }

    /// Connect using an explicit database configuration.
    ///
    /// Pool acquisition is bounded by `acquire_timeout_secs`. A missing
    /// SQLite file is created.
    pub async fn connect(db_config: &DatabaseConfig) -> SweepResult<Self> {
        let acquire_timeout = Duration::from_secs(db_config.acquire_timeout_secs);

        match db_config.db_type.as_str() {
            #[cfg(feature = "sqlite")]
            "sqlite" => {
                let options = SqliteConnectOptions::from_str(&db_config.sqlite_url)
                    .map_err(|e| {
                        SweepError::ConfigError(format!("invalid SQLite URL: {e}"))
                    })?
                    .create_if_missing(true);

                let pool = SqlitePoolOptions::new()
                    .max_connections(db_config.max_connections)
                    .acquire_timeout(acquire_timeout)
                    .connect_with(options)
                    .await
                    .map_err(|e| {
                        error!("Failed to connect to SQLite: {e}");
                        SweepError::StoreError(format!("failed to connect to SQLite: {e}"))
                    })?;

                Ok(Database::SQLite(pool))
            }
            #[cfg(not(feature = "sqlite"))]
            "sqlite" => Err(SweepError::ConfigError(
                "SQLite support not compiled in. Enable the 'sqlite' feature.".to_string(),
            )),
            #[cfg(feature = "postgres")]
            "postgres" => {
                let pool = PgPoolOptions::new()
                    .max_connections(db_config.max_connections)
                    .acquire_timeout(acquire_timeout)
                    .connect(&db_config.postgres_url)
                    .await
                    .map_err(|e| {
                        error!("Failed to connect to PostgreSQL: {e}");
                        SweepError::StoreError(format!("failed to connect to PostgreSQL: {e}"))
                    })?;

                Ok(Database::Postgres(pool))
            }
            #[cfg(not(feature = "postgres"))]
            "postgres" => Err(SweepError::ConfigError(
                "PostgreSQL support not compiled in. Enable the 'postgres' feature.".to_string(),
            )),
            other => Err(SweepError::ConfigError(format!(
                "unsupported database type: {other}"
            ))),
        }
    }

    /// Create the `accounts` table if it doesn't exist.
    ///
    /// The production table is owned by the application; this is for local
    /// SQLite setups and tests.
    pub async fn ensure_schema(&self) -> SweepResult<()> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                query(
                    r#"
                    CREATE TABLE IF NOT EXISTS accounts (
                        id TEXT PRIMARY KEY,
                        name TEXT NOT NULL,
                        contact_name TEXT,
                        email TEXT,
                        plan TEXT NOT NULL,
                        status TEXT NOT NULL DEFAULT 'trial',
                        trial_end TEXT NOT NULL
                    )
                    "#,
                )
                .execute(pool)
                .await
                .map_err(|e| db_err("SQLite ensure_schema", e))?;
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query(
                    r#"
                    CREATE TABLE IF NOT EXISTS accounts (
                        id TEXT PRIMARY KEY,
                        name TEXT NOT NULL,
                        contact_name TEXT,
                        email TEXT,
                        plan TEXT NOT NULL,
                        status TEXT NOT NULL DEFAULT 'trial',
                        trial_end TIMESTAMPTZ NOT NULL
                    )
                    "#,
                )
                .execute(pool)
                .await
                .map_err(|e| db_err("Postgres ensure_schema", e))?;
            }
        }

        Ok(())
    }

    /// Insert a new account or update an existing one, keyed on `id`.
    pub async fn upsert_account(&self, account: &Account) -> SweepResult<()> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                query(
                    r#"
                    INSERT INTO accounts (id, name, contact_name, email, plan, status, trial_end)
                    VALUES (?, ?, ?, ?, ?, ?, ?)
                    ON CONFLICT(id) DO UPDATE SET
                        name         = excluded.name,
                        contact_name = excluded.contact_name,
                        email        = excluded.email,
                        plan         = excluded.plan,
                        status       = excluded.status,
                        trial_end    = excluded.trial_end
                    "#,
                )
                .bind(&account.id)
                .bind(&account.name)
                .bind(&account.contact_name)
                .bind(&account.email)
                .bind(&account.plan)
                .bind(&account.status)
                .bind(account.trial_end)
                .execute(pool)
                .await
                .map_err(|e| db_err("SQLite upsert_account", e))?;
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query(
                    r#"
                    INSERT INTO accounts (id, name, contact_name, email, plan, status, trial_end)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    ON CONFLICT (id) DO UPDATE SET
                        name         = EXCLUDED.name,
                        contact_name = EXCLUDED.contact_name,
                        email        = EXCLUDED.email,
                        plan         = EXCLUDED.plan,
                        status       = EXCLUDED.status,
                        trial_end    = EXCLUDED.trial_end
                    "#,
                )
                .bind(&account.id)
                .bind(&account.name)
                .bind(&account.contact_name)
                .bind(&account.email)
                .bind(&account.plan)
                .bind(&account.status)
                .bind(account.trial_end)
                .execute(pool)
                .await
                .map_err(|e| db_err("Postgres upsert_account", e))?;
            }
        }

        Ok(())
    }

    /// Fetch an account by id, whatever its status.
    pub async fn get_account(&self, id: &str) -> SweepResult<Option<Account>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_as::<_, Account>(
                "SELECT id, name, contact_name, email, plan, status, trial_end \
                 FROM accounts WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(|e| db_err("SQLite get_account", e)),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_as::<_, Account>(
                "SELECT id, name, contact_name, email, plan, status, trial_end \
                 FROM accounts WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(|e| db_err("Postgres get_account", e)),
        }
    }
}

#[async_trait]
impl AccountStore for Database {
    async fn fetch_trial_accounts(
        &self,
        after_id: Option<&str>,
        limit: u32,
    ) -> SweepResult<Vec<Account>> {
        let trial = AccountStatus::Trial.as_str();
        // An empty string sorts before every id.
        let after = after_id.unwrap_or("");
        let limit = i64::from(limit);

        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_as::<_, Account>(
                "SELECT id, name, contact_name, email, plan, status, trial_end \
                 FROM accounts \
                 WHERE status = ? AND email IS NOT NULL AND id > ? \
                 ORDER BY id \
                 LIMIT ?",
            )
            .bind(trial)
            .bind(after)
            .bind(limit)
            .fetch_all(pool)
            .await
            .map_err(|e| db_err("SQLite fetch_trial_accounts", e)),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_as::<_, Account>(
                "SELECT id, name, contact_name, email, plan, status, trial_end \
                 FROM accounts \
                 WHERE status = $1 AND email IS NOT NULL AND id > $2 \
                 ORDER BY id \
                 LIMIT $3",
            )
            .bind(trial)
            .bind(after)
            .bind(limit)
            .fetch_all(pool)
            .await
            .map_err(|e| db_err("Postgres fetch_trial_accounts", e)),
        }
    }

    async fn mark_expired(&self, id: &str) -> SweepResult<bool> {
        let expired = AccountStatus::Expired.as_str();
        let trial = AccountStatus::Trial.as_str();

        let rows_affected = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query(
                "UPDATE accounts SET status = ? WHERE id = ? AND status = ?",
            )
            .bind(expired)
            .bind(id)
            .bind(trial)
            .execute(pool)
            .await
            .map_err(|e| db_err("SQLite mark_expired", e))?
            .rows_affected(),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query(
                "UPDATE accounts SET status = $1 WHERE id = $2 AND status = $3",
            )
            .bind(expired)
            .bind(id)
            .bind(trial)
            .execute(pool)
            .await
            .map_err(|e| db_err("Postgres mark_expired", e))?
            .rows_affected(),
        };

        Ok(rows_affected > 0)
    }
}
