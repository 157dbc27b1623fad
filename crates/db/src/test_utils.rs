//! Test utilities for database operations.
//!
//! Behavioral tests run against SQLite with the real migrations applied, so
//! the `(battle_id, voter_id)` unique index is the same one production relies
//! on. [`TestDatabase::in_memory`] is a single-connection database for
//! sequential tests; [`TestDatabase::file_backed`] opens a pool of several
//! connections so concurrent votes actually race. PostgreSQL can be targeted
//! through [`TestDbConfig`] for the ignored integration tests.

use crate::entities::{Battle, BattleVote};
use crate::migrations::Migrator;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, EntityTrait};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::info;

/// PostgreSQL test database configuration.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database username.
    pub username: String,
    /// Database password.
    pub password: String,
    /// Database name.
    pub database: String,
}

impl Default for TestDbConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("TEST_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("TEST_DB_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5433),
            username: std::env::var("TEST_DB_USER").unwrap_or_else(|_| "rtr_test".to_string()),
            password: std::env::var("TEST_DB_PASSWORD").unwrap_or_else(|_| "rtr_test".to_string()),
            database: std::env::var("TEST_DB_NAME").unwrap_or_else(|_| "rtr_test".to_string()),
        }
    }
}

impl TestDbConfig {
    /// Get the database URL.
    #[must_use]
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

/// A migrated test database.
pub struct TestDatabase {
    conn: Arc<DatabaseConnection>,
    /// Keeps the directory of a file-backed database alive.
    _dir: Option<TempDir>,
}

impl TestDatabase {
    async fn migrated(opt: ConnectOptions, dir: Option<TempDir>) -> Result<Self, DbErr> {
        let conn = Database::connect(opt).await?;
        Migrator::up(&conn, None).await?;

        Ok(Self {
            conn: Arc::new(conn),
            _dir: dir,
        })
    }

    /// Create a fresh in-memory SQLite database with migrations applied.
    ///
    /// The pool is pinned to a single connection because every SQLite
    /// `:memory:` connection opens its own empty database.
    pub async fn in_memory() -> Result<Self, DbErr> {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).min_connections(1).sqlx_logging(false);

        Self::migrated(opt, None).await
    }

    /// Create a SQLite database in a temporary file, served by a pool of
    /// `max_connections` connections.
    pub async fn file_backed(max_connections: u32) -> Result<Self, DbErr> {
        let dir = tempfile::tempdir().map_err(|e| DbErr::Custom(e.to_string()))?;
        let path = dir.path().join("ledger.db");
        let url = format!("sqlite://{}?mode=rwc", path.display());

        let mut opt = ConnectOptions::new(url);
        opt.max_connections(max_connections)
            .min_connections(1)
            .sqlx_logging(false);

        Self::migrated(opt, Some(dir)).await
    }

    /// Connect to the PostgreSQL test database and apply migrations.
    pub async fn postgres(config: &TestDbConfig) -> Result<Self, DbErr> {
        let db = Self::migrated(ConnectOptions::new(config.database_url()), None).await?;
        info!(database = %config.database, "Connected to test database");
        Ok(db)
    }

    /// Shared handle to the database connection.
    #[must_use]
    pub fn connection(&self) -> Arc<DatabaseConnection> {
        Arc::clone(&self.conn)
    }

    /// Remove every vote and battle.
    pub async fn cleanup(&self) -> Result<(), DbErr> {
        BattleVote::delete_many().exec(self.conn.as_ref()).await?;
        Battle::delete_many().exec(self.conn.as_ref()).await?;

        info!("Cleaned up test database");
        Ok(())
    }
}
