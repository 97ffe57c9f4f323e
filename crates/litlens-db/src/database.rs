//! Database connection and schema management.

use std::str::FromStr;

use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::error::Result;
use crate::schema;

/// Main database handle. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    url: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DatabaseStats {
    pub articles: i64,
    pub projects: i64,
    pub triages: i64,
    pub protocols: i64,
}

impl Database {
    /// Open (creating if needed) the SQLite database at `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        info!(url = %url, "Connected to database");
        Ok(Self { pool, url: url.to_string() })
    }

    /// Private in-memory database. Uses a single long-lived connection since
    /// every SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self { pool, url: "sqlite::memory:".to_string() })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Create all tables and indexes that do not exist yet.
    pub async fn initialize(&self) -> Result<()> {
        for stmt in schema::STATEMENTS {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        info!(tables = schema::STATEMENTS.len(), "Database schema ready");
        Ok(())
    }

    pub async fn stats(&self) -> Result<DatabaseStats> {
        Ok(DatabaseStats {
            articles: self.count(schema::TABLE_ARTICLES).await?,
            projects: self.count(schema::TABLE_PROJECTS).await?,
            triages: self.count(schema::TABLE_TRIAGES).await?,
            protocols: self.count(schema::TABLE_PROTOCOLS).await?,
        })
    }

    async fn count(&self, table: &str) -> Result<i64> {
        // Table names come from `schema` constants, never from input.
        let n: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        db.initialize().await.unwrap();
        db.initialize().await.unwrap();
        let stats = db.stats().await.unwrap();
        assert_eq!(stats.articles, 0);
        assert_eq!(stats.projects, 0);
    }

    #[tokio::test]
    async fn test_file_database_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("litlens.db");
        let url = format!("sqlite://{}", path.display());
        let db = Database::connect(&url, 2).await.unwrap();
        db.initialize().await.unwrap();
        assert!(path.exists());
        assert_eq!(db.url(), url);
    }
}
