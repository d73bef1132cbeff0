use anyhow::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::DatabaseError;

// ============================================================================
// Database
// ============================================================================

#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open the article database, creating the file and table if needed.
    ///
    /// `:memory:` opens a private in-memory database (used by tests).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Locked` if another run holds the database lock.
    /// Returns `DatabaseError::Other` for other database errors.
    pub async fn open(path: &str) -> Result<Self, DatabaseError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // busy_timeout=5000: a second run started by cron while the first is
        // still writing waits up to 5 seconds before SQLITE_BUSY.
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(DatabaseError::from_sqlx)?
            .pragma("busy_timeout", "5000");
        // One connection: every stage runs sequentially.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        let db = Self { pool };
        db.migrate().await.map_err(|e| {
            let error_string = e.to_string().to_lowercase();
            if error_string.contains("database is locked")
                || error_string.contains("sqlite_busy")
            {
                DatabaseError::Locked
            } else {
                DatabaseError::Migration(e.to_string())
            }
        })?;
        tracing::debug!(path = %path, "Article database ready");
        Ok(db)
    }

    /// Create the articles table.
    ///
    /// The column layout matches databases written by earlier releases so an
    /// existing file keeps working. `IF NOT EXISTS` makes this a no-op on
    /// every run after the first.
    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY,
                date VARCHAR,
                article_link VARCHAR UNIQUE,
                article_title VARCHAR,
                note VARCHAR
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Release the connection pool. Pending statements finish first.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::debug!("Article database closed");
    }
}
