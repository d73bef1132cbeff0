use sqlx::FromRow;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another run holds the database lock
    #[error("The article database is locked, another raindrop2rss run appears to be active.")]
    Locked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5): database is locked
        // SQLITE_LOCKED (6): database table is locked
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
        {
            return DatabaseError::Locked;
        }

        DatabaseError::Other(err)
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A saved link as stored in the `articles` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub id: i64,
    /// Bookmark creation time, RFC 3339.
    pub date: String,
    pub link: String,
    pub title: String,
    /// User annotation, empty when the bookmark has none.
    pub note: String,
}

/// Raw row: legacy databases may carry NULLs in any text column.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct ArticleDbRow {
    pub id: i64,
    pub date: Option<String>,
    pub article_link: Option<String>,
    pub article_title: Option<String>,
    pub note: Option<String>,
}

impl ArticleDbRow {
    pub(crate) fn into_article(self) -> Article {
        Article {
            id: self.id,
            date: self.date.unwrap_or_default(),
            link: self.article_link.unwrap_or_default(),
            title: self.article_title.unwrap_or_default(),
            note: self.note.unwrap_or_default(),
        }
    }
}

/// What an upsert did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The link was new and a row was created.
    Inserted,
    /// The link existed with a different note; date, title and note were replaced.
    Updated,
    /// The link existed with the same note; nothing was written.
    Unchanged,
}

impl UpsertOutcome {
    /// Whether the call mutated state.
    pub fn is_changed(self) -> bool {
        !matches!(self, UpsertOutcome::Unchanged)
    }
}
