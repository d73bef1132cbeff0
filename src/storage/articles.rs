use anyhow::Result;

use super::schema::Database;
use super::types::{Article, ArticleDbRow, UpsertOutcome};

impl Database {
    // ========================================================================
    // Article Mutations
    // ========================================================================

    /// Insert a bookmark, or refresh it when its note changed.
    ///
    /// The link is the natural key. For a known link, date, title and note are
    /// replaced only when the stored note differs from `note`; title or date
    /// drift alone leaves the row untouched. A uniqueness conflict on the link
    /// is the update path, never an error.
    ///
    /// `IS NOT` rather than `<>` so legacy rows with a NULL note still compare
    /// as different from an empty string.
    pub async fn upsert_article(
        &self,
        link: &str,
        date: &str,
        title: &str,
        note: &str,
    ) -> Result<UpsertOutcome> {
        let mut tx = self.pool.begin().await?;

        let existed: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM articles WHERE article_link = ?")
                .bind(link)
                .fetch_optional(&mut *tx)
                .await?;

        let result = sqlx::query(
            r#"
            INSERT INTO articles (date, article_link, article_title, note)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(article_link) DO UPDATE SET
                date = excluded.date,
                article_title = excluded.article_title,
                note = excluded.note
            WHERE articles.note IS NOT excluded.note
        "#,
        )
        .bind(date)
        .bind(link)
        .bind(title)
        .bind(note)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let outcome = match (existed, result.rows_affected()) {
            (_, 0) => UpsertOutcome::Unchanged,
            (None, _) => UpsertOutcome::Inserted,
            (Some(_), _) => UpsertOutcome::Updated,
        };
        tracing::debug!(link = %link, outcome = ?outcome, "Upserted article");
        Ok(outcome)
    }

    // ========================================================================
    // Article Queries
    // ========================================================================

    /// All articles, newest first (descending insertion id).
    ///
    /// `limit` caps the number of rows; `None` returns everything.
    pub async fn get_articles(&self, limit: Option<i64>) -> Result<Vec<Article>> {
        // SQLite treats a negative LIMIT as "no limit"
        let limit = limit.unwrap_or(-1);
        let rows = sqlx::query_as::<_, ArticleDbRow>(
            r#"
            SELECT id, date, article_link, article_title, note
            FROM articles
            ORDER BY id DESC
            LIMIT ?
        "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ArticleDbRow::into_article).collect())
    }

    /// Look up a single article by its link.
    pub async fn get_article_by_link(&self, link: &str) -> Result<Option<Article>> {
        let row = sqlx::query_as::<_, ArticleDbRow>(
            r#"
            SELECT id, date, article_link, article_title, note
            FROM articles
            WHERE article_link = ?
        "#,
        )
        .bind(link)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ArticleDbRow::into_article))
    }

    pub async fn count_articles(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
