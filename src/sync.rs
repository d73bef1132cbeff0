//! Pull new bookmarks from raindrop.io into the article store.
//!
//! Remote failures never abort a run: they are logged and the stage reports
//! whatever progress it made, so the feed is re-rendered from the rows that
//! are already stored. Store failures are returned to the caller.
use anyhow::Result;
use chrono::SecondsFormat;

use crate::raindrop::{CollectionRef, RaindropClient};
use crate::storage::{Database, UpsertOutcome};

/// Tag applied to bookmarks once they are in the feed.
pub const HANDLED_TAG: &str = "rss";

/// Outcome of one sync pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Bookmarks returned by the listing.
    pub seen: usize,
    pub inserted: usize,
    pub updated: usize,
    /// Bookmarks moved to the handled collection.
    pub moved: usize,
    /// Set when a remote call failed and the pass stopped early.
    pub remote_error: Option<String>,
}

impl SyncReport {
    /// Whether any row in the store was created or modified.
    pub fn changed(&self) -> bool {
        self.inserted > 0 || self.updated > 0
    }

    fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Unchanged => {}
        }
    }
}

/// Upsert bookmarks from raindrop.io into `db`.
///
/// With `all` set every bookmark is listed and nothing is moved. Otherwise
/// only the Unsorted inbox is listed, and when `handled_collection` names a
/// collection (created on demand) each processed bookmark is moved there and
/// tagged [`HANDLED_TAG`] so the next run does not see it again.
///
/// # Errors
///
/// Only store errors are returned. Remote errors end the pass early and are
/// recorded in [`SyncReport::remote_error`].
pub async fn check_for_new_articles(
    db: &Database,
    client: &RaindropClient,
    handled_collection: Option<&str>,
    all: bool,
) -> Result<SyncReport> {
    let mut report = SyncReport::default();

    let handled_id = match handled_collection {
        Some(title) if !all => match client.get_or_create_collection(title).await {
            Ok(collection) => {
                tracing::debug!(id = collection.id, title = %title, "Resolved handled collection");
                Some(collection.id)
            }
            Err(e) => {
                // Bookmarks are still synced, they just stay in Unsorted
                tracing::warn!(title = %title, error = %e, "Failed to resolve handled collection");
                None
            }
        },
        _ => None,
    };

    let scope = if all {
        CollectionRef::All
    } else {
        CollectionRef::Unsorted
    };

    // The full listing is fetched before anything is moved: moving items out
    // of Unsorted while paging through it would shift later pages.
    let raindrops = match client.search(scope).await {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to list bookmarks, keeping stored articles");
            report.remote_error = Some(e.to_string());
            return Ok(report);
        }
    };
    report.seen = raindrops.len();

    for raindrop in &raindrops {
        let date = raindrop.created.to_rfc3339_opts(SecondsFormat::AutoSi, false);
        let outcome = db
            .upsert_article(&raindrop.link, &date, &raindrop.title, raindrop.note_text())
            .await?;
        report.record(outcome);

        if let Some(collection_id) = handled_id {
            if let Err(e) = client
                .update_raindrop(raindrop.id, collection_id, &raindrop.link, &[HANDLED_TAG])
                .await
            {
                tracing::warn!(
                    id = raindrop.id,
                    link = %raindrop.link,
                    error = %e,
                    "Failed to move bookmark to handled collection, stopping sync"
                );
                report.remote_error = Some(e.to_string());
                return Ok(report);
            }
            report.moved += 1;
        }
    }

    tracing::info!(
        seen = report.seen,
        inserted = report.inserted,
        updated = report.updated,
        moved = report.moved,
        "Sync complete"
    );
    Ok(report)
}
