//! One scheduled run: sync, render, publish.
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};

use crate::config::Config;
use crate::feed::render_feed;
use crate::publish::{needs_write, write_feed};
use crate::raindrop::RaindropClient;
use crate::storage::Database;
use crate::sync::{check_for_new_articles, SyncReport};

/// Switches taken from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Echo the rendered feed to standard output.
    pub stdout: bool,
    /// Sync every bookmark instead of only the Unsorted inbox.
    pub all: bool,
}

/// What a run did.
#[derive(Debug)]
pub struct RunReport {
    pub sync: SyncReport,
    /// Whether the feed file was written.
    pub written: bool,
    /// The rendered document.
    pub feed: String,
}

/// Sync bookmarks, render the feed and write it when needed.
///
/// The database is closed before returning, on success and on error alike.
pub async fn run(config: &Config, options: RunOptions) -> Result<RunReport> {
    let db = Database::open(&config.feed.db_path)
        .await
        .with_context(|| format!("Can't open article database '{}'", config.feed.db_path))?;

    let result = run_with_db(&db, config, options).await;
    db.close().await;
    result
}

async fn run_with_db(db: &Database, config: &Config, options: RunOptions) -> Result<RunReport> {
    let sync = sync_stage(db, config, options.all).await?;

    let articles = db
        .get_articles(config.feed.max_entries)
        .await
        .context("Failed to read articles")?;
    let feed = render_feed(&config.feed, &articles);
    tracing::debug!(entries = articles.len(), "Rendered feed");

    if options.stdout {
        println!("{}", feed);
    }

    let path = config.output_path();
    let written = if needs_write(sync.changed(), &path) {
        write_feed(&config.output_dir(), &path, &feed)?;
        true
    } else {
        tracing::info!(path = %path.display(), "No new articles, feed left untouched");
        false
    };

    Ok(RunReport {
        sync,
        written,
        feed,
    })
}

/// Run the sync stage. A client that cannot even be built counts as a remote
/// failure: the run carries on with the stored articles.
async fn sync_stage(db: &Database, config: &Config, all: bool) -> Result<SyncReport> {
    let token = SecretString::from(config.raindrop.client_secret.expose_secret().to_string());
    let client = match RaindropClient::new(token, &config.raindrop.api_url) {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to set up raindrop.io client, skipping sync");
            return Ok(SyncReport {
                remote_error: Some(e.to_string()),
                ..Default::default()
            });
        }
    };

    check_for_new_articles(
        db,
        &client,
        config.raindrop.handled_collection.as_deref(),
        all,
    )
    .await
    .context("Failed to store synced articles")
}
