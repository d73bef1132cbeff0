//! Atom feed rendering.
//!
//! - [`builder`] maps stored articles to an `atom_syndication` document
//! - [`browser`] post-processes the serialized XML so browsers render it as
//!   a page (stylesheet instruction plus an XHTML script element)
//!
//! [`render_feed`] runs both, producing the exact text written to disk.

mod browser;
mod builder;

pub use browser::add_browser_rendering;
pub use builder::build_feed;

use crate::config::FeedSettings;
use crate::storage::Article;

/// Serialize `articles` (already in display order) as the published document.
pub fn render_feed(settings: &FeedSettings, articles: &[Article]) -> String {
    let feed = build_feed(settings, articles);
    add_browser_rendering(&feed.to_string(), &settings.web_path)
}
