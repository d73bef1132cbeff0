use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bookmark as returned by the REST API.
///
/// Only the fields the tool consumes are decoded; the rest of the payload is
/// ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Raindrop {
    #[serde(rename = "_id")]
    pub id: i64,
    pub link: String,
    #[serde(default)]
    pub title: String,
    pub created: DateTime<Utc>,
    /// Free-text annotation. The API omits it or sends `null` for bookmarks
    /// without one.
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Raindrop {
    /// The note, or an empty string when the bookmark has none.
    pub fn note_text(&self) -> &str {
        self.note.as_deref().unwrap_or_default()
    }
}

/// A named bookmark collection.
#[derive(Debug, Clone, Deserialize)]
pub struct Collection {
    #[serde(rename = "_id")]
    pub id: i64,
    #[serde(default)]
    pub title: String,
}

/// Collection selector for listing bookmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionRef {
    /// Every bookmark except trash.
    All,
    /// The default inbox.
    Unsorted,
    Trash,
    Id(i64),
}

impl CollectionRef {
    pub fn id(self) -> i64 {
        match self {
            CollectionRef::All => 0,
            CollectionRef::Unsorted => -1,
            CollectionRef::Trash => -99,
            CollectionRef::Id(id) => id,
        }
    }
}

// ============================================================================
// Wire envelopes
// ============================================================================

/// `{"result": true, "items": [...]}`
#[derive(Debug, Deserialize)]
pub(crate) struct ItemsResponse<T> {
    pub result: bool,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default, rename = "errorMessage")]
    pub error_message: Option<String>,
}

/// `{"result": true, "item": {...}}`
#[derive(Debug, Deserialize)]
pub(crate) struct ItemResponse<T> {
    pub result: bool,
    pub item: Option<T>,
    #[serde(default, rename = "errorMessage")]
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CollectionId {
    #[serde(rename = "$id")]
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewCollection<'a> {
    pub title: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RaindropUpdate<'a> {
    pub collection: CollectionId,
    pub link: &'a str,
    pub tags: &'a [&'a str],
}
