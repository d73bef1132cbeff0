//! Client for the raindrop.io REST API.
//!
//! Only the four calls the sync stage needs are implemented:
//!
//! - **List** bookmarks in a collection, page by page ([`RaindropClient::search`])
//! - **List** collections, root and nested
//! - **Create** a collection
//! - **Update** a bookmark's collection and tags
//!
//! All calls authenticate with the operator's API token as a bearer
//! credential. Errors are typed as [`RaindropError`] so callers can decide
//! which failures are fatal.

mod client;
mod types;

pub use client::{RaindropClient, RaindropError, PER_PAGE};
pub use types::{Collection, CollectionRef, Raindrop};
