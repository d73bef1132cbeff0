//! Publish links saved to raindrop.io as an Atom feed.
//!
//! A run pulls new bookmarks into a local SQLite store ([`sync`]), renders the
//! whole store as a feed ([`feed`]) and writes it to the web directory when
//! something changed ([`publish`]). [`app::run`] ties the stages together.

pub mod app;
pub mod config;
pub mod feed;
pub mod publish;
pub mod raindrop;
pub mod storage;
pub mod sync;
