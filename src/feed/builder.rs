use atom_syndication::{Entry, Feed, FixedDateTime, Generator, Link, Person, Text};
use chrono::{DateTime, Utc};
use quick_xml::escape::escape;

use crate::config::FeedSettings;
use crate::storage::Article;

/// Build the Atom document for `articles`, keeping their order.
///
/// Titles are HTML-escaped before they go into the document (the serializer
/// then XML-escapes the result again), matching what feed readers have seen
/// from this tool so far. Notes become entry summaries as plain text.
pub fn build_feed(settings: &FeedSettings, articles: &[Article]) -> Feed {
    let now: FixedDateTime = Utc::now().fixed_offset();

    let entries: Vec<Entry> = articles.iter().map(|a| build_entry(a, now)).collect();

    // Newest entry date, so an unchanged store renders an identical document
    let updated = entries.iter().map(|e| e.updated).max().unwrap_or(now);

    Feed {
        title: Text::plain(settings.contact_title.clone()),
        id: settings.contact_url.clone(),
        updated,
        authors: vec![Person {
            name: settings.author_name.clone(),
            email: Some(settings.author_email.clone()),
            ..Default::default()
        }],
        links: vec![Link {
            href: settings.contact_url.clone(),
            rel: "alternate".to_string(),
            ..Default::default()
        }],
        subtitle: Some(Text::plain(settings.feed_description.clone())),
        generator: Some(Generator {
            value: "raindrop2rss".to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
            ..Default::default()
        }),
        lang: Some(settings.language.clone()),
        entries,
        ..Default::default()
    }
}

fn build_entry(article: &Article, fallback: FixedDateTime) -> Entry {
    let published = parse_date(&article.date);
    if published.is_none() {
        tracing::debug!(link = %article.link, date = %article.date, "Unparseable article date");
    }

    Entry {
        title: Text::plain(escape(article.title.as_str()).into_owned()),
        id: article.link.clone(),
        updated: published.unwrap_or(fallback),
        published,
        links: vec![Link {
            href: article.link.clone(),
            rel: "alternate".to_string(),
            ..Default::default()
        }],
        summary: Some(Text::plain(article.note.clone())),
        ..Default::default()
    }
}

fn parse_date(raw: &str) -> Option<FixedDateTime> {
    DateTime::parse_from_rfc3339(raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn settings() -> FeedSettings {
        FeedSettings {
            web_root: "/srv/www".to_string(),
            web_path: "/links/".to_string(),
            filename: "feed.xml".to_string(),
            author_name: "Jane Doe".to_string(),
            author_email: "jane@example.com".to_string(),
            contact_title: "Saved links".to_string(),
            contact_url: "https://example.com/links/".to_string(),
            feed_description: "Things worth reading".to_string(),
            db_path: ":memory:".to_string(),
            language: "en".to_string(),
            max_entries: None,
        }
    }

    fn article(id: i64, date: &str, link: &str, title: &str, note: &str) -> Article {
        Article {
            id,
            date: date.to_string(),
            link: link.to_string(),
            title: title.to_string(),
            note: note.to_string(),
        }
    }

    #[test]
    fn test_feed_metadata() {
        let feed = build_feed(&settings(), &[]);
        assert_eq!(feed.id, "https://example.com/links/");
        assert_eq!(feed.title.value, "Saved links");
        assert_eq!(feed.authors[0].name, "Jane Doe");
        assert_eq!(feed.authors[0].email.as_deref(), Some("jane@example.com"));
        assert_eq!(
            feed.subtitle.as_ref().map(|t| t.value.as_str()),
            Some("Things worth reading")
        );
        assert_eq!(feed.links[0].href, "https://example.com/links/");
        assert_eq!(feed.links[0].rel, "alternate");
        assert_eq!(feed.lang.as_deref(), Some("en"));
        assert!(feed.entries.is_empty());
    }

    #[test]
    fn test_entry_fields() {
        let articles = [article(
            1,
            "2024-01-02T10:00:00+00:00",
            "https://b.example",
            "Rust & <Friends>",
            "note <b>",
        )];
        let feed = build_feed(&settings(), &articles);
        let entry = &feed.entries[0];

        assert_eq!(entry.id, "https://b.example");
        assert_eq!(entry.links[0].href, "https://b.example");
        assert_eq!(entry.title.value, "Rust &amp; &lt;Friends&gt;");
        assert_eq!(
            entry.summary.as_ref().map(|s| s.value.as_str()),
            Some("note <b>")
        );
        assert_eq!(
            entry.published.map(|d| d.to_rfc3339()),
            Some("2024-01-02T10:00:00+00:00".to_string())
        );
        assert_eq!(entry.updated.to_rfc3339(), "2024-01-02T10:00:00+00:00");
    }

    #[test]
    fn test_feed_updated_is_newest_entry() {
        let articles = [
            article(2, "2024-01-02T10:00:00+00:00", "https://b", "B", ""),
            article(1, "2024-01-01T10:00:00+00:00", "https://a", "A", ""),
        ];
        let feed = build_feed(&settings(), &articles);
        assert_eq!(feed.updated.to_rfc3339(), "2024-01-02T10:00:00+00:00");
    }

    #[test]
    fn test_bad_date_has_no_published() {
        let articles = [article(1, "yesterday", "https://a", "A", "")];
        let feed = build_feed(&settings(), &articles);
        assert!(feed.entries[0].published.is_none());
    }
}
