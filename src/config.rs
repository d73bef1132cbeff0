//! Configuration file parser for `raindrop2rss.cfg`.
//!
//! The file is INI with two sections, `[feed]` and `[raindrop]`. Every key the
//! tool needs must be present: there are no fallbacks for required keys, and a
//! missing one is reported with its section so the operator can fix it.
use ini::{Ini, ParseOption};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default location of the REST API.
pub const DEFAULT_API_URL: &str = "https://api.raindrop.io/rest/v1/";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Can't find configuration file {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid INI in config file: {0}")]
    Parse(String),

    #[error("Config file has no sections")]
    NoSections,

    #[error("Missing key '{key}' in section [{section}]")]
    MissingKey {
        section: &'static str,
        key: &'static str,
    },

    #[error("Invalid value for '{key}' in section [{section}]: {value}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
    },

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Settings from the `[feed]` section.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub web_root: String,
    pub web_path: String,
    pub filename: String,
    pub author_name: String,
    pub author_email: String,
    /// Feed title.
    pub contact_title: String,
    /// Feed id and alternate link.
    pub contact_url: String,
    pub feed_description: String,
    pub db_path: String,
    pub language: String,
    /// Cap on rendered entries. `None` renders every stored article.
    pub max_entries: Option<i64>,
}

/// Settings from the `[raindrop]` section.
///
/// `client_secret` is a [`SecretString`], so the derived `Debug` prints it
/// redacted.
#[derive(Debug)]
pub struct RaindropSettings {
    pub client_secret: SecretString,
    /// Collection that processed bookmarks are moved to. `None` when the
    /// configured value is empty.
    pub handled_collection: Option<String>,
    pub api_url: String,
}

/// Top-level application configuration.
#[derive(Debug)]
pub struct Config {
    pub feed: FeedSettings,
    pub raindrop: RaindropSettings,
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from an INI file.
    ///
    /// - Missing file → `Err(ConfigError::NotFound)`
    /// - File without any section → `Err(ConfigError::NoSections)`
    /// - Missing required key → `Err(ConfigError::MissingKey)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // SEC-014: Check file size before reading to prevent memory exhaustion
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        let config = Self::from_ini_str(&content)?;
        tracing::info!(
            path = %path.display(),
            db_path = %config.feed.db_path,
            output = %config.output_path().display(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse configuration from INI text.
    pub fn from_ini_str(content: &str) -> Result<Self, ConfigError> {
        // Values are taken verbatim: no quote stripping, no backslash escapes.
        let options = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..ParseOption::default()
        };
        let ini = Ini::load_from_str_opt(content, options)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        if ini.sections().flatten().next().is_none() {
            return Err(ConfigError::NoSections);
        }

        let max_entries = match optional(&ini, "feed", "max_entries") {
            None => None,
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(0) => None,
                Ok(n) if n > 0 => Some(n),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        section: "feed",
                        key: "max_entries",
                        value: raw.to_string(),
                    })
                }
            },
        };

        let feed = FeedSettings {
            web_root: required(&ini, "feed", "web_root")?,
            web_path: required(&ini, "feed", "web_path")?,
            filename: required(&ini, "feed", "filename")?,
            author_name: required(&ini, "feed", "author_name")?,
            author_email: required(&ini, "feed", "author_email")?,
            contact_title: required(&ini, "feed", "contact_title")?,
            contact_url: required(&ini, "feed", "contact_url")?,
            feed_description: required(&ini, "feed", "feed_description")?,
            db_path: required(&ini, "feed", "db_path")?,
            language: required(&ini, "feed", "language")?,
            max_entries,
        };

        let handled = required(&ini, "raindrop", "raindrop_handled_collection")?;
        let raindrop = RaindropSettings {
            client_secret: SecretString::from(required(&ini, "raindrop", "client_secret")?),
            handled_collection: (!handled.is_empty()).then_some(handled),
            api_url: optional(&ini, "raindrop", "api_url")
                .filter(|url| !url.is_empty())
                .unwrap_or(DEFAULT_API_URL)
                .to_string(),
        };

        Ok(Self { feed, raindrop })
    }

    /// Directory the feed and its assets are published to.
    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(format!("{}{}", self.feed.web_root, self.feed.web_path))
    }

    /// Full path of the published feed file.
    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(format!(
            "{}{}{}",
            self.feed.web_root, self.feed.web_path, self.feed.filename
        ))
    }
}

fn required(ini: &Ini, section: &'static str, key: &'static str) -> Result<String, ConfigError> {
    optional(ini, section, key)
        .map(|v| v.trim().to_string())
        .ok_or(ConfigError::MissingKey { section, key })
}

fn optional<'a>(ini: &'a Ini, section: &str, key: &str) -> Option<&'a str> {
    ini.section(Some(section)).and_then(|props| props.get(key))
}

// ============================================================================
// Tests
// ============================================================================
