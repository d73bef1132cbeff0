//! Putting files into the web directory: the feed itself and the static
//! assets browsers need to render it.
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::Config;

/// Static assets copied by `--install`, relative to the resources directory.
pub const ASSETS: [&str; 4] = ["rss.js", "styles.css", "rss.svg", "favicon.svg"];

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Output directory {0} does not exist. First run the command with the --install flag.")]
    OutputDirMissing(PathBuf),

    #[error("No web_root or web_path in config.")]
    MissingWebPath,

    #[error("No file {0}")]
    MissingAsset(PathBuf),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl PublishError {
    fn io(context: String, source: std::io::Error) -> Self {
        PublishError::Io { context, source }
    }
}

/// Whether the feed file has to be (re)written this run.
///
/// A changed store always triggers a write; an unchanged one only when the
/// file is not there yet.
pub fn needs_write(changed: bool, path: &Path) -> bool {
    changed || !path.is_file()
}

/// Write the feed to `path` inside `dir`.
///
/// Nothing is created when `dir` is missing: that means `--install` has not
/// been run yet.
pub fn write_feed(dir: &Path, path: &Path, body: &str) -> Result<(), PublishError> {
    if !dir.is_dir() {
        return Err(PublishError::OutputDirMissing(dir.to_path_buf()));
    }
    atomic_write(path, body.as_bytes())?;
    tracing::info!(path = %path.display(), bytes = body.len(), "Wrote feed");
    Ok(())
}

/// Copy the static assets from `resources` into the output directory,
/// creating it if needed. Returns the output directory.
///
/// Every source file is checked before the first copy so a missing asset
/// never leaves a half-installed directory.
pub fn install_assets(config: &Config, resources: &Path) -> Result<PathBuf, PublishError> {
    if config.feed.web_root.is_empty() || config.feed.web_path.is_empty() {
        return Err(PublishError::MissingWebPath);
    }

    let sources: Vec<PathBuf> = ASSETS.iter().map(|name| resources.join(name)).collect();
    if let Some(missing) = sources.iter().find(|src| !src.is_file()) {
        return Err(PublishError::MissingAsset(missing.clone()));
    }

    let dir = config.output_dir();
    if !dir.is_dir() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            PublishError::io(format!("Failed to create directory '{}'", dir.display()), e)
        })?;
        tracing::info!(dir = %dir.display(), "Created output directory");
    }

    for (src, name) in sources.iter().zip(ASSETS) {
        let content = std::fs::read(src).map_err(|e| {
            PublishError::io(format!("Failed to read asset '{}'", src.display()), e)
        })?;
        atomic_write(&dir.join(name), &content)?;
        tracing::debug!(asset = %name, "Installed asset");
    }

    Ok(dir)
}

/// Write `content` to `dst` using write-to-temp-then-rename.
/// Readers polling the feed never see a partial file.
fn atomic_write(dst: &Path, content: &[u8]) -> Result<(), PublishError> {
    // SEC-009: Use randomized temp filename to prevent TOCTOU race conditions.
    use std::time::{SystemTime, UNIX_EPOCH};
    let random_suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = dst.with_extension(format!("tmp.{:016x}", random_suffix));

    let mut temp_file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true) // Fails atomically if file exists (prevents symlink race)
        .open(&temp_path)
        .map_err(|e| {
            PublishError::io(
                format!(
                    "Failed to create temporary file '{}': check directory permissions or disk space",
                    temp_path.display()
                ),
                e,
            )
        })?;

    if let Err(e) = temp_file.write_all(content).and_then(|_| temp_file.sync_all()) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(PublishError::io(
            format!(
                "Failed to write temporary file '{}': disk may be full",
                temp_path.display()
            ),
            e,
        ));
    }

    drop(temp_file);

    // On Windows, rename fails if destination exists, so remove it first
    #[cfg(windows)]
    if dst.exists() {
        if let Err(e) = std::fs::remove_file(dst) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(PublishError::io(
                format!("Failed to remove existing '{}'", dst.display()),
                e,
            ));
        }
    }

    std::fs::rename(&temp_path, dst).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        PublishError::io(
            format!(
                "Failed to rename '{}' to '{}': check permissions",
                temp_path.display(),
                dst.display()
            ),
            e,
        )
    })
}
