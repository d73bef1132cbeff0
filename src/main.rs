use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use raindrop2rss::app::{self, RunOptions};
use raindrop2rss::config::{Config, ConfigError};
use raindrop2rss::publish;

#[derive(Parser, Debug)]
#[command(
    name = "raindrop2rss",
    about = "Tool to get links from raindrop.io and publish them as an RSS feed.",
    after_help = "Run it from cron; the feed is only rewritten when new links arrive."
)]
struct Args {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Dump rss to stdout
    #[arg(short = 'o', long)]
    stdout: bool,

    /// Install css, JavaScript, and svg resources
    #[arg(short, long)]
    install: bool,

    /// Download all raindrops (not just unsorted)
    #[arg(short, long)]
    all: bool,

    /// Configuration file
    #[arg(short, long, value_name = "FILE", default_value = "raindrop2rss.cfg")]
    config: PathBuf,

    /// Directory holding the assets copied by --install
    #[arg(short, long, value_name = "DIR", default_value = "resources")]
    resources: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so --stdout output stays a clean feed document
    let default_filter = if args.verbose {
        "raindrop2rss=debug"
    } else {
        "raindrop2rss=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(ConfigError::NotFound(path)) => {
            eprintln!("Can't find configuration file {}.", path.display());
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("Failed to load configuration"),
    };

    if args.install {
        let dir = publish::install_assets(&config, &args.resources)?;
        println!(
            "Installed css, svg, JavaScript, and favicon to {}",
            dir.display()
        );
        return Ok(());
    }

    let report = app::run(
        &config,
        RunOptions {
            stdout: args.stdout,
            all: args.all,
        },
    )
    .await?;

    tracing::debug!(
        changed = report.sync.changed(),
        written = report.written,
        "Run finished"
    );
    Ok(())
}
