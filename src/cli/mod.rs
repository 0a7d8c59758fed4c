//! CLI commands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::ScrapeConfig;
use crate::scrape::{self, GeoCell, Session};
use crate::store::{migrate_legacy_stores, DataStore};

#[derive(Parser)]
#[command(name = "mapharvest")]
#[command(about = "Incremental, resumable map listing and review harvester")]
#[command(version)]
pub struct Cli {
    /// Config file (TOML); defaults apply when absent
    #[arg(long, global = true, default_value = "mapharvest.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Discover places for a keyword and harvest their reviews
    Scrape {
        /// Search keyword, e.g. 咖啡廳
        keyword: String,
        /// Geographic cell as lat,lng,zoom (repeatable)
        #[arg(long = "at", value_parser = parse_cell, required = true)]
        cells: Vec<GeoCell>,
    },

    /// Show store statistics
    Status,

    /// Convert legacy store files to the canonical schema
    Migrate,
}

fn parse_cell(raw: &str) -> Result<GeoCell, String> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err("expected lat,lng,zoom".to_string());
    }
    let lat = parts[0].parse().map_err(|_| "invalid latitude")?;
    let lng = parts[1].parse().map_err(|_| "invalid longitude")?;
    let zoom = parts[2].parse().map_err(|_| "invalid zoom")?;
    Ok(GeoCell::new(lat, lng, zoom))
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ScrapeConfig::load(&cli.config)?;

    match cli.command {
        Commands::Scrape { keyword, cells } => scrape_command(&config, &keyword, &cells).await,
        Commands::Status => status_command(&config),
        Commands::Migrate => migrate_command(&config),
    }
}

#[cfg(feature = "browser")]
async fn scrape_command(
    config: &ScrapeConfig,
    keyword: &str,
    cells: &[GeoCell],
) -> anyhow::Result<()> {
    use crate::driver::ChromeDriver;

    let store = DataStore::open(&config.paths)?;
    let driver = ChromeDriver::launch(&config.browser).await?;
    let session = Session::new(driver);

    // Teardown runs on both paths; the run error is the one worth surfacing.
    let result = scrape::run(session.driver(), &store, config, keyword, cells).await;
    match result {
        Ok(summary) => {
            session.close().await?;
            println!(
                "discovered {} places ({} new), stored {} reviews, {} already complete, {} failed",
                summary.discovered,
                summary.new_places,
                summary.reviews_stored,
                summary.skipped_completed,
                summary.failed,
            );
            Ok(())
        }
        Err(e) => {
            session.close_quietly().await;
            Err(e)
        }
    }
}

#[cfg(not(feature = "browser"))]
async fn scrape_command(
    _config: &ScrapeConfig,
    _keyword: &str,
    _cells: &[GeoCell],
) -> anyhow::Result<()> {
    anyhow::bail!("this build has no browser support; rebuild with the `browser` feature")
}

fn status_command(config: &ScrapeConfig) -> anyhow::Result<()> {
    let store = DataStore::open(&config.paths)?;
    let places = store.places.load()?;
    let reviews = store.reviews.load()?;

    let completed = places
        .iter()
        .filter(|p| p.completion_state.is_done())
        .count();
    let with_text = reviews.iter().filter(|r| r.has_text()).count();

    println!("data dir: {}", store.data_dir().display());
    println!("places:  {} total, {} complete", places.len(), completed);
    println!("reviews: {} total, {} with text", reviews.len(), with_text);
    Ok(())
}

fn migrate_command(config: &ScrapeConfig) -> anyhow::Result<()> {
    let store = DataStore::open(&config.paths)?;
    let report = migrate_legacy_stores(&store)?;
    println!(
        "migrated {} place rows, {} review rows",
        report.places_migrated, report.reviews_migrated
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_parsing_accepts_lat_lng_zoom() {
        let cell = parse_cell("24.8496199, 121.0237044, 11").unwrap();
        assert_eq!(cell, GeoCell::new(24.8496199, 121.0237044, 11));
        assert!(parse_cell("24.8,121.0").is_err());
        assert!(parse_cell("a,b,c").is_err());
    }
}
