//! Configuration for the harvesting pipeline.
//!
//! Everything tunable lives here with serde defaults, so an empty (or
//! missing) config file yields a working setup. Quota thresholds are
//! configuration by design: the defaults are the dual-quota policy
//! (60 with-text / 160 total), and a single-quota run at a larger ceiling is
//! just an override.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Root configuration, loadable from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    #[serde(default)]
    pub quotas: QuotaConfig,

    #[serde(default)]
    pub discovery: ScrollConfig,

    #[serde(default)]
    pub reviews: ReviewScrollConfig,

    #[serde(default = "default_intro_scroll")]
    pub intro: ScrollConfig,

    #[serde(default)]
    pub paths: PathConfig,

    #[serde(default)]
    pub browser: BrowserConfig,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            quotas: QuotaConfig::default(),
            discovery: ScrollConfig::default(),
            reviews: ReviewScrollConfig::default(),
            intro: default_intro_scroll(),
            paths: PathConfig::default(),
            browser: BrowserConfig::default(),
        }
    }
}

/// Per-entity review volume ceilings, checked before and during harvesting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Stop once this many stored reviews carry free text.
    #[serde(default = "default_text_quota")]
    pub text_quota: usize,

    /// Stop once this many reviews are stored in total.
    #[serde(default = "default_total_quota")]
    pub total_quota: usize,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            text_quota: default_text_quota(),
            total_quota: default_total_quota(),
        }
    }
}

fn default_text_quota() -> usize {
    60
}

fn default_total_quota() -> usize {
    160
}

/// Scroll-to-convergence tuning for a scrollable container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollConfig {
    /// Consecutive no-growth probes before the container counts as drained.
    #[serde(default = "default_no_growth_threshold")]
    pub no_growth_threshold: u32,

    /// Hard ceiling on scroll commands regardless of growth.
    #[serde(default = "default_max_scrolls")]
    pub max_scrolls: u32,

    /// Pause between scroll and probe, in milliseconds.
    #[serde(default = "default_pause_ms")]
    pub pause_ms: u64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            no_growth_threshold: default_no_growth_threshold(),
            max_scrolls: default_max_scrolls(),
            pause_ms: default_pause_ms(),
        }
    }
}

fn default_no_growth_threshold() -> u32 {
    3
}

fn default_max_scrolls() -> u32 {
    200
}

fn default_pause_ms() -> u64 {
    300
}

/// The about panel is short; it drains in a few scrolls.
fn default_intro_scroll() -> ScrollConfig {
    ScrollConfig {
        no_growth_threshold: 2,
        max_scrolls: 10,
        pause_ms: 500,
    }
}

/// Review-panel scrolling adds a batch cap and an expansion retry cap on top
/// of the common scroll tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewScrollConfig {
    #[serde(default = "default_no_growth_threshold")]
    pub no_growth_threshold: u32,

    #[serde(default = "default_review_max_scrolls")]
    pub max_scrolls: u32,

    #[serde(default = "default_pause_ms")]
    pub pause_ms: u64,

    /// Newly rendered reviews processed per scroll iteration.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Clicks attempted on a "show more" control before giving up on full
    /// expansion. Long bodies can need more than one click.
    #[serde(default = "default_expand_attempts")]
    pub expand_attempts: u32,

    /// Wait for the review container itself, in seconds. Missing the
    /// container is fatal for the entity, so this is the long wait.
    #[serde(default = "default_container_timeout_secs")]
    pub container_timeout_secs: u64,
}

impl Default for ReviewScrollConfig {
    fn default() -> Self {
        Self {
            no_growth_threshold: default_no_growth_threshold(),
            max_scrolls: default_review_max_scrolls(),
            pause_ms: default_pause_ms(),
            batch_size: default_batch_size(),
            expand_attempts: default_expand_attempts(),
            container_timeout_secs: default_container_timeout_secs(),
        }
    }
}

fn default_review_max_scrolls() -> u32 {
    10_000
}

fn default_batch_size() -> usize {
    50
}

fn default_expand_attempts() -> u32 {
    3
}

fn default_container_timeout_secs() -> u64 {
    60
}

/// Where the stores and downloaded images live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            image_dir: default_image_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_image_dir() -> PathBuf {
    PathBuf::from("img")
}

/// Browser driver settings, consumed by the CDP driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run headless (default). Set false when debugging selectors.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Element wait timeout for optional affordances, in seconds.
    #[serde(default = "default_wait_secs")]
    pub wait_secs: u64,

    /// Extra Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            wait_secs: default_wait_secs(),
            chrome_args: Vec::new(),
        }
    }
}

fn default_headless() -> bool {
    true
}

fn default_wait_secs() -> u64 {
    10
}

impl ScrapeConfig {
    /// Load from a TOML file, or defaults when the file does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        let config = toml::from_str(&raw)?;
        Ok(config)
    }
}
