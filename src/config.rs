// src/config.rs
// =============================================================================
// Validated configuration for a harvest session.
//
// The CLI hands us raw strings and numbers; this module turns them into a
// HarvestConfig and refuses to start if anything is unusable. A bad start URL
// is rejected here, before any browser is launched or queue created.
//
// Also home to Pacing: every sleep and bounded wait the pipeline performs.
// =============================================================================

use crate::cli::{BrowserArgs, HarvestArgs, SiteArgs};
use crate::retry::RetryPolicy;
use anyhow::{anyhow, bail, Context, Result};
use scraper::Selector;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

// Link texts that mark a "next page" control, one per supported locale
pub const NEXT_PAGE_LABELS: [&str; 2] = ["下一页", "Next"];

#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub start_url: Url,
    pub target_dir: PathBuf,
    pub workers: usize,
    pub page_budget: u32,
    pub want_scroll: bool,
    pub browser: BrowserSettings,
    pub site: SiteProfile,
    pub pacing: Pacing,
    pub retry: RetryPolicy,
}

impl HarvestConfig {
    pub fn from_args(args: &HarvestArgs) -> Result<Self> {
        let start_url = parse_start_url(&args.start_url)?;

        if args.workers == 0 {
            bail!("--workers must be at least 1");
        }
        if args.pages == 0 {
            bail!("--pages must be at least 1");
        }

        Ok(Self {
            start_url,
            target_dir: args.out.clone(),
            workers: args.workers,
            page_budget: args.pages,
            want_scroll: !args.no_scroll,
            browser: BrowserSettings::from(&args.browser),
            site: SiteProfile::from_args(&args.site)?,
            pacing: Pacing::default(),
            retry: RetryPolicy::default(),
        })
    }

    pub async fn prepare_target_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.target_dir)
            .await
            .with_context(|| format!("cannot create {}", self.target_dir.display()))
    }
}

// Settings shared by the browser and the detail resolver
#[derive(Debug, Clone, Copy)]
pub struct BrowserSettings {
    pub render_details: bool,
    pub headless: bool,
}

impl From<&BrowserArgs> for BrowserSettings {
    fn from(args: &BrowserArgs) -> Self {
        Self {
            render_details: args.render_details,
            headless: !args.headful,
        }
    }
}

// Parses the starting URL; only http and https are accepted
pub fn parse_start_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| anyhow!("Invalid URL '{}': {}", raw, e))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(anyhow!(
            "URL must start with http:// or https:// (got '{}:')",
            other
        )),
    }
}

// How the target site marks the things we look for
#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub host_marker: String,
    pub path_marker: String,
    pub download_selector: String,
    pub next_page_labels: Vec<String>,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            host_marker: "wallspic.com".to_string(),
            path_marker: "previews".to_string(),
            download_selector: "a.wallpaper__download".to_string(),
            next_page_labels: NEXT_PAGE_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SiteProfile {
    pub fn from_args(args: &SiteArgs) -> Result<Self> {
        Selector::parse(&args.download_selector)
            .map_err(|e| anyhow!("Invalid --download-selector '{}': {}", args.download_selector, e))?;

        Ok(Self {
            host_marker: args.host_marker.clone(),
            path_marker: args.path_marker.clone(),
            download_selector: args.download_selector.clone(),
            ..Self::default()
        })
    }
}

// A randomized delay, uniform over [min, max]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jitter {
    pub min: Duration,
    pub max: Duration,
}

impl Jitter {
    pub const NONE: Jitter = Jitter::between(Duration::ZERO, Duration::ZERO);

    pub const fn between(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let secs = rand::random_range(self.min.as_secs_f64()..=self.max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    pub async fn sleep(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    /// Wait after each scroll for lazy content to load
    pub scroll_settle: Jitter,
    /// Wait between two listing pages
    pub page_turn: Jitter,
    /// Wait after each detail page request
    pub resolve_throttle: Jitter,
    /// Wait after each download attempt
    pub download_throttle: Jitter,
    /// Upper bound for the initial page load
    pub load_timeout: Duration,
    /// Upper bound for finding the "next page" control
    pub control_timeout: Duration,
    /// Upper bound for each HTTP wait: connect, headers, and every gap
    /// between body chunks (a slow but steady download is never cut off)
    pub request_timeout: Duration,
    /// Scroll steps allowed per fetch, so endless feeds still terminate
    pub max_scroll_steps: u32,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            scroll_settle: Jitter::between(Duration::from_secs(2), Duration::from_secs(4)),
            page_turn: Jitter::between(Duration::from_secs(2), Duration::from_secs(5)),
            resolve_throttle: Jitter::between(Duration::from_secs(1), Duration::from_secs(3)),
            download_throttle: Jitter::between(Duration::from_millis(500), Duration::from_secs(2)),
            load_timeout: Duration::from_secs(15),
            control_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            max_scroll_steps: 50,
        }
    }
}

impl Pacing {
    // No sleeps at all; used by tests so sessions run instantly
    #[cfg(test)]
    pub fn immediate() -> Self {
        Self {
            scroll_settle: Jitter::NONE,
            page_turn: Jitter::NONE,
            resolve_throttle: Jitter::NONE,
            download_throttle: Jitter::NONE,
            load_timeout: Duration::from_secs(5),
            control_timeout: Duration::from_secs(1),
            request_timeout: Duration::from_secs(5),
            max_scroll_steps: 20,
        }
    }
}
