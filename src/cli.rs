// src/cli.rs
// =============================================================================
// Command-line interface, defined with clap's derive API.
//
// Two subcommands:
// - harvest: walk a gallery listing and download every image it leads to
// - resolve: resolve a single detail page to its download URL (handy for
//            checking that the selectors still match the site)
// =============================================================================

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "gallery-harvest",
    version = "0.1.0",
    about = "Walk a paginated image gallery and download every full-size image",
    long_about = "gallery-harvest renders a gallery listing, follows each preview to its detail page, \
                  finds the download button there and saves the image it points to."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl a gallery listing and download every image found
    ///
    /// Example: gallery-harvest harvest https://wallspic.com/cn/album/riben_dongman --pages 2
    Harvest(HarvestArgs),

    /// Resolve one detail page to its final download URL
    ///
    /// Example: gallery-harvest resolve https://wallspic.com/cn/image/12345
    Resolve {
        /// Detail page URL
        detail_url: String,

        #[command(flatten)]
        site: SiteArgs,

        #[command(flatten)]
        browser: BrowserArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct HarvestArgs {
    /// Listing page to start from (must be http:// or https://)
    pub start_url: String,

    /// Directory the images are written to (created if missing)
    #[arg(long, default_value = "images")]
    pub out: PathBuf,

    /// Number of download workers
    #[arg(long, default_value_t = 5)]
    pub workers: usize,

    /// Maximum number of listing pages to walk
    #[arg(long, default_value_t = 5)]
    pub pages: u32,

    /// Do not scroll listing pages to trigger lazy loading
    #[arg(long)]
    pub no_scroll: bool,

    /// Print the session summary as JSON instead of a table
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub site: SiteArgs,

    #[command(flatten)]
    pub browser: BrowserArgs,
}

// Knobs describing how the target site marks previews and download buttons
#[derive(Args, Debug, Clone)]
pub struct SiteArgs {
    /// Substring a preview image URL must contain (host part)
    #[arg(long, default_value = "wallspic.com")]
    pub host_marker: String,

    /// Substring a preview image URL must contain (path part)
    #[arg(long, default_value = "previews")]
    pub path_marker: String,

    /// CSS selector of the download button on a detail page
    #[arg(long, default_value = "a.wallpaper__download")]
    pub download_selector: String,
}

#[derive(Args, Debug, Clone)]
pub struct BrowserArgs {
    /// Load detail pages in the browser instead of a plain HTTP GET
    #[arg(long)]
    pub render_details: bool,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub headful: bool,
}
