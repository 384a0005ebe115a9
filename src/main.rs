// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Turn them into a validated config (bad input stops us before any work)
// 3. Dispatch to the subcommand handler
// 4. Print the summary and exit with the proper code
//    (0 = everything saved, 1 = some images failed, 2 = error)
//
// Rust concepts used:
// - async/await: the pipeline runs on the tokio runtime
// - Arc<dyn Trait>: the real browser and HTTP client are handed to the
//   pipeline as trait objects, tests hand in fakes instead
// =============================================================================

// Module declarations - tells Rust about our other source files
mod cli;          // src/cli.rs - command-line parsing
mod config;       // src/config.rs - validated settings and pacing
mod crawl;        // src/crawl/ - coordinator, queue and workers
mod download;     // src/download/ - writing images to disk
mod error;        // src/error.rs - leaf error type
mod extract;      // src/extract/ - HTML scanning
mod http;         // src/http.rs - plain GET client
mod logging;      // src/logging.rs - tracing setup
mod render;       // src/render/ - headless browser
mod retry;        // src/retry.rs - retry policy

#[cfg(test)]
mod testing;

use anyhow::Result;
use clap::Parser;
use cli::{BrowserArgs, Cli, Commands, HarvestArgs, SiteArgs};
use config::{parse_start_url, BrowserSettings, HarvestConfig, Pacing, SiteProfile};
use crawl::{Coordinator, OutcomeStatus, SessionReport};
use extract::{DetailResolver, Resolution};
use http::ReqwestHttp;
use render::{ChromeRenderer, Fetcher};
use retry::RetryPolicy;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    logging::init();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // Bad input or a setup failure, nothing was harvested
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Returns:
//   Ok(0) = no failed items
//   Ok(1) = at least one item failed
//   Err   = fatal, main turns it into exit code 2
async fn run() -> Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Harvest(args) => handle_harvest(&args).await,
        Commands::Resolve {
            detail_url,
            site,
            browser,
        } => handle_resolve(&detail_url, &site, &browser).await,
    }
}

// Handles the 'harvest' subcommand
async fn handle_harvest(args: &HarvestArgs) -> Result<i32> {
    let config = HarvestConfig::from_args(args)?;
    config.prepare_target_dir().await?;

    println!("🖼️  Harvesting: {}", config.start_url);
    println!("📁 Saving to: {}", config.target_dir.display());
    println!(
        "📊 Pages: {}  Workers: {}  Scroll: {}",
        config.page_budget,
        config.workers,
        if config.want_scroll { "yes" } else { "no" }
    );

    let renderer = Arc::new(ChromeRenderer::new(
        config.browser.headless,
        &config.site.next_page_labels,
    ));
    let http = Arc::new(ReqwestHttp::new(config.pacing.request_timeout)?);

    let coordinator = Coordinator::from_config(&config, renderer, http)?;
    let report = coordinator.run(&config.start_url).await;

    print_results(&report, args.json)?;

    if report.failed() > 0 {
        Ok(1)
    } else {
        Ok(0)
    }
}

// Handles the 'resolve' subcommand: one detail page, no downloads
async fn handle_resolve(detail_url: &str, site: &SiteArgs, browser: &BrowserArgs) -> Result<i32> {
    let url = parse_start_url(detail_url)?;
    let site = SiteProfile::from_args(site)?;
    let browser = BrowserSettings::from(browser);
    let pacing = Pacing::default();
    let retry = RetryPolicy::default();

    println!("🔍 Resolving: {}", url);

    let resolver = if browser.render_details {
        let renderer = Arc::new(ChromeRenderer::new(browser.headless, &site.next_page_labels));
        DetailResolver::rendered(Fetcher::new(renderer, pacing, retry), &site, &pacing)?
    } else {
        let http = Arc::new(ReqwestHttp::new(pacing.request_timeout)?);
        DetailResolver::over_http(http, &site, &pacing, retry)?
    };

    match resolver.resolve(&url).await {
        Ok(Resolution::Found(image)) => {
            println!("✅ {}", image);
            Ok(0)
        }
        Ok(Resolution::NotFound) => {
            println!("⚠️  No download control on this page");
            Ok(0)
        }
        Err(e) => {
            println!("❌ {}", e);
            Ok(1)
        }
    }
}

// Prints the session either as a table or JSON
fn print_results(report: &SessionReport, json: bool) -> Result<()> {
    if json {
        let json_output = serde_json::to_string_pretty(report)?;
        println!("{}", json_output);
    } else {
        print_table(report);
    }
    Ok(())
}

fn print_table(report: &SessionReport) {
    println!();
    println!("{:<60} {:<6} {:<12} {:<40}", "DETAIL PAGE", "PAGE", "STATUS", "RESULT");
    println!("{}", "=".repeat(119));

    for outcome in &report.outcomes {
        let (status, detail) = match &outcome.status {
            OutcomeStatus::Saved { path } => ("✅ SAVED", path.display().to_string()),
            OutcomeStatus::Skipped => ("⏭️  SKIPPED", "no download control".to_string()),
            OutcomeStatus::Failed { reason } => ("❌ FAILED", reason.clone()),
        };

        // Truncate URL if too long for display
        let url_display = if outcome.detail_url.len() > 57 {
            format!("{}...", &outcome.detail_url[..57])
        } else {
            outcome.detail_url.clone()
        };

        println!(
            "{:<60} {:<6} {:<12} {:<40}",
            url_display, outcome.discovered_from_page, status, detail
        );
    }

    println!();
    println!("📊 Summary:");
    println!("   📄 Pages fetched: {} (stopped: {:?})", report.pages_fetched, report.stop_reason);
    if let Some(error) = &report.pagination_error {
        println!("   ⚠️  Pagination error: {}", error);
    }
    println!("   🔗 Detail links: {}", report.links_found);
    println!("   ✅ Saved: {}", report.saved());
    println!("   ⏭️  Skipped: {}", report.skipped());
    println!("   ❌ Failed: {}", report.failed());
}
