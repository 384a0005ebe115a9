// src/crawl/report.rs
// =============================================================================
// What happened to each detail link, and the totals for a whole session.
// Nothing here is persisted; it exists for the summary printed at the end.
// =============================================================================

use super::queue::DetailLink;
use serde::Serialize;
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Image written to disk
    Saved { path: PathBuf },
    /// Detail page had no download button (not an error)
    Skipped,
    /// Gave up after retries
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadOutcome {
    pub detail_url: String,
    // Listing page (1-based) the detail link was found on
    pub discovered_from_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl DownloadOutcome {
    pub fn saved(link: &DetailLink, final_url: &Url, path: PathBuf) -> Self {
        Self {
            detail_url: link.url.to_string(),
            discovered_from_page: link.discovered_from_page,
            final_url: Some(final_url.to_string()),
            status: OutcomeStatus::Saved { path },
        }
    }

    pub fn skipped(link: &DetailLink) -> Self {
        Self {
            detail_url: link.url.to_string(),
            discovered_from_page: link.discovered_from_page,
            final_url: None,
            status: OutcomeStatus::Skipped,
        }
    }

    pub fn failed(link: &DetailLink, final_url: Option<&Url>, reason: impl ToString) -> Self {
        Self {
            detail_url: link.url.to_string(),
            discovered_from_page: link.discovered_from_page,
            final_url: final_url.map(Url::to_string),
            status: OutcomeStatus::Failed {
                reason: reason.to_string(),
            },
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self.status, OutcomeStatus::Saved { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed { .. })
    }
}

// Why the page walk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    PageBudget,
    NoNextPage,
    NoDetailLinks,
    FetchFailed,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub start_url: String,
    pub pages_fetched: u32,
    pub links_found: usize,
    pub stop_reason: StopReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination_error: Option<String>,
    pub workers: usize,
    // One per worker when shutdown went as planned
    pub shutdown_signals: u32,
    pub outcomes: Vec<DownloadOutcome>,
}

impl SessionReport {
    pub fn saved(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_saved()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.saved() - self.failed()
    }
}
