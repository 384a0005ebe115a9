// src/crawl/mod.rs
// =============================================================================
// The harvesting session: one page walker feeding a pool of download workers.
//
// Pieces:
// - queue.rs     the work queue and its item type
// - worker.rs    a single worker: resolve a detail page, save its image
// - pipeline.rs  the coordinator that walks the listing pages and drains
//                the workers at the end
// - report.rs    per-link outcomes and the session summary
//
// Rust concepts:
// - tokio::spawn: each worker is its own task on the runtime
// - JoinHandle: awaiting one collects that worker's report
// =============================================================================

mod pipeline;
mod queue;
mod report;
mod worker;

pub use pipeline::Coordinator;
pub use report::{OutcomeStatus, SessionReport};
