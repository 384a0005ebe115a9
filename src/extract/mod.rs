// src/extract/mod.rs
// =============================================================================
// HTML understanding: which links on a listing page lead to images, which link
// goes to the next listing page, and where a detail page's download button
// points.
//
// Submodules:
// - links: listing pages (detail links + next page)
// - detail: detail pages (final download URL)
// =============================================================================

mod detail;
mod links;

pub use detail::{DetailResolver, Resolution};
pub use links::LinkExtractor;
