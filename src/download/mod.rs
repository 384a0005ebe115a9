// src/download/mod.rs
// =============================================================================
// Saving images to disk. See writer.rs for the write discipline.
// =============================================================================

mod writer;

pub use writer::{ImageWriter, WriteLock};
