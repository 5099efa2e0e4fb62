//! Content heuristics applied to scrape responses.
//!
//! - `extract`: normalization of the structured-extraction payload
//! - `availability`: domain classification from extraction and markdown
//! - `pdf`: PDF link discovery, ranking and signature checks

pub mod availability;
pub mod extract;
pub mod pdf;

pub use availability::{
    MarkdownSignal, Reconciled, StructuredAvailability, infer_from_markdown, reconcile,
};
pub use extract::{Extracted, is_present, normalize_extract};
