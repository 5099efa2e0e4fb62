// src/models/mod.rs

//! Domain models for batch jobs.
//!
//! This module contains the data structures shared by the pipelines,
//! organized by their primary purpose.

mod config;
mod domain;
mod input;
mod paper;
mod run;

// Re-export all public types
pub use config::{ApiConfig, Config, JobConfig};
pub use domain::{Availability, CSV_HEADER_V1, CSV_HEADER_V2, DomainCheck, DomainRecord};
pub use input::{item_key, load_input, parse_input};
pub use paper::{
    CSV_HEADER as PAPER_CSV_HEADER, DownloadInfo, DownloadMethod, PaperDetails, PaperPaths,
    PaperRecord,
};
pub use run::{Outcome, RunMeta, RunRecord, RunSummary, iso, now_iso, run_id};
