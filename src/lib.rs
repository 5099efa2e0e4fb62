// src/lib.rs

//! firebatch: checkpointed batch jobs over a Firecrawl-compatible scrape API.

pub mod config;
pub mod error;
pub mod heuristics;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
