//! Service layer for batch jobs.
//!
//! This module contains the business logic for:
//! - Talking to the scrape API (`FirecrawlClient` behind `ScrapeApi`)
//! - Checking one domain (`DomainChecker`)
//! - Downloading one paper (`PaperDownloader`)

pub mod domains;
pub mod firecrawl;
pub mod papers;

pub use domains::DomainChecker;
pub use firecrawl::{ExtractSpec, FirecrawlClient, ScrapeApi, ScrapeData, ScrapeRequest};
pub use papers::PaperDownloader;
