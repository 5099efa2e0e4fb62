//! Domain availability checker.
//!
//! Scrapes a domain-search results page for each domain and classifies it
//! from the structured extraction, reconciled against the page markdown.

use std::sync::Arc;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::json;

use crate::error::Result;
use crate::heuristics::{
    StructuredAvailability, infer_from_markdown, is_present, normalize_extract, reconcile,
};
use crate::models::{DomainCheck, DomainRecord, JobConfig, Outcome, now_iso};
use crate::pipeline::retry::{BASE_DELAY, with_retries};
use crate::services::firecrawl::{ExtractSpec, ScrapeApi, ScrapeRequest};

/// Search page queried for each domain.
pub const SEARCH_BASE: &str = "https://instantdomainsearch.com/";

const EXTRACT_PROMPT: &str = "You are checking domain availability on a domain search results page. \
Return ONLY a JSON object with keys: availability (one of available/taken/unknown), \
price (string or null), and notes (string).";

/// Bytes left as-is in the `q` parameter; everything else is `%XX`.
const QUERY_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Search URL for a domain, with the domain percent-encoded as `q`.
pub fn search_url(domain: &str) -> String {
    format!("{SEARCH_BASE}?q={}", utf8_percent_encode(domain, QUERY_SAFE))
}

fn extract_spec() -> ExtractSpec {
    ExtractSpec {
        prompt: EXTRACT_PROMPT.to_string(),
        schema: json!({
            "type": "object",
            "properties": {
                "availability": {"type": "string", "enum": ["available", "taken", "unknown"]},
                "price": {"type": ["string", "null"]},
                "notes": {"type": "string"}
            },
            "required": ["availability", "price", "notes"],
            "additionalProperties": false
        }),
    }
}

/// Checks one domain at a time against a [`ScrapeApi`].
pub struct DomainChecker {
    api: Arc<dyn ScrapeApi>,
    job: JobConfig,
}

impl DomainChecker {
    pub fn new(api: Arc<dyn ScrapeApi>, job: JobConfig) -> Self {
        Self { api, job }
    }

    /// Check one domain. Never fails: errors become failed records.
    ///
    /// `index` is the 1-based position in the run's work list.
    pub async fn check(&self, domain: &str, index: usize) -> DomainRecord {
        let search_url = search_url(domain);
        let timestamp = now_iso();

        let outcome: Outcome<DomainCheck> = self.classify(domain, &search_url).await.into();
        if let Outcome::Failure { error } = &outcome {
            log::warn!("{domain}: {error}");
        }

        DomainRecord {
            domain: domain.to_string(),
            search_url,
            index,
            timestamp,
            outcome,
        }
    }

    async fn classify(&self, domain: &str, search_url: &str) -> Result<DomainCheck> {
        let request = ScrapeRequest::page(
            search_url,
            vec!["extract", "markdown"],
            extract_spec(),
            self.job.waitfor_ms,
            self.job.timeout_ms,
        );

        let data = with_retries(self.job.retries, BASE_DELAY, || self.api.scrape(&request)).await?;

        let extracted = normalize_extract(data.extract.as_ref());
        let structured = StructuredAvailability::from_extract(extracted.as_ref());
        let markdown = data.markdown.as_deref().unwrap_or_default();

        let signal = (!markdown.is_empty()).then(|| infer_from_markdown(markdown, domain));
        let verdict = reconcile(structured, signal.as_ref());

        Ok(DomainCheck {
            availability: verdict.availability,
            price: verdict.price,
            notes: verdict.notes,
            has_extract: is_present(data.extract.as_ref()),
            has_markdown: !markdown.is_empty(),
        })
    }
}
