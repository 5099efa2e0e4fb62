//! Research paper downloader.
//!
//! For each landing page: scrape it, save the markdown, collect PDF
//! candidates, and try them best-first until one yields real PDF bytes.
//! Each candidate is tried with a direct GET first and through the scrape
//! API as a fallback.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::heuristics::pdf::{
    absolute_url, dedupe, find_pdf_meta, find_pdf_urls_in_text, looks_like_pdf, order_candidates,
    site_fallbacks, unescape,
};
use crate::heuristics::{Extracted, normalize_extract};
use crate::models::{
    DownloadInfo, DownloadMethod, JobConfig, Outcome, PaperDetails, PaperPaths, PaperRecord,
    now_iso,
};
use crate::pipeline::retry::{BASE_DELAY, with_retries};
use crate::services::firecrawl::{ExtractSpec, ScrapeApi, ScrapeRequest};
use crate::storage::{LocalStorage, run_key};
use crate::utils::http::{PDF_ACCEPT, fetch_binary};
use crate::utils::slugify;

pub const PAGE_MARKDOWN: &str = "page.md";
pub const METADATA_JSON: &str = "metadata.json";
pub const PAPER_PDF: &str = "paper.pdf";

const EXTRACT_PROMPT: &str = "You are extracting bibliographic info and the best PDF download link \
from a research paper landing page. Return ONLY a JSON object with keys: title (string or null), \
authors (array of strings), published (string or null), pdfUrl (string or null), and notes (string).";

fn extract_spec() -> ExtractSpec {
    ExtractSpec {
        prompt: EXTRACT_PROMPT.to_string(),
        schema: json!({
            "type": "object",
            "properties": {
                "title": {"type": ["string", "null"]},
                "authors": {"type": "array", "items": {"type": "string"}},
                "published": {"type": ["string", "null"]},
                "pdfUrl": {"type": ["string", "null"]},
                "notes": {"type": "string"}
            },
            "required": ["title", "authors", "published", "pdfUrl", "notes"],
            "additionalProperties": false
        }),
    }
}

/// Per-item directory name: `NNN-<slug>`.
pub fn item_dir_name(index: usize, url: &str) -> String {
    format!("{index:03}-{}", slugify(url))
}

/// All PDF candidates for a landing page, in discovery order.
///
/// The extraction's `pdfUrl` comes first, then links found in the markdown,
/// the HTML (including `citation_pdf_url` meta tags), and finally URL
/// patterns known for specific publishers.
pub fn discover_candidates(
    landing_url: &str,
    extracted: Option<&Extracted>,
    markdown: &str,
    html: Option<&str>,
) -> Vec<String> {
    let mut found = Vec::new();

    if let Some(pdf_url) = extracted.and_then(|e| e.str_field("pdfUrl")) {
        found.push(absolute_url(landing_url, &unescape(pdf_url.trim())));
    }
    if !markdown.trim().is_empty() {
        found.extend(find_pdf_urls_in_text(markdown, landing_url));
    }
    if let Some(html) = html.filter(|h| !h.trim().is_empty()) {
        found.extend(find_pdf_urls_in_text(html, landing_url));
        found.extend(find_pdf_meta(html, landing_url));
    }
    found.extend(site_fallbacks(landing_url));

    dedupe(found)
}

/// Downloads papers for one run into `runs/<run_id>/`.
pub struct PaperDownloader {
    api: Arc<dyn ScrapeApi>,
    http: Client,
    job: JobConfig,
    storage: LocalStorage,
}

impl PaperDownloader {
    /// `http` is used for direct PDF downloads and should carry the
    /// download timeout and user agent.
    pub fn new(api: Arc<dyn ScrapeApi>, http: Client, job: JobConfig, storage: LocalStorage) -> Self {
        Self {
            api,
            http,
            job,
            storage,
        }
    }

    /// Process one landing page. Never fails: errors become failed records.
    ///
    /// `index` is the 1-based position in the run's work list.
    pub async fn process(&self, run_id: &str, url: &str, index: usize) -> PaperRecord {
        let timestamp = now_iso();
        let dir_key = run_key(run_id, &item_dir_name(index, url));

        let outcome: Outcome<PaperDetails> = self.fetch_details(url, &dir_key).await.into();
        if let Outcome::Failure { error } = &outcome {
            log::warn!("{url}: {error}");
        }

        let record = PaperRecord {
            index,
            url: url.to_string(),
            run_id: run_id.to_string(),
            timestamp,
            outcome,
        };

        let metadata_key = format!("{dir_key}/{METADATA_JSON}");
        if let Err(e) = self.storage.write_json(&metadata_key, &record).await {
            log::warn!("Failed to write {metadata_key}: {e}");
        }
        record
    }

    async fn fetch_details(&self, url: &str, dir_key: &str) -> Result<PaperDetails> {
        let dir = self.storage.create_dir(dir_key).await?;

        let request = ScrapeRequest::page(
            url,
            vec!["extract", "markdown", "html"],
            extract_spec(),
            self.job.waitfor_ms,
            self.job.timeout_ms,
        );
        let data = with_retries(self.job.retries, BASE_DELAY, || self.api.scrape(&request)).await?;

        let markdown = data.markdown.unwrap_or_default();
        let page_key = format!("{dir_key}/{PAGE_MARKDOWN}");
        self.storage.write_text(&page_key, &markdown).await?;

        let extracted = normalize_extract(data.extract.as_ref());
        let candidates =
            discover_candidates(url, extracted.as_ref(), &markdown, data.html.as_deref());
        log::debug!("{url}: {} PDF candidates", candidates.len());

        let pdf_key = format!("{dir_key}/{PAPER_PDF}");
        let attempt = self.download_first(&candidates, &pdf_key).await;

        let authors = extracted
            .as_ref()
            .and_then(|e| e.field("authors"))
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let downloaded = attempt.download.is_some();
        Ok(PaperDetails {
            title: extracted.as_ref().and_then(|e| e.str_field("title")).map(str::to_string),
            authors,
            published: extracted
                .as_ref()
                .and_then(|e| e.str_field("published"))
                .map(str::to_string),
            extract_notes: extracted.as_ref().map(Extracted::notes).unwrap_or_default(),
            pdf_candidates: candidates,
            pdf_url: attempt.url,
            pdf_downloaded: downloaded,
            pdf_download: attempt.download,
            pdf_error: attempt.error,
            paths: PaperPaths {
                dir: dir.display().to_string(),
                page_markdown: self.storage.path(&page_key).display().to_string(),
                pdf: downloaded.then(|| self.storage.path(&pdf_key).display().to_string()),
            },
        })
    }

    /// Try candidates best-first; stop at the first real PDF.
    async fn download_first(&self, candidates: &[String], pdf_key: &str) -> PdfAttempt {
        let mut attempt = PdfAttempt::default();

        for candidate in order_candidates(candidates) {
            if self.job.delay_ms > 0 {
                tokio::time::sleep(self.job.delay()).await;
            }

            match self.download(&candidate, pdf_key).await {
                Ok(info) => {
                    attempt.url = Some(candidate);
                    attempt.download = Some(info);
                    attempt.error = None;
                    break;
                }
                Err(e) => {
                    log::debug!("PDF candidate {candidate} failed: {e}");
                    attempt.error = Some(e.to_string());
                }
            }
        }
        attempt
    }

    async fn download(&self, url: &str, pdf_key: &str) -> Result<DownloadInfo> {
        let info = match self.direct(url).await {
            Ok((bytes, info)) => {
                self.storage.write_bytes(pdf_key, &bytes).await?;
                info
            }
            Err(direct_error) => {
                let bytes = with_retries(self.job.retries, BASE_DELAY, || self.via_api(url)).await?;
                self.storage.write_bytes(pdf_key, &bytes).await?;
                DownloadInfo {
                    method: DownloadMethod::Firecrawl,
                    final_url: None,
                    content_type: None,
                    bytes: bytes.len(),
                    direct_error: Some(direct_error.to_string()),
                }
            }
        };
        Ok(info)
    }

    async fn direct(&self, url: &str) -> Result<(Vec<u8>, DownloadInfo)> {
        let body = fetch_binary(&self.http, url, PDF_ACCEPT).await?;
        if !looks_like_pdf(&body.bytes) {
            return Err(AppError::download(format!(
                "Non-PDF response (content-type={}, finalUrl={})",
                body.content_type, body.final_url
            )));
        }
        let info = DownloadInfo {
            method: DownloadMethod::Direct,
            final_url: Some(body.final_url),
            content_type: Some(body.content_type),
            bytes: body.bytes.len(),
            direct_error: None,
        };
        Ok((body.bytes, info))
    }

    async fn via_api(&self, url: &str) -> Result<Vec<u8>> {
        let request = ScrapeRequest::raw_pdf(url, self.job.timeout_ms);
        let data = self.api.scrape(&request).await?;

        let encoded: String = data
            .markdown
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if encoded.is_empty() {
            return Err(AppError::download("Firecrawl PDF fetch returned empty markdown"));
        }

        let bytes = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|_| AppError::download("Failed to base64-decode Firecrawl PDF"))?;
        if !looks_like_pdf(&bytes) {
            return Err(AppError::download(
                "Firecrawl PDF fetch did not produce valid PDF bytes",
            ));
        }
        Ok(bytes)
    }
}

#[derive(Debug, Default)]
struct PdfAttempt {
    url: Option<String>,
    download: Option<DownloadInfo>,
    error: Option<String>,
}

/// HTTP timeout for direct downloads: at least 20 s.
pub fn direct_timeout(job: &JobConfig) -> Duration {
    Duration::from_secs(job.timeout_secs().max(20))
}
