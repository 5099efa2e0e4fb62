//! Research paper download records.

use serde::Serialize;

use super::domain::csv_bool;
use super::run::{Outcome, RunRecord};

/// Header of the per-run paper CSV.
pub const CSV_HEADER: &[&str] = &[
    "index",
    "ok",
    "url",
    "title",
    "published",
    "pdfUrl",
    "pdfDownloaded",
    "pdfError",
    "dir",
];

/// How a PDF was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadMethod {
    /// Plain GET against the candidate URL
    Direct,
    /// Base64 payload fetched through the scrape API
    Firecrawl,
}

/// Details of a successful PDF download.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadInfo {
    pub method: DownloadMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub bytes: usize,
    /// Why the direct download was skipped in favour of the API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_error: Option<String>,
}

/// Where an item's artifacts were written.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperPaths {
    pub dir: String,
    pub page_markdown: String,
    pub pdf: Option<String>,
}

/// Successful processing of one landing page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperDetails {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub published: Option<String>,
    pub extract_notes: String,
    pub pdf_candidates: Vec<String>,
    pub pdf_url: Option<String>,
    pub pdf_downloaded: bool,
    pub pdf_download: Option<DownloadInfo>,
    pub pdf_error: Option<String>,
    pub paths: PaperPaths,
}

/// Result record for one landing-page URL.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperRecord {
    pub index: usize,
    pub url: String,
    pub run_id: String,
    pub timestamp: String,
    #[serde(flatten)]
    pub outcome: Outcome<PaperDetails>,
}

impl PaperRecord {
    pub fn pdf_downloaded(&self) -> bool {
        self.outcome.success().is_some_and(|d| d.pdf_downloaded)
    }

    /// Row under [`CSV_HEADER`].
    pub fn csv_row(&self) -> Vec<String> {
        let (title, published, pdf_url, downloaded, error, dir) = match &self.outcome {
            Outcome::Success(d) => (
                d.title.clone().unwrap_or_default(),
                d.published.clone().unwrap_or_default(),
                d.pdf_url.clone().unwrap_or_default(),
                d.pdf_downloaded,
                d.pdf_error.clone().unwrap_or_default(),
                d.paths.dir.clone(),
            ),
            Outcome::Failure { error } => (
                String::new(),
                String::new(),
                String::new(),
                false,
                error.clone(),
                String::new(),
            ),
        };

        vec![
            self.index.to_string(),
            csv_bool(self.outcome.is_ok()),
            self.url.clone(),
            title,
            published,
            pdf_url,
            csv_bool(downloaded),
            error,
            dir,
        ]
    }
}

impl RunRecord for PaperRecord {
    fn item(&self) -> &str {
        &self.url
    }

    fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    fn status(&self) -> String {
        match &self.outcome {
            Outcome::Success(d) if d.pdf_downloaded => "pdf".to_string(),
            Outcome::Success(_) => "no-pdf".to_string(),
            Outcome::Failure { .. } => "ERROR".to_string(),
        }
    }

    fn detail(&self) -> Option<String> {
        match &self.outcome {
            Outcome::Success(d) => d.title.clone(),
            Outcome::Failure { error } => Some(error.clone()),
        }
    }
}
