//! PDF link discovery and ranking for paper landing pages.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::utils::resolve;

/// Smallest payload accepted as a PDF.
const MIN_PDF_BYTES: usize = 200;
/// Bytes after leading whitespace in which the signature must appear.
const SIGNATURE_WINDOW: usize = 1024;
const PDF_SIGNATURE: &[u8] = b"%PDF-";

static ABSOLUTE_PDF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)https?://[^\s)\]"']+\.pdf(?:\?[^\s)\]"']*)?"#).expect("pattern is valid")
});

static HREF_PDF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)href="([^"]+\.pdf[^"]*)""#).expect("pattern is valid"));

static SSRN_DELIVERY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)https?://[^\s)\]"']*Delivery\.cfm\?[^\s)\]"']+"#).expect("pattern is valid")
});

static WILEY_PDF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)https?://[^\s)\]"']+/doi/(?:e?pdf|pdfdirect)/[^\s)\]"']+"#)
        .expect("pattern is valid")
});

static CITATION_PDF: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[name="citation_pdf_url"]"#).expect("selector is valid")
});

/// Decode HTML entities (`&amp;` and friends).
pub fn unescape(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// Resolve `maybe_relative` against `base`, falling back to the raw value.
pub fn absolute_url(base: &str, maybe_relative: &str) -> String {
    resolve(base, maybe_relative).unwrap_or_else(|| maybe_relative.to_string())
}

/// PDF-like URLs mentioned anywhere in markdown or HTML text.
pub fn find_pdf_urls_in_text(text: &str, base_url: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut found = Vec::new();
    found.extend(ABSOLUTE_PDF.find_iter(text).map(|m| unescape(m.as_str())));
    found.extend(
        HREF_PDF
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .map(|m| absolute_url(base_url, &unescape(m.as_str()))),
    );
    found.extend(SSRN_DELIVERY.find_iter(text).map(|m| unescape(m.as_str())));
    found.extend(WILEY_PDF.find_iter(text).map(|m| unescape(m.as_str())));

    dedupe(found)
}

/// `citation_pdf_url` meta tags, resolved against the landing page.
pub fn find_pdf_meta(html: &str, base_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let found = document
        .select(&CITATION_PDF)
        .filter_map(|el| el.value().attr("content"))
        .map(|content| absolute_url(base_url, &unescape(content.trim())))
        .collect();
    dedupe(found)
}

/// Likely PDF locations derived from the landing URL alone.
pub fn site_fallbacks(landing_url: &str) -> Vec<String> {
    let Ok(url) = Url::parse(landing_url) else {
        return Vec::new();
    };
    let host = url.host_str().unwrap_or_default().to_lowercase();
    let mut out = Vec::new();

    if host.ends_with("onlinelibrary.wiley.com") {
        if let Some(doi) = url.path().strip_prefix("/doi/") {
            let doi = doi.trim_start_matches('/');
            if !doi.is_empty() {
                let origin = url.origin().ascii_serialization();
                out.push(format!("{origin}/doi/epdf/{doi}"));
                out.push(format!("{origin}/doi/pdf/{doi}"));
            }
        }
    }
    out
}

/// Trim, drop empties and keep the first occurrence of each URL.
pub fn dedupe(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty() && seen.insert(u.clone()))
        .collect()
}

fn score(url: &str) -> u32 {
    let lower = url.to_lowercase();
    let mut score = 0;
    if lower.contains(".pdf") {
        score += 50;
    }
    if lower.contains("epdf") || lower.contains("/pdf") {
        score += 30;
    }
    if lower.contains("download") || lower.contains("delivery.cfm") {
        score += 20;
    }
    score
}

/// Highest-scoring candidate; ties go to the shorter, then the earlier URL.
pub fn choose_best(candidates: &[String]) -> Option<&String> {
    candidates
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| {
            score(a)
                .cmp(&score(b))
                .then(b.len().cmp(&a.len()))
                .then(ib.cmp(ia))
        })
        .map(|(_, url)| url)
}

/// Download order: the best candidate, then the rest as discovered.
pub fn order_candidates(candidates: &[String]) -> Vec<String> {
    let Some(best) = choose_best(candidates) else {
        return Vec::new();
    };
    let mut ordered = vec![best.clone()];
    ordered.extend(candidates.iter().filter(|u| *u != best).cloned());
    ordered
}

/// Whether bytes carry a PDF signature near the start.
pub fn looks_like_pdf(data: &[u8]) -> bool {
    if data.len() < MIN_PDF_BYTES {
        return false;
    }
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    let head = &data[start..data.len().min(start + SIGNATURE_WINDOW)];
    head.windows(PDF_SIGNATURE.len()).any(|w| w == PDF_SIGNATURE)
}
