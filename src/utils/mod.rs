//! Utility functions and helpers.

pub mod console;
pub mod http;

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Longest slug produced by [`slugify`].
pub const SLUG_MAX_LEN: usize = 60;

static SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://").expect("scheme pattern is valid"));
static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern is valid"));

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Resolve a URL string against a base URL string.
pub fn resolve(base_url: &str, href: &str) -> Option<String> {
    Url::parse(base_url)
        .ok()
        .map(|base| resolve_url(&base, href))
}

/// Filesystem-safe name for an item: lower case, scheme stripped, runs of
/// other characters collapsed to `-`, at most [`SLUG_MAX_LEN`] chars.
pub fn slugify(value: &str) -> String {
    let lower = value.trim().to_lowercase();
    let without_scheme = SCHEME.replace_all(&lower, "");
    let dashed = NON_ALNUM.replace_all(&without_scheme, "-");
    let slug: String = dashed.trim_matches('-').chars().take(SLUG_MAX_LEN).collect();
    if slug.is_empty() { "item".to_string() } else { slug }
}
