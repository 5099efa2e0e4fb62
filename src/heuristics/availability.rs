//! Domain availability: structured extraction plus markdown fallback.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::extract::Extracted;
use crate::models::Availability;

/// Lines before the anchor included in the marker window.
const WINDOW_BEFORE: usize = 10;
/// Lines from the anchor (exclusive end) included in the marker window.
const WINDOW_AFTER: usize = 40;
/// Lines from the anchor scanned for a price.
const PRICE_SCAN: usize = 12;

/// Marker phrases, checked in order; the first present one decides.
const MARKERS: &[(&str, Availability)] = &[
    ("make offer", Availability::Taken),
    ("whois", Availability::Taken),
    ("continue", Availability::Available),
];

static PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$[\d,]+(?:\.\d{2})?").expect("price pattern is valid"));

static LINK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[[^\]]+\]\([^)]*\)").expect("link pattern is valid"));

pub const NOTE_DROPPED_PRICE: &str = "Dropped unverified price";
pub const NOTE_REPLACED_PRICE: &str = "Replaced price with domain-local price";

/// What the scrape API's structured extraction said about a domain.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructuredAvailability {
    pub availability: Availability,
    pub price: Option<String>,
    pub notes: String,
}

impl StructuredAvailability {
    /// Read the closed-set fields out of a normalized extraction.
    ///
    /// The classification may come under `availability` or `status`.
    pub fn from_extract(extracted: Option<&Extracted>) -> Self {
        let Some(extracted) = extracted else {
            return Self::default();
        };

        let availability = extracted
            .str_field("availability")
            .or_else(|| extracted.str_field("status"))
            .map(Availability::parse)
            .unwrap_or_default();

        let price = extracted.field("price").map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });

        Self {
            availability,
            price,
            notes: extracted.notes(),
        }
    }
}

/// What the markdown around the domain suggests.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkdownSignal {
    pub availability: Availability,
    pub price: Option<String>,
    pub notes: String,
}

impl MarkdownSignal {
    fn unknown(notes: &str) -> Self {
        Self {
            availability: Availability::Unknown,
            price: None,
            notes: notes.to_string(),
        }
    }
}

/// Infer availability and price from a search results page's markdown.
pub fn infer_from_markdown(markdown: &str, domain: &str) -> MarkdownSignal {
    if markdown.is_empty() {
        return MarkdownSignal::unknown("No markdown");
    }

    let lines: Vec<&str> = markdown.lines().collect();
    let needle = format!("[{domain}](");
    let Some(anchor) = lines
        .iter()
        .position(|line| line.contains(&needle) || line.contains(domain))
    else {
        return MarkdownSignal::unknown("Domain not found in markdown");
    };

    let start = anchor.saturating_sub(WINDOW_BEFORE);
    let end = (anchor + WINDOW_AFTER).min(lines.len());
    let window = lines[start..end].join("\n").to_lowercase();

    let availability = MARKERS
        .iter()
        .find(|(phrase, _)| window.contains(phrase))
        .map(|(_, class)| *class)
        .unwrap_or_default();

    let price = find_price(&lines, anchor, domain);

    let mut notes = Vec::new();
    match availability {
        Availability::Available => notes.push("Found 'Continue' near domain"),
        Availability::Taken => notes.push("Found 'Make offer/WHOIS' near domain"),
        Availability::Unknown => {}
    }
    notes.push(if price.is_some() {
        "Found price near domain"
    } else {
        "No domain-specific price found"
    });

    MarkdownSignal {
        availability,
        price,
        notes: notes.join("; "),
    }
}

/// First price token after the anchor, stopping at the next domain's link.
fn find_price(lines: &[&str], anchor: usize, domain: &str) -> Option<String> {
    let end = (anchor + PRICE_SCAN).min(lines.len());
    for (i, raw) in lines.iter().enumerate().take(end).skip(anchor) {
        let line = raw.trim();
        if i != anchor && LINK_LINE.is_match(line) && line.contains('.') && !line.contains(domain) {
            break;
        }
        if let Some(m) = PRICE.find(line) {
            return Some(m.as_str().to_string());
        }
    }
    None
}

/// Reconciled classification for one domain.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub availability: Availability,
    pub price: Option<String>,
    pub notes: String,
}

/// Merge structured and markdown signals.
///
/// The markdown price is trusted over the structured one: a structured
/// price the page does not show next to the domain is dropped, and a
/// different page price replaces it. Both cases are noted.
pub fn reconcile(structured: StructuredAvailability, markdown: Option<&MarkdownSignal>) -> Reconciled {
    let StructuredAvailability {
        mut availability,
        mut price,
        mut notes,
    } = structured;

    if let Some(fallback) = markdown {
        if availability == Availability::Unknown {
            availability = fallback.availability;
        }

        match (&price, &fallback.price) {
            (None, page_price) => price = page_price.clone(),
            (Some(_), None) => {
                price = None;
                append_note(&mut notes, NOTE_DROPPED_PRICE);
            }
            (Some(ours), Some(page)) if ours != page => {
                price = Some(page.clone());
                append_note(&mut notes, NOTE_REPLACED_PRICE);
            }
            (Some(_), Some(_)) => {}
        }

        if notes.is_empty() {
            notes = fallback.notes.clone();
        }
    }

    Reconciled {
        availability,
        price,
        notes,
    }
}

fn append_note(notes: &mut String, note: &str) {
    if !notes.is_empty() {
        notes.push_str("; ");
    }
    notes.push_str(note);
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::heuristics::extract::normalize_extract;

    fn page(marker: &str) -> String {
        format!(
            "# Results\n\n[example.com](https://instantdomainsearch.com/?q=example.com)\n\n{marker}\n\n[other.net](https://x)\n$99.00\n"
        )
    }

    #[test]
    fn test_continue_means_available() {
        let signal = infer_from_markdown(&page("Continue"), "example.com");
        assert_eq!(signal.availability, Availability::Available);
    }

    #[test]
    fn test_make_offer_means_taken() {
        let signal = infer_from_markdown(&page("Make offer"), "example.com");
        assert_eq!(signal.availability, Availability::Taken);
    }

    #[test]
    fn test_no_marker_is_unknown() {
        let signal = infer_from_markdown(&page("Nothing to see"), "example.com");
        assert_eq!(signal.availability, Availability::Unknown);
        assert_eq!(signal.notes, "No domain-specific price found");
    }

    #[test]
    fn test_taken_markers_win_over_continue() {
        let signal = infer_from_markdown(&page("Continue\nWHOIS"), "example.com");
        assert_eq!(signal.availability, Availability::Taken);
    }

    #[test]
    fn test_marker_outside_window_is_ignored() {
        let filler = "filler\n".repeat(WINDOW_AFTER + 5);
        let md = format!("[example.com](u)\n{filler}Continue\n");
        let signal = infer_from_markdown(&md, "example.com");
        assert_eq!(signal.availability, Availability::Unknown);
    }

    #[test]
    fn test_missing_domain_and_markdown() {
        assert_eq!(
            infer_from_markdown("", "example.com").notes,
            "No markdown"
        );
        assert_eq!(
            infer_from_markdown("# empty page", "example.com").notes,
            "Domain not found in markdown"
        );
    }

    #[test]
    fn test_price_found_near_domain() {
        let md = "[example.com](u)\nContinue\n$1,299.99 /yr\n";
        let signal = infer_from_markdown(md, "example.com");
        assert_eq!(signal.price.as_deref(), Some("$1,299.99"));
        assert_eq!(signal.notes, "Found 'Continue' near domain; Found price near domain");
    }

    #[test]
    fn test_price_scan_stops_at_next_domain() {
        let signal = infer_from_markdown(&page("Continue"), "example.com");
        assert_eq!(signal.price, None);
    }

    #[test]
    fn test_structured_reads_status_alias_and_numeric_price() {
        let payload = json!({"status": "Available", "price": 12.5, "notes": null});
        let extracted = normalize_extract(Some(&payload));
        let structured = StructuredAvailability::from_extract(extracted.as_ref());
        assert_eq!(structured.availability, Availability::Available);
        assert_eq!(structured.price.as_deref(), Some("12.5"));
        assert_eq!(structured.notes, "");
    }

    #[test]
    fn test_reconcile_adopts_markdown_when_unknown() {
        let signal = MarkdownSignal {
            availability: Availability::Available,
            price: Some("$9.99".into()),
            notes: "Found 'Continue' near domain; Found price near domain".into(),
        };
        let out = reconcile(StructuredAvailability::default(), Some(&signal));
        assert_eq!(out.availability, Availability::Available);
        assert_eq!(out.price.as_deref(), Some("$9.99"));
        assert_eq!(out.notes, signal.notes);
    }

    #[test]
    fn test_reconcile_drops_unverified_price() {
        let structured = StructuredAvailability {
            availability: Availability::Available,
            price: Some("$12.00".into()),
            notes: "looks free".into(),
        };
        let signal = MarkdownSignal {
            availability: Availability::Available,
            price: None,
            notes: "x".into(),
        };
        let out = reconcile(structured, Some(&signal));
        assert_eq!(out.price, None);
        assert_eq!(out.notes, "looks free; Dropped unverified price");
    }

    #[test]
    fn test_reconcile_replaces_conflicting_price() {
        let structured = StructuredAvailability {
            availability: Availability::Taken,
            price: Some("$12.00".into()),
            notes: String::new(),
        };
        let signal = MarkdownSignal {
            availability: Availability::Available,
            price: Some("$8.00".into()),
            notes: "x".into(),
        };
        let out = reconcile(structured, Some(&signal));
        assert_eq!(out.availability, Availability::Taken);
        assert_eq!(out.price.as_deref(), Some("$8.00"));
        assert_eq!(out.notes, NOTE_REPLACED_PRICE);
    }

    #[test]
    fn test_reconcile_without_markdown_keeps_structured() {
        let structured = StructuredAvailability {
            availability: Availability::Taken,
            price: Some("$12.00".into()),
            notes: "n".into(),
        };
        let out = reconcile(structured.clone(), None);
        assert_eq!(out.price, structured.price);
        assert_eq!(out.notes, "n");
    }
}
