//! Run-level models: per-item outcomes and run summaries.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

/// Format a timestamp the way ledgers store it (`2026-01-08T19:15:26.666000+00:00`).
pub fn iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Current UTC time in ledger format.
pub fn now_iso() -> String {
    iso(Utc::now())
}

/// Filesystem-safe run identifier derived from the start time (`YYYYMMDD-HHMMSS`).
pub fn run_id(started_at: DateTime<Utc>) -> String {
    started_at.format("%Y%m%d-%H%M%S").to_string()
}

/// Outcome of processing one item.
///
/// Serialized with an `ok` discriminator: success flattens the payload
/// next to `"ok": true`, failure carries `"ok": false` and `error`.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Failure { error: String },
}

impl<T> Outcome<T> {
    pub fn failure(error: impl fmt::Display) -> Self {
        Self::Failure {
            error: error.to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure { error } => Some(error),
        }
    }
}

impl<T, E: fmt::Display> From<std::result::Result<T, E>> for Outcome<T> {
    fn from(result: std::result::Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(e) => Self::failure(e),
        }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum OutcomeRepr<'a, T> {
    Success {
        ok: bool,
        #[serde(flatten)]
        value: &'a T,
    },
    Failure {
        ok: bool,
        error: &'a str,
    },
}

impl<T: Serialize> Serialize for Outcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Success(value) => OutcomeRepr::Success { ok: true, value }.serialize(serializer),
            Self::Failure { error } => {
                let repr: OutcomeRepr<'_, T> = OutcomeRepr::Failure { ok: false, error };
                repr.serialize(serializer)
            }
        }
    }
}

/// A per-item record as seen by the worker pool and the ledger.
pub trait RunRecord: Clone + Serialize + Send + Sync + 'static {
    /// The input item this record describes.
    fn item(&self) -> &str;

    /// Whether the item was processed successfully.
    fn is_ok(&self) -> bool;

    /// Short classification for progress output.
    fn status(&self) -> String;

    /// Extra detail for progress output (price, notes, ...).
    fn detail(&self) -> Option<String> {
        None
    }
}

/// Configuration snapshot and identity of a run.
#[derive(Debug, Clone)]
pub struct RunMeta {
    pub run_id: String,
    pub started_at: String,
    pub api_url: String,
    pub scrape_path: String,
    pub concurrency: usize,
    pub batch_size: usize,
}

impl RunMeta {
    /// Start a run now.
    pub fn start(api_url: &str, scrape_path: &str, concurrency: usize, batch_size: usize) -> Self {
        let started = Utc::now();
        Self {
            run_id: run_id(started),
            started_at: iso(started),
            api_url: api_url.to_string(),
            scrape_path: scrape_path.to_string(),
            concurrency,
            batch_size,
        }
    }
}

/// Summary of one batch execution, as persisted in the ledger.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary<R> {
    pub run_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub api_url: String,
    pub scrape_path: String,
    pub concurrency: usize,
    pub batch_size: usize,
    pub count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub skipped_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_downloaded_count: Option<usize>,
    pub results: Vec<R>,
}

impl<R: RunRecord> RunSummary<R> {
    /// Build a summary for the given (input-ordered) results.
    pub fn new(meta: &RunMeta, finished_at: String, skipped_count: usize, results: Vec<R>) -> Self {
        let success_count = results.iter().filter(|r| r.is_ok()).count();
        Self {
            run_id: meta.run_id.clone(),
            started_at: meta.started_at.clone(),
            finished_at,
            api_url: meta.api_url.clone(),
            scrape_path: meta.scrape_path.clone(),
            concurrency: meta.concurrency,
            batch_size: meta.batch_size,
            count: results.len(),
            success_count,
            failure_count: results.len() - success_count,
            skipped_count,
            pdf_downloaded_count: None,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Payload {
        value: u32,
    }

    #[test]
    fn test_run_id_format() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 8, 19, 15, 26).unwrap();
        assert_eq!(run_id(ts), "20260108-191526");
        assert_eq!(iso(ts), "2026-01-08T19:15:26.000000+00:00");
    }

    #[test]
    fn test_outcome_serialization() {
        let ok: Outcome<Payload> = Outcome::Success(Payload { value: 7 });
        assert_eq!(serde_json::to_value(&ok).unwrap(), json!({"ok": true, "value": 7}));

        let failed: Outcome<Payload> = Outcome::failure("HTTP 500");
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({"ok": false, "error": "HTTP 500"})
        );
    }

    #[test]
    fn test_outcome_from_result() {
        let outcome: Outcome<u8> = Err::<u8, _>("boom").into();
        assert!(!outcome.is_ok());
        assert_eq!(outcome.error(), Some("boom"));
        assert!(outcome.success().is_none());
    }
}
