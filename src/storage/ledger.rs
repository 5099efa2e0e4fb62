//! Running JSON ledger of batch runs.
//!
//! The ledger is an array of run summaries. Prior runs are held as raw JSON
//! so a rewrite never drops fields this version does not model.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::{RunSummary, item_key};
use crate::storage::LocalStorage;
use crate::storage::csv_log::CsvLog;

/// Key of the running JSON ledger.
pub const LEDGER_JSON: &str = "results.json";

/// History of prior runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    runs: Vec<Value>,
}

impl Ledger {
    /// Parse ledger text defensively.
    ///
    /// Arrays keep their object entries. A single run object (older format)
    /// becomes a one-run history. Anything else is an empty history.
    pub fn parse(text: &str) -> Self {
        let runs = match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => items.into_iter().filter(Value::is_object).collect(),
            Ok(run @ Value::Object(_)) if run.get("results").is_some_and(Value::is_array) => {
                vec![run]
            }
            Ok(_) => {
                log::warn!("Ledger JSON has an unexpected shape; starting with empty history");
                Vec::new()
            }
            Err(e) => {
                log::warn!("Ledger JSON is malformed ({e}); starting with empty history");
                Vec::new()
            }
        };
        Self { runs }
    }

    pub fn runs(&self) -> &[Value] {
        &self.runs
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Every result object across all runs, oldest first.
    fn records(&self) -> impl Iterator<Item = &Value> {
        self.runs
            .iter()
            .filter_map(|run| run.get("results").and_then(Value::as_array))
            .flatten()
            .filter(|r| r.is_object())
    }

    /// Normalized identities recorded successfully in any run.
    ///
    /// Failed attempts are not included, so they are retried later.
    pub fn completed_items(&self, item_field: &str) -> HashSet<String> {
        self.records()
            .filter(|r| is_ok(r))
            .filter_map(|r| r.get(item_field).and_then(Value::as_str))
            .map(item_key)
            .filter(|key| !key.is_empty())
            .collect()
    }

    /// Latest record per normalized identity (later runs win).
    pub fn latest_by_item(&self, item_field: &str) -> BTreeMap<String, &Value> {
        let mut latest = BTreeMap::new();
        for record in self.records() {
            if let Some(item) = record.get(item_field).and_then(Value::as_str) {
                let key = item_key(item);
                if !key.is_empty() {
                    latest.insert(key, record);
                }
            }
        }
        latest
    }

    /// Sorted domains whose latest record is a successful `available` check.
    pub fn available_domains(&self) -> Vec<String> {
        self.latest_by_item("domain")
            .into_iter()
            .filter(|(_, r)| is_ok(r) && r.get("availability").and_then(Value::as_str) == Some("available"))
            .map(|(key, _)| key)
            .collect()
    }

    /// This history followed by one more run.
    pub fn with_run<R: Serialize>(&self, run: &RunSummary<R>) -> Result<Vec<Value>> {
        let mut runs = self.runs.clone();
        runs.push(serde_json::to_value(run)?);
        Ok(runs)
    }
}

fn is_ok(record: &Value) -> bool {
    match record.get("ok") {
        Some(Value::Bool(ok)) => *ok,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Single writer for a job's running ledger files.
#[derive(Debug)]
pub struct LedgerStore {
    storage: LocalStorage,
    csv: Option<CsvLog>,
    write_lock: Mutex<()>,
}

impl LedgerStore {
    pub fn new(storage: LocalStorage, csv: Option<CsvLog>) -> Self {
        Self {
            storage,
            csv,
            write_lock: Mutex::new(()),
        }
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    /// Load the history; missing or malformed files yield an empty ledger.
    pub async fn load(&self) -> Result<Ledger> {
        Ok(match self.storage.read_text(LEDGER_JSON).await? {
            Some(text) => Ledger::parse(&text),
            None => Ledger::default(),
        })
    }

    /// Persist `prior` plus the current run, and append CSV rows.
    ///
    /// Returns the full history that was written. The current run replaces
    /// itself on every call, so checkpoints and the final save converge.
    /// The CSV is validated before anything is written: a refused append
    /// leaves both files untouched.
    pub async fn save_run<R: Serialize>(
        &self,
        prior: &Ledger,
        run: &RunSummary<R>,
        csv_rows: &[Vec<String>],
    ) -> Result<Ledger> {
        let _guard = self.write_lock.lock().await;

        let pending = match &self.csv {
            Some(csv) => Some(csv.prepare(csv_rows).await?),
            None => None,
        };

        let runs = prior.with_run(run)?;
        self.storage.write_json(LEDGER_JSON, &runs).await?;

        if let (Some(csv), Some(pending)) = (&self.csv, pending) {
            csv.commit(pending).await?;
        }

        Ok(Ledger { runs })
    }

    /// Write a derived text artifact under the same lock.
    pub async fn write_derived(&self, key: &str, text: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.storage.write_text(key, text).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn history() -> Ledger {
        Ledger::parse(
            &json!([
                {"runId": "1", "results": [
                    {"domain": "Alpha.com ", "ok": true, "availability": "available"},
                    {"domain": "beta.io", "ok": false, "error": "HTTP 500"},
                    {"domain": "gamma.dev", "ok": true, "availability": "taken"}
                ]},
                {"runId": "2", "results": [
                    {"domain": "gamma.dev", "ok": true, "availability": "available"},
                    {"domain": "alpha.com", "ok": true, "availability": "taken"}
                ]}
            ])
            .to_string(),
        )
    }

    #[test]
    fn test_parse_malformed_is_empty() {
        assert!(Ledger::parse("{not json").is_empty());
        assert!(Ledger::parse("42").is_empty());
        assert!(Ledger::parse("").is_empty());
    }

    #[test]
    fn test_parse_single_run_object() {
        let ledger = Ledger::parse(r#"{"runId": "x", "results": [{"domain": "a.com", "ok": true}]}"#);
        assert_eq!(ledger.runs().len(), 1);
    }

    #[test]
    fn test_parse_keeps_only_objects() {
        let ledger = Ledger::parse(r#"[1, "two", {"runId": "x", "results": []}]"#);
        assert_eq!(ledger.runs().len(), 1);
    }

    #[test]
    fn test_completed_items_only_successes() {
        let done = history().completed_items("domain");
        assert!(done.contains("alpha.com"));
        assert!(done.contains("gamma.dev"));
        assert!(!done.contains("beta.io"));
    }

    #[test]
    fn test_available_domains_latest_wins() {
        assert_eq!(history().available_domains(), vec!["gamma.dev".to_string()]);
    }

    #[test]
    fn test_legacy_string_ok_flag() {
        let ledger = Ledger::parse(r#"[{"results": [{"domain": "a.com", "ok": "True"}]}]"#);
        assert!(ledger.completed_items("domain").contains("a.com"));
    }
}
