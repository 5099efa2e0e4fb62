// src/pipeline/domains.rs

//! Domain availability pipeline.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    Availability, CSV_HEADER_V1, CSV_HEADER_V2, Config, DomainRecord, JobConfig, RunMeta,
    RunSummary, item_key, now_iso,
};
use crate::pipeline::pool::{Checkpoint, WorkerPool};
use crate::pipeline::report::JobReport;
use crate::services::{DomainChecker, FirecrawlClient, ScrapeApi};
use crate::storage::csv_log::encode_table;
use crate::storage::{CsvLog, CsvSchema, LEDGER_JSON, Ledger, LedgerStore, LocalStorage, run_key};
use crate::utils::console;

/// Running CSV ledger of domain checks.
pub const RESULTS_CSV: &str = "results.csv";
/// Derived list of available domains.
pub const AVAILABLE_TXT: &str = "available-domains.txt";

const SCHEMA: CsvSchema = CsvSchema {
    current: CSV_HEADER_V2,
    legacy: Some(CSV_HEADER_V1),
};

/// HTTP timeout for one domain scrape call.
pub fn scrape_timeout(job: &JobConfig) -> Duration {
    Duration::from_secs((job.timeout_secs() + 5).max(5))
}

/// Scrape API client tuned for the domain job.
pub fn domain_client(config: &Config) -> Result<FirecrawlClient> {
    FirecrawlClient::new(&config.api, &config.user_agent, scrape_timeout(&config.domains))
}

/// Ledger store for a domain output directory.
pub fn domain_ledger(out_dir: &Path) -> LedgerStore {
    let storage = LocalStorage::new(out_dir);
    let csv = CsvLog::new(storage.clone(), RESULTS_CSV, SCHEMA);
    LedgerStore::new(storage, Some(csv))
}

fn available_text(ledger: &Ledger) -> String {
    let available = ledger.available_domains();
    if available.is_empty() {
        String::new()
    } else {
        format!("{}\n", available.join("\n"))
    }
}

struct DomainCheckpoint<'a> {
    store: &'a LedgerStore,
    prior: &'a Ledger,
    meta: &'a RunMeta,
    skipped: usize,
}

#[async_trait]
impl<'a> Checkpoint<DomainRecord> for DomainCheckpoint<'a> {
    async fn checkpoint(&self, batch: &[DomainRecord], snapshot: &[DomainRecord]) -> Result<()> {
        let finished_at = now_iso();
        let rows: Vec<Vec<String>> = batch
            .iter()
            .map(|r| r.csv_row_v2(&self.meta.run_id, &self.meta.started_at, &finished_at))
            .collect();
        let run = RunSummary::new(self.meta, finished_at.clone(), self.skipped, snapshot.to_vec());

        let ledger = self.store.save_run(self.prior, &run, &rows).await?;
        self.store
            .write_derived(AVAILABLE_TXT, &available_text(&ledger))
            .await
    }
}

/// Check every domain in `domains` not already recorded in `out_dir`.
///
/// With `force`, previously checked domains are checked again. Returns a
/// report; the caller decides whether an all-failed run is an error.
pub async fn run_domain_check(
    config: &Config,
    api: Arc<dyn ScrapeApi>,
    domains: Vec<String>,
    out_dir: &Path,
    force: bool,
) -> Result<JobReport> {
    let job = &config.domains;
    let store = domain_ledger(out_dir);
    let prior = store.load().await?;

    let input_count = domains.len();
    let work: Vec<String> = if force {
        domains
    } else {
        let done = prior.completed_items("domain");
        domains
            .into_iter()
            .filter(|d| !done.contains(&item_key(d)))
            .collect()
    };
    let skipped = input_count - work.len();

    console::header("DOMAIN AVAILABILITY CHECK");
    console::sub_item(&format!("Total domains: {input_count}"));
    console::sub_item(&format!("To check: {}", work.len()));
    console::sub_item(&format!("Skipped (already checked): {skipped}"));
    console::sub_item(&format!("API: {}", config.api.endpoint()));
    console::sub_item(&format!("Concurrency: {}", job.concurrency));
    console::sub_item(&format!("Delay: {}ms per request", job.delay_ms));
    console::sub_item(&format!("Checkpoint: every {} domains", job.batch_size));

    if work.is_empty() {
        console::line("All domains already checked!");
        return Ok(JobReport::nothing_to_do(input_count, skipped, "Available domains"));
    }

    let meta = RunMeta::start(
        &config.api.api_url,
        &config.api.scrape_path,
        job.concurrency,
        job.batch_size,
    );
    log::info!("Starting run {} ({} domains)", meta.run_id, work.len());

    let checker = DomainChecker::new(api, job.clone());
    let checkpoint = DomainCheckpoint {
        store: &store,
        prior: &prior,
        meta: &meta,
        skipped,
    };

    let output = WorkerPool::new(job.concurrency, job.batch_size, job.delay())
        .with_label("Checking domains")
        .run(
            work,
            |i, domain| {
                let checker = &checker;
                async move { checker.check(&domain, i + 1).await }
            },
            &checkpoint,
        )
        .await?;

    let finished_at = now_iso();
    let rows: Vec<Vec<String>> = output
        .unsaved
        .iter()
        .map(|r| r.csv_row_v2(&meta.run_id, &meta.started_at, &finished_at))
        .collect();
    let run = RunSummary::new(&meta, finished_at, skipped, output.results);

    let storage = store.storage();
    let run_json = run_key(&meta.run_id, "results.json");
    let run_csv = run_key(&meta.run_id, RESULTS_CSV);
    storage.write_json(&run_json, &run).await?;
    let run_rows: Vec<Vec<String>> = run.results.iter().map(DomainRecord::csv_row_v1).collect();
    storage
        .write_text(&run_csv, &encode_table(CSV_HEADER_V1, &run_rows)?)
        .await?;

    let ledger = store.save_run(&prior, &run, &rows).await?;
    store
        .write_derived(AVAILABLE_TXT, &available_text(&ledger))
        .await?;

    let available = run
        .results
        .iter()
        .filter(|r| r.availability() == Some(Availability::Available))
        .count();

    Ok(JobReport {
        run_id: Some(meta.run_id.clone()),
        input_count,
        skipped,
        processed: run.count,
        success: run.success_count,
        failures: run.failure_count,
        highlight: ("Available domains", available),
        artifacts: vec![
            ("Run JSON", storage.path(&run_json)),
            ("Run CSV", storage.path(&run_csv)),
            ("Running JSON", storage.path(LEDGER_JSON)),
            ("Running CSV", storage.path(RESULTS_CSV)),
            ("Available", storage.path(AVAILABLE_TXT)),
        ],
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::error::AppError;
    use crate::services::ScrapeData;
    use crate::services::firecrawl::ScrapeRequest;

    /// Search pages keyed on the queried domain: `free` is available,
    /// `broken` fails, everything else is taken.
    struct Search {
        calls: AtomicUsize,
    }

    impl Search {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ScrapeApi for Search {
        async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeData> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if request.url.contains("broken") {
                return Err(AppError::scrape("HTTP 500"));
            }
            let availability = if request.url.contains("free") {
                "available"
            } else {
                "taken"
            };
            Ok(ScrapeData {
                markdown: None,
                html: None,
                extract: Some(json!({"availability": availability, "price": null, "notes": ""})),
            })
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.domains.retries = 0;
        config.domains.delay_ms = 0;
        config.domains.batch_size = 2;
        config
    }

    fn domains(items: &[&str]) -> Vec<String> {
        items.iter().map(|d| d.to_string()).collect()
    }

    fn read(dir: &TempDir, key: &str) -> String {
        std::fs::read_to_string(dir.path().join(key)).unwrap()
    }

    #[test]
    fn test_scrape_timeout_floor() {
        let job = JobConfig {
            timeout_ms: 1_000,
            ..JobConfig::domains()
        };
        assert_eq!(scrape_timeout(&job), Duration::from_secs(6));
        assert_eq!(scrape_timeout(&JobConfig::domains()), Duration::from_secs(65));
    }

    #[test]
    fn test_available_text_trailing_newline() {
        let ledger = Ledger::parse(
            r#"[{"results": [
                {"domain": "b.com", "ok": true, "availability": "available"},
                {"domain": "a.com", "ok": true, "availability": "available"}
            ]}]"#,
        );
        assert_eq!(available_text(&ledger), "a.com\nb.com\n");
        assert_eq!(available_text(&Ledger::default()), "");
    }

    #[tokio::test]
    async fn test_run_then_resume_does_no_work() {
        console::set_quiet(true);
        let tmp = TempDir::new().unwrap();
        let api = Search::new();
        let input = domains(&["free.com", "taken.com", "broken.com"]);

        let report = run_domain_check(&config(), api.clone(), input, tmp.path(), false)
            .await
            .unwrap();
        assert_eq!(report.processed, 3);
        assert_eq!(report.success, 2);
        assert_eq!(report.failures, 1);
        assert_eq!(report.highlight, ("Available domains", 1));
        assert_eq!(api.calls(), 3);

        let csv = read(&tmp, RESULTS_CSV);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER_V2.join(",").as_str()));
        assert_eq!(lines.count(), 3);
        assert_eq!(read(&tmp, AVAILABLE_TXT), "free.com\n");

        let run_id = report.run_id.unwrap();
        let run_csv = read(&tmp, &run_key(&run_id, RESULTS_CSV));
        assert!(run_csv.starts_with(&CSV_HEADER_V1.join(",")));

        let json_before = read(&tmp, LEDGER_JSON);
        let csv_before = read(&tmp, RESULTS_CSV);

        // Everything that succeeded is skipped; nothing is written.
        let input = domains(&["free.com", "Taken.com "]);
        let report = run_domain_check(&config(), api.clone(), input, tmp.path(), false)
            .await
            .unwrap();
        assert_eq!(report.skipped, 2);
        assert_eq!(report.processed, 0);
        assert!(report.run_id.is_none());
        assert_eq!(api.calls(), 3);
        assert_eq!(read(&tmp, LEDGER_JSON), json_before);
        assert_eq!(read(&tmp, RESULTS_CSV), csv_before);
    }

    #[tokio::test]
    async fn test_failed_domains_are_retried_next_run() {
        console::set_quiet(true);
        let tmp = TempDir::new().unwrap();
        let api = Search::new();
        let input = domains(&["free.com", "broken.com"]);

        run_domain_check(&config(), api.clone(), input.clone(), tmp.path(), false)
            .await
            .unwrap();
        let report = run_domain_check(&config(), api.clone(), input, tmp.path(), false)
            .await
            .unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.processed, 1);
        assert_eq!(api.calls(), 3);

        let ledger = Ledger::parse(&read(&tmp, LEDGER_JSON));
        assert_eq!(ledger.runs().len(), 2);
    }

    #[tokio::test]
    async fn test_force_rechecks_everything() {
        console::set_quiet(true);
        let tmp = TempDir::new().unwrap();
        let api = Search::new();
        let input = domains(&["free.com", "taken.com"]);

        run_domain_check(&config(), api.clone(), input.clone(), tmp.path(), false)
            .await
            .unwrap();
        let report = run_domain_check(&config(), api.clone(), input, tmp.path(), true)
            .await
            .unwrap();
        assert_eq!(report.skipped, 0);
        assert_eq!(report.processed, 2);
        assert_eq!(api.calls(), 4);
        assert_eq!(read(&tmp, RESULTS_CSV).lines().count(), 5);
    }

    #[tokio::test]
    async fn test_legacy_csv_is_upgraded_before_append() {
        console::set_quiet(true);
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(RESULTS_CSV),
            format!(
                "{}\nold.com,available,,,true,,https://x,2024-01-01T00:00:00Z\n",
                CSV_HEADER_V1.join(",")
            ),
        )
        .unwrap();

        run_domain_check(&config(), Search::new(), domains(&["free.com"]), tmp.path(), false)
            .await
            .unwrap();

        let csv = read(&tmp, RESULTS_CSV);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], CSV_HEADER_V2.join(","));
        assert_eq!(lines[1], ",,,old.com,available,,,true,,https://x,2024-01-01T00:00:00Z");
        assert!(lines[2].contains(",free.com,available,"));
        assert_eq!(lines.len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_csv_header_aborts_run() {
        console::set_quiet(true);
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(RESULTS_CSV), "foo,bar\n1,2\n").unwrap();

        let err = run_domain_check(&config(), Search::new(), domains(&["free.com"]), tmp.path(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::LedgerIntegrity { .. }));
        assert_eq!(read(&tmp, RESULTS_CSV), "foo,bar\n1,2\n");
        assert!(!tmp.path().join(LEDGER_JSON).exists());

        // Once the CSV is moved aside the domain is checked and recorded in both.
        std::fs::remove_file(tmp.path().join(RESULTS_CSV)).unwrap();
        let report = run_domain_check(&config(), Search::new(), domains(&["free.com"]), tmp.path(), false)
            .await
            .unwrap();
        assert_eq!(report.processed, 1);
        assert!(read(&tmp, RESULTS_CSV).contains(",free.com,available,"));
        assert!(read(&tmp, LEDGER_JSON).contains("free.com"));
    }
}
