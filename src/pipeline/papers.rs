// src/pipeline/papers.rs

//! Research paper download pipeline.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::Result;
use crate::models::{
    Config, JobConfig, PAPER_CSV_HEADER, PaperRecord, RunMeta, RunSummary, item_key, now_iso,
};
use crate::pipeline::pool::{Checkpoint, WorkerPool};
use crate::pipeline::report::JobReport;
use crate::services::papers::direct_timeout;
use crate::services::{FirecrawlClient, PaperDownloader, ScrapeApi};
use crate::storage::csv_log::encode_table;
use crate::storage::{LEDGER_JSON, Ledger, LedgerStore, LocalStorage, run_key};
use crate::utils::console;
use crate::utils::http::create_async_client;

/// HTTP timeout for one landing-page scrape call.
pub fn scrape_timeout(job: &JobConfig) -> Duration {
    Duration::from_secs((job.timeout_secs() + 10).max(10))
}

/// Scrape API client tuned for the paper job.
pub fn paper_client(config: &Config) -> Result<FirecrawlClient> {
    FirecrawlClient::new(&config.api, &config.user_agent, scrape_timeout(&config.papers))
}

/// Client for direct PDF downloads.
pub fn download_client(config: &Config) -> Result<Client> {
    create_async_client(&config.user_agent, direct_timeout(&config.papers))
}

fn summarize(
    meta: &RunMeta,
    finished_at: String,
    skipped: usize,
    results: Vec<PaperRecord>,
) -> RunSummary<PaperRecord> {
    let downloaded = results.iter().filter(|r| r.pdf_downloaded()).count();
    let mut run = RunSummary::new(meta, finished_at, skipped, results);
    run.pdf_downloaded_count = Some(downloaded);
    run
}

struct PaperCheckpoint<'a> {
    store: &'a LedgerStore,
    prior: &'a Ledger,
    meta: &'a RunMeta,
    skipped: usize,
}

#[async_trait]
impl<'a> Checkpoint<PaperRecord> for PaperCheckpoint<'a> {
    async fn checkpoint(&self, _batch: &[PaperRecord], snapshot: &[PaperRecord]) -> Result<()> {
        let run = summarize(self.meta, now_iso(), self.skipped, snapshot.to_vec());
        self.store.save_run(self.prior, &run, &[]).await?;
        Ok(())
    }
}

/// Download papers for every landing URL not already recorded in `out_dir`.
pub async fn run_paper_download(
    config: &Config,
    api: Arc<dyn ScrapeApi>,
    http: Client,
    urls: Vec<String>,
    out_dir: &Path,
    force: bool,
) -> Result<JobReport> {
    let job = &config.papers;
    let storage = LocalStorage::new(out_dir);
    let store = LedgerStore::new(storage.clone(), None);
    let prior = store.load().await?;

    let input_count = urls.len();
    let work: Vec<String> = if force {
        urls
    } else {
        let done = prior.completed_items("url");
        urls.into_iter()
            .filter(|u| !done.contains(&item_key(u)))
            .collect()
    };
    let skipped = input_count - work.len();

    console::header("RESEARCH PAPER DOWNLOAD");
    console::sub_item(&format!("Total URLs: {input_count}"));
    console::sub_item(&format!("To process: {}", work.len()));
    console::sub_item(&format!("Skipped (already processed): {skipped}"));
    console::sub_item(&format!("API: {}", config.api.endpoint()));
    console::sub_item(&format!("Concurrency: {}", job.concurrency));

    if work.is_empty() {
        console::line("All URLs already processed!");
        return Ok(JobReport::nothing_to_do(input_count, skipped, "PDFs downloaded"));
    }

    let meta = RunMeta::start(
        &config.api.api_url,
        &config.api.scrape_path,
        job.concurrency,
        job.batch_size,
    );
    log::info!("Starting run {} ({} URLs)", meta.run_id, work.len());

    let downloader = PaperDownloader::new(api, http, job.clone(), storage.clone());
    let checkpoint = PaperCheckpoint {
        store: &store,
        prior: &prior,
        meta: &meta,
        skipped,
    };

    // The downloader already waits between PDF candidates.
    let output = WorkerPool::new(job.concurrency, job.batch_size, Duration::ZERO)
        .with_label("Downloading papers")
        .run(
            work,
            |i, url| {
                let downloader = &downloader;
                let run_id = meta.run_id.as_str();
                async move { downloader.process(run_id, &url, i + 1).await }
            },
            &checkpoint,
        )
        .await?;

    let run = summarize(&meta, now_iso(), skipped, output.results);

    let run_json = run_key(&meta.run_id, "results.json");
    let run_csv = run_key(&meta.run_id, "results.csv");
    storage.write_json(&run_json, &run).await?;
    let rows: Vec<Vec<String>> = run.results.iter().map(PaperRecord::csv_row).collect();
    storage
        .write_text(&run_csv, &encode_table(PAPER_CSV_HEADER, &rows)?)
        .await?;

    store.save_run(&prior, &run, &[]).await?;

    Ok(JobReport {
        run_id: Some(meta.run_id.clone()),
        input_count,
        skipped,
        processed: run.count,
        success: run.success_count,
        failures: run.failure_count,
        highlight: ("PDFs downloaded", run.pdf_downloaded_count.unwrap_or_default()),
        artifacts: vec![
            ("Run JSON", storage.path(&run_json)),
            ("Run CSV", storage.path(&run_csv)),
            ("Running JSON", storage.path(LEDGER_JSON)),
        ],
    })
}
