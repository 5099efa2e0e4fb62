//! Bounded-concurrency worker pool with periodic checkpoints.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::Result;
use crate::models::RunRecord;
use crate::utils::console;

/// Receives completed results while a run is still in progress.
#[async_trait]
pub trait Checkpoint<R>: Send + Sync {
    /// `batch` holds the records completed since the previous checkpoint in
    /// completion order; `snapshot` holds every completed record in input order.
    async fn checkpoint(&self, batch: &[R], snapshot: &[R]) -> Result<()>;
}

/// A checkpoint sink that discards everything.
pub struct NoCheckpoint;

#[async_trait]
impl<R: Send + Sync + 'static> Checkpoint<R> for NoCheckpoint {
    async fn checkpoint(&self, _batch: &[R], _snapshot: &[R]) -> Result<()> {
        Ok(())
    }
}

/// What a finished pool run hands back.
#[derive(Debug)]
pub struct PoolOutput<R> {
    /// One record per input item, in input order
    pub results: Vec<R>,
    /// Records completed after the last checkpoint
    pub unsaved: Vec<R>,
}

/// Pool settings.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    concurrency: usize,
    batch_size: usize,
    delay: Duration,
    label: String,
    show_progress: bool,
}

impl WorkerPool {
    pub fn new(concurrency: usize, batch_size: usize, delay: Duration) -> Self {
        Self {
            concurrency: concurrency.max(1),
            batch_size: batch_size.max(1),
            delay,
            label: "Processing".to_string(),
            show_progress: !console::is_quiet(),
        }
    }

    /// Progress bar prefix.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{prefix} [{elapsed_precise}] {bar:40} {pos}/{len} (eta {eta}) {msg}")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb.set_prefix(self.label.clone());
        pb
    }

    /// Run `task(index, item)` for every item, at most `concurrency` at a time.
    ///
    /// `index` is the item's 0-based input position. Tasks must turn their
    /// own failures into records; only checkpoint errors abort the run.
    pub async fn run<I, R, F, Fut, C>(
        &self,
        items: Vec<I>,
        task: F,
        checkpoint: &C,
    ) -> Result<PoolOutput<R>>
    where
        F: Fn(usize, I) -> Fut,
        Fut: Future<Output = R>,
        R: RunRecord,
        C: Checkpoint<R> + ?Sized,
    {
        let total = items.len();
        let mut slots: Vec<Option<R>> = (0..total).map(|_| None).collect();
        let mut batch: Vec<R> = Vec::new();
        let pb = self.progress_bar(total);
        let delay = self.delay;

        let mut completed = stream::iter(items.into_iter().enumerate())
            .map(|(slot, item)| {
                let work = task(slot, item);
                async move {
                    let record = work.await;
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    (slot, record)
                }
            })
            .buffer_unordered(self.concurrency);

        let mut done = 0usize;
        while let Some((slot, record)) = completed.next().await {
            done += 1;
            let line = progress_line(&record);
            log::debug!("[{done}/{total}] {line}");
            pb.set_message(line);
            pb.inc(1);

            batch.push(record.clone());
            slots[slot] = Some(record);

            if batch.len() >= self.batch_size {
                let snapshot: Vec<R> = slots.iter().flatten().cloned().collect();
                if let Err(e) = checkpoint.checkpoint(&batch, &snapshot).await {
                    pb.abandon_with_message("checkpoint failed");
                    return Err(e);
                }
                log::info!("Checkpoint saved ({} completed)", snapshot.len());
                batch.clear();
            }
        }
        pb.finish_and_clear();

        Ok(PoolOutput {
            results: slots.into_iter().flatten().collect(),
            unsaved: batch,
        })
    }
}

fn progress_line<R: RunRecord>(record: &R) -> String {
    match record.detail().filter(|d| !d.is_empty()) {
        Some(detail) => format!("{}: {} ({detail})", record.item(), record.status()),
        None => format!("{}: {}", record.item(), record.status()),
    }
}
