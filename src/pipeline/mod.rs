//! Pipeline entry points for batch jobs.
//!
//! - `run_domain_check`: classify domains and extend the domain ledger
//! - `run_paper_download`: fetch papers and extend the paper ledger
//!
//! Both run items through the bounded `pool` with per-item `retry`.

pub mod domains;
pub mod papers;
pub mod pool;
pub mod report;
pub mod retry;

pub use domains::run_domain_check;
pub use papers::run_paper_download;
pub use pool::{Checkpoint, NoCheckpoint, PoolOutput, WorkerPool};
pub use report::JobReport;
pub use retry::with_retries;
