//! Storage for run artifacts and the running ledger.
//!
//! - `local`: atomic file writes under an output directory
//! - `csv_log`: versioned, append-only CSV ledger files
//! - `ledger`: the JSON history of runs and what it implies for resuming

pub mod csv_log;
pub mod ledger;
pub mod local;

// Re-export for convenience
pub use csv_log::{CsvLog, CsvSchema};
pub use ledger::{LEDGER_JSON, Ledger, LedgerStore};
pub use local::{LocalStorage, run_key};
