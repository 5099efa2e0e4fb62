//! End-of-run reporting shared by both jobs.

use std::path::PathBuf;

use crate::error::{AppError, Result};
use crate::utils::console;

/// Outcome of a job invocation, as shown to the operator.
#[derive(Debug, Clone, Default)]
pub struct JobReport {
    /// `None` when there was nothing to do and no run was recorded
    pub run_id: Option<String>,
    /// Items in the input list
    pub input_count: usize,
    /// Items skipped because an earlier run already handled them
    pub skipped: usize,
    pub processed: usize,
    pub success: usize,
    pub failures: usize,
    /// Job-specific highlight (available domains, downloaded PDFs)
    pub highlight: (&'static str, usize),
    /// Written artifacts, labelled
    pub artifacts: Vec<(&'static str, PathBuf)>,
}

impl JobReport {
    /// A run that had nothing left to process.
    pub fn nothing_to_do(input_count: usize, skipped: usize, highlight: &'static str) -> Self {
        Self {
            input_count,
            skipped,
            highlight: (highlight, 0),
            ..Self::default()
        }
    }

    /// Print the final console summary.
    pub fn print(&self, title: &str) {
        let mut items = vec![
            ("Total processed", self.processed.to_string()),
            ("Success", self.success.to_string()),
            ("Failures", self.failures.to_string()),
            (self.highlight.0, self.highlight.1.to_string()),
        ];
        if self.skipped > 0 {
            items.push(("Skipped (already done)", self.skipped.to_string()));
        }
        console::summary(title, &items);

        if !self.artifacts.is_empty() {
            console::line("Output files:");
            for (label, path) in &self.artifacts {
                console::sub_item(&format!("{label}: {}", path.display()));
            }
        }
    }

    /// A run that had work but produced no successes is an error.
    pub fn ensure_progress(&self) -> Result<()> {
        if self.processed > 0 && self.success == 0 {
            return Err(AppError::NothingProcessed {
                failures: self.failures,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_failed_is_error() {
        let report = JobReport {
            processed: 3,
            failures: 3,
            ..JobReport::default()
        };
        assert!(matches!(
            report.ensure_progress(),
            Err(AppError::NothingProcessed { failures: 3 })
        ));
    }

    #[test]
    fn test_empty_or_partial_runs_are_fine() {
        assert!(JobReport::nothing_to_do(5, 5, "Available").ensure_progress().is_ok());

        let partial = JobReport {
            processed: 3,
            success: 1,
            failures: 2,
            ..JobReport::default()
        };
        assert!(partial.ensure_progress().is_ok());
    }
}
