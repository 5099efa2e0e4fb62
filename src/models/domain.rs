//! Domain availability records.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::run::{Outcome, RunRecord};

/// Legacy (v1) header of the running CSV ledger.
pub const CSV_HEADER_V1: &[&str] = &[
    "domain",
    "availability",
    "price",
    "notes",
    "ok",
    "error",
    "searchUrl",
    "timestamp",
];

/// Current (v2) header: run metadata followed by the v1 columns.
pub const CSV_HEADER_V2: &[&str] = &[
    "runId",
    "runStartedAt",
    "runFinishedAt",
    "domain",
    "availability",
    "price",
    "notes",
    "ok",
    "error",
    "searchUrl",
    "timestamp",
];

/// Closed set of availability classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Available,
    Taken,
    #[default]
    Unknown,
}

impl Availability {
    /// Parse a classification; anything outside the closed set is `Unknown`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "available" => Self::Available,
            "taken" => Self::Taken,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Taken => "taken",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful check of one domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainCheck {
    pub availability: Availability,
    pub price: Option<String>,
    pub notes: String,
    pub has_extract: bool,
    pub has_markdown: bool,
}

/// Result record for one domain.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainRecord {
    pub domain: String,
    pub search_url: String,
    /// 1-based position in this run's work list
    pub index: usize,
    pub timestamp: String,
    #[serde(flatten)]
    pub outcome: Outcome<DomainCheck>,
}

impl DomainRecord {
    pub fn availability(&self) -> Option<Availability> {
        self.outcome.success().map(|c| c.availability)
    }

    /// Row under [`CSV_HEADER_V1`].
    pub fn csv_row_v1(&self) -> Vec<String> {
        let (availability, price, notes, error) = match &self.outcome {
            Outcome::Success(check) => (
                check.availability.to_string(),
                check.price.clone().unwrap_or_default(),
                check.notes.clone(),
                String::new(),
            ),
            Outcome::Failure { error } => (String::new(), String::new(), String::new(), error.clone()),
        };

        vec![
            self.domain.clone(),
            availability,
            price,
            notes,
            csv_bool(self.outcome.is_ok()),
            error,
            self.search_url.clone(),
            self.timestamp.clone(),
        ]
    }

    /// Row under [`CSV_HEADER_V2`].
    pub fn csv_row_v2(&self, run_id: &str, started_at: &str, finished_at: &str) -> Vec<String> {
        let mut row = vec![
            run_id.to_string(),
            started_at.to_string(),
            finished_at.to_string(),
        ];
        row.extend(self.csv_row_v1());
        row
    }
}

impl RunRecord for DomainRecord {
    fn item(&self) -> &str {
        &self.domain
    }

    fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    fn status(&self) -> String {
        match &self.outcome {
            Outcome::Success(check) => check.availability.to_string(),
            Outcome::Failure { .. } => "ERROR".to_string(),
        }
    }

    fn detail(&self) -> Option<String> {
        match &self.outcome {
            Outcome::Success(check) => check.price.clone(),
            Outcome::Failure { error } => Some(error.clone()),
        }
    }
}

/// Booleans are written the way existing ledgers spell them.
pub(crate) fn csv_bool(value: bool) -> String {
    if value { "True" } else { "False" }.to_string()
}
