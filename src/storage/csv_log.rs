//! Versioned CSV ledger files.
//!
//! A running CSV is only ever appended to. Before each append the file is
//! brought up to the current header schema: files written under the legacy
//! header get their rows prefixed with empty run-metadata columns, and rows
//! glued together by a missing trailing newline are split apart. A header
//! that matches neither schema stops the append.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AppError, Result};
use crate::storage::LocalStorage;

/// `runId,runStartedAt` at the start of a v2 row.
static GLUED_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{8}-\d{6},20\d{2}-\d{2}-\d{2}T").expect("glued-row pattern is valid")
});

/// Current and previous header of a CSV ledger.
#[derive(Debug, Clone, Copy)]
pub struct CsvSchema {
    pub current: &'static [&'static str],
    pub legacy: Option<&'static [&'static str]>,
}

impl CsvSchema {
    pub fn header_line(&self) -> String {
        self.current.join(",")
    }
}

/// Encode rows as CSV text, one `\n`-terminated line per row.
pub fn encode_rows<I, R>(rows: I) -> Result<String>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for row in rows {
        writer.write_record(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Io(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Full CSV document: header plus rows.
pub fn encode_table(header: &[&str], rows: &[Vec<String>]) -> Result<String> {
    let mut text = encode_rows([header])?;
    text.push_str(&encode_rows(rows)?);
    Ok(text)
}

/// Rewrite a legacy-header document under the current header.
///
/// Returns `None` when the document is not in the legacy schema.
pub fn upgrade_legacy_header(text: &str, schema: &CsvSchema) -> Option<String> {
    let legacy = schema.legacy?;
    let mut lines = text.lines();
    if lines.next()?.trim() != legacy.join(",") {
        return None;
    }

    let prefix = ",".repeat(schema.current.len().saturating_sub(legacy.len()));
    let mut out = schema.header_line();
    out.push('\n');
    for line in lines.filter(|l| !l.is_empty()) {
        out.push_str(&prefix);
        out.push_str(line);
        out.push('\n');
    }
    Some(out)
}

/// Split lines that hold two records because a newline went missing.
///
/// Returns `None` when nothing needed splitting.
pub fn repair_glued_rows(text: &str) -> Option<String> {
    let mut out: Vec<&str> = Vec::new();
    let mut changed = false;

    for line in text.lines() {
        let mut start = 0;
        for m in GLUED_ROW.find_iter(line) {
            if m.start() > start {
                out.push(&line[start..m.start()]);
                start = m.start();
                changed = true;
            }
        }
        out.push(&line[start..]);
    }

    if !changed {
        return None;
    }
    let mut repaired = out.join("\n");
    repaired.push('\n');
    Some(repaired)
}

/// An append-only CSV file under a [`LocalStorage`] root.
#[derive(Debug, Clone)]
pub struct CsvLog {
    storage: LocalStorage,
    key: String,
    schema: CsvSchema,
}

impl CsvLog {
    pub fn new(storage: LocalStorage, key: impl Into<String>, schema: CsvSchema) -> Self {
        Self {
            storage,
            key: key.into(),
            schema,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Append rows, first normalizing the file to the current schema.
    ///
    /// The file is rewritten through a temp file, so a failed append leaves
    /// the previous contents intact. Callers serialize access.
    pub async fn append(&self, rows: &[Vec<String>]) -> Result<()> {
        let pending = self.prepare(rows).await?;
        self.commit(pending).await
    }

    /// Build the next file contents without writing anything.
    ///
    /// Fails with `LedgerIntegrity` when the header matches neither schema,
    /// so callers can check before touching other ledger files.
    pub async fn prepare(&self, rows: &[Vec<String>]) -> Result<PendingAppend> {
        let header = self.schema.header_line();
        let original = self.storage.read_text(&self.key).await?.unwrap_or_default();

        let mut text = if original.trim().is_empty() {
            format!("{header}\n")
        } else {
            original.clone()
        };

        if let Some(upgraded) = upgrade_legacy_header(&text, &self.schema) {
            log::info!("Upgrading legacy CSV header in {}", self.key);
            text = upgraded;
        }

        if let Some(repaired) = repair_glued_rows(&text) {
            log::warn!("Repaired glued rows in {}", self.key);
            text = repaired;
        }

        let first_line = text.lines().next().unwrap_or_default().trim();
        if first_line != header {
            return Err(AppError::ledger(
                self.storage.path(&self.key).display(),
                "unexpected CSV header; refusing to append",
            ));
        }

        if !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&encode_rows(rows)?);

        let changed = text != original;
        Ok(PendingAppend { text, changed })
    }

    /// Write contents produced by [`CsvLog::prepare`].
    pub async fn commit(&self, pending: PendingAppend) -> Result<()> {
        if pending.changed {
            self.storage.write_text(&self.key, &pending.text).await?;
        }
        Ok(())
    }
}

/// Validated CSV contents waiting to be written.
#[derive(Debug)]
pub struct PendingAppend {
    text: String,
    changed: bool,
}
