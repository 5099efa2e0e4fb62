// src/utils/console.rs

//! Console reporting with server-style formatting.
//!
//! Run banners and summaries go to stdout with a timestamp prefix.
//! Diagnostics use the `log` macros instead.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Local;

static QUIET: AtomicBool = AtomicBool::new(false);

/// Silence banners and summaries (progress bars follow the same flag).
pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

fn format_line(message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    format!("[{timestamp}] [INFO] {message}")
}

fn emit(message: &str) {
    if !is_quiet() {
        println!("{}", format_line(message));
    }
}

/// Banner around a title.
pub fn header(title: &str) {
    let border = "═".repeat(60);
    emit(&border);
    emit(&format!("  {title}"));
    emit(&border);
}

/// Indented detail line.
pub fn sub_item(message: &str) {
    emit(&format!("    {message}"));
}

/// Plain line.
pub fn line(message: &str) {
    emit(message);
}

/// Titled list of key/value pairs.
pub fn summary(title: &str, items: &[(&str, String)]) {
    if is_quiet() {
        return;
    }
    println!();
    emit(&format!("[SUMMARY] {title}"));
    for (key, value) in items {
        emit(&format!("    {key}: {value}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_format() {
        let line = format_line("hello");
        assert!(line.starts_with('['));
        assert!(line.ends_with("] [INFO] hello"));
    }
}
