// src/config.rs

//! Configuration loading utilities.
//!
//! The process environment is layered over an optional `.env` file found by
//! walking upward from the working directory. Variables already set in the
//! process win over the file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::Config;

/// Find the nearest `.env`, starting at `start` and walking up to the root.
pub fn find_dotenv(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(".env"))
        .find(|candidate| candidate.is_file())
}

/// Parse a `.env` file into a map without touching the process environment.
pub fn read_dotenv(path: &Path) -> Result<HashMap<String, String>> {
    let iter = dotenvy::from_path_iter(path)
        .map_err(|e| AppError::config(format!("Failed to read {}: {e}", path.display())))?;

    let mut vars = HashMap::new();
    for item in iter {
        let (key, value) = item
            .map_err(|e| AppError::config(format!("Invalid line in {}: {e}", path.display())))?;
        vars.insert(key.trim_start_matches('\u{feff}').to_string(), value);
    }
    Ok(vars)
}

/// Load configuration from the environment plus the nearest `.env`.
///
/// Returns the configuration and the `.env` path that contributed, if any.
pub fn load_config(cwd: &Path) -> Result<(Config, Option<PathBuf>)> {
    let dotenv_path = find_dotenv(cwd);
    let file_vars = match &dotenv_path {
        Some(path) => {
            log::debug!("Loading environment defaults from {}", path.display());
            read_dotenv(path)?
        }
        None => HashMap::new(),
    };

    let config = Config::from_lookup(|name| {
        std::env::var(name)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| file_vars.get(name).cloned())
    })?;

    Ok((config, dotenv_path))
}
