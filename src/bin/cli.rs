//! firebatch CLI
//!
//! Local entry point for the domain availability and paper download jobs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use firebatch::{
    config::load_config,
    error::{AppError, Result},
    models::{Config, load_input},
    pipeline::{self, domains, papers},
    storage::{LEDGER_JSON, Ledger, LocalStorage},
    utils::console,
};

/// firebatch - checkpointed batch jobs over a Firecrawl-compatible scrape API
#[derive(Parser, Debug)]
#[command(name = "firebatch", version, about = "Resumable scrape-API batch jobs")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Suppress banners, progress bars and summaries
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check domain availability for every domain in the input list
    Domains {
        /// Newline-delimited domain list
        #[arg(short, long, default_value = "domains.txt")]
        input: PathBuf,

        /// Directory holding the running ledger and per-run artifacts
        #[arg(short, long, default_value = "out/domains")]
        out_dir: PathBuf,

        /// Re-check domains already recorded in the ledger
        #[arg(long)]
        force: bool,
    },

    /// Download PDFs for every landing-page URL in the input list
    Papers {
        /// Newline-delimited landing-page URLs
        #[arg(short, long, default_value = "urls.txt")]
        input: PathBuf,

        /// Directory holding the running ledger and per-run artifacts
        #[arg(short, long, default_value = "out/papers")]
        out_dir: PathBuf,

        /// Re-process URLs already recorded in the ledger
        #[arg(long)]
        force: bool,
    },

    /// Validate configuration
    Validate,

    /// Show ledger info for an output directory
    Info {
        #[arg(short, long, default_value = "out/domains")]
        out_dir: PathBuf,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool, quiet: bool) {
    let level = match (verbose, quiet) {
        (true, _) => "debug",
        (false, true) => "warn",
        (false, false) => "info",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    console::set_quiet(cli.quiet);

    let cwd = std::env::current_dir()?;
    let (config, dotenv) = load_config(&cwd)?;
    match &dotenv {
        Some(path) => log::debug!("Loaded .env from {}", path.display()),
        None => log::debug!("No .env found above {}", cwd.display()),
    }

    match cli.command {
        Command::Domains {
            input,
            out_dir,
            force,
        } => {
            config.validate()?;
            let api = Arc::new(domains::domain_client(&config)?);
            let items = load_nonempty(&input)?;

            let report =
                pipeline::run_domain_check(&config, api, items, &out_dir, force).await?;
            report.print("Domain availability");
            report.ensure_progress()?;
        }

        Command::Papers {
            input,
            out_dir,
            force,
        } => {
            config.validate()?;
            let api = Arc::new(papers::paper_client(&config)?);
            let http = papers::download_client(&config)?;
            let items = load_nonempty(&input)?;

            let report =
                pipeline::run_paper_download(&config, api, http, items, &out_dir, force).await?;
            report.print("Paper download");
            report.ensure_progress()?;
        }

        Command::Validate => validate(&config, dotenv.as_deref())?,

        Command::Info { out_dir } => info(&out_dir).await?,
    }

    Ok(())
}

/// Load an input list; an empty list is reported but not an error.
fn load_nonempty(path: &Path) -> Result<Vec<String>> {
    let items = load_input(path)?;
    if items.is_empty() {
        log::warn!("No items found in {}", path.display());
    }
    Ok(items)
}

fn validate(config: &Config, dotenv: Option<&Path>) -> Result<()> {
    log::info!("Validating configuration...");

    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {e}");
        return Err(e);
    }

    log::info!(
        ".env: {}",
        dotenv.map_or_else(|| "not found".to_string(), |p| p.display().to_string())
    );
    log::info!("Scrape endpoint: {}", config.api.endpoint());
    log::info!(
        "API key: {}",
        if config.api.api_key.is_some() { "set" } else { "missing" }
    );
    log::info!("Domain job: {:?}", config.domains);
    log::info!("Paper job: {:?}", config.papers);

    if config.api.api_key.is_none() {
        return Err(AppError::config("Missing FIRECRAWL_API_KEY (or TEST_API_KEY)"));
    }
    log::info!("All validations passed!");
    Ok(())
}

async fn info(out_dir: &Path) -> Result<()> {
    let storage = LocalStorage::new(out_dir);
    log::info!("Output directory: {}", out_dir.display());

    let Some(text) = storage.read_text(LEDGER_JSON).await? else {
        log::info!("No ledger found yet.");
        return Ok(());
    };

    let ledger = Ledger::parse(&text);
    log::info!("Runs recorded: {}", ledger.runs().len());
    if let Some(last) = ledger.runs().last() {
        let field = |key: &str| last.get(key).and_then(|v| v.as_str()).unwrap_or("?").to_string();
        log::info!("Latest run: {} (finished {})", field("runId"), field("finishedAt"));
    }

    let domains = ledger.completed_items("domain");
    if !domains.is_empty() {
        log::info!("Domains checked: {}", domains.len());
        log::info!("Available domains: {}", ledger.available_domains().len());
    }
    let urls = ledger.completed_items("url");
    if !urls.is_empty() {
        log::info!("URLs processed: {}", urls.len());
    }
    Ok(())
}
