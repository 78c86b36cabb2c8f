//! CLI for App Doohickey: browse, inspect and install apps from a catalog.

pub mod install;
pub mod loader;
pub mod resolver;
pub mod route;
pub mod source;
pub mod state;
pub mod tui;

#[cfg(test)]
mod test_utils;

pub use resolver::{DetailError, DetailStatus};
pub use route::Route;
pub use source::{
    CatalogSource, DEFAULT_BASE_URL, HttpSource, LocalSource, Source, SourceError,
};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use doohickey_catalog::{Catalog, Severity, ValidationReport};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "doohickey")]
#[command(version, about = "Browse and install apps from an App Doohickey catalog", long_about = None)]
pub struct Cli {
    /// Base URL of the catalog server
    #[arg(long, global = true, env = "DOOHICKEY_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Read the catalog from a local JSON file instead of the server
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Milliseconds to wait for the live catalog before showing placeholders
    #[arg(long, global = true, env = "DOOHICKEY_FALLBACK_MS", default_value_t = 2000)]
    pub fallback_after_ms: u64,

    /// Write logs to this file (the TUI does not log otherwise)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Browse the catalog interactively (default)
    Browse,

    /// Open the detail view for one app
    Show {
        /// Percent-encoded app name, or a route such as `/app/Note%20Pad`
        id: String,
    },

    /// Print the catalog
    List,

    /// Ask the catalog server to install an app
    Install {
        /// Exact app name as listed in the catalog
        name: String,
    },

    /// Validate a catalog JSON file
    Validate {
        /// Path to the catalog file
        path: PathBuf,
    },

    /// Extract a ```json block from a submission, validate it and append it
    Submit {
        /// Text file holding the submission
        body: PathBuf,

        /// Catalog file to append to (created if missing)
        #[arg(long)]
        into: PathBuf,
    },
}

/// Main entry point for the CLI.
pub fn main() -> Result<()> {
    let Cli {
        base_url,
        catalog,
        fallback_after_ms,
        log_file,
        verbose,
        command,
    } = Cli::parse();

    let command = command.unwrap_or(Commands::Browse);
    let interactive = matches!(command, Commands::Browse | Commands::Show { .. });
    init_logging(verbose, log_file.as_deref(), interactive)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let source = || -> Result<Arc<Source>> {
        let source = Source::from_args(&base_url, catalog.as_deref())?;
        Ok(Arc::new(source))
    };
    let fallback_after = Duration::from_millis(fallback_after_ms);

    match command {
        Commands::Browse => tui::run_list(runtime.handle().clone(), source()?, fallback_after),
        Commands::Show { id } => tui::run_route(
            runtime.handle().clone(),
            source()?,
            fallback_after,
            route_for_target(&id),
        ),
        Commands::List => runtime.block_on(list_cmd(source()?.as_ref())),
        Commands::Install { name } => runtime.block_on(install_cmd(source()?.as_ref(), &name)),
        Commands::Validate { path } => validate_catalog_cmd(&path),
        Commands::Submit { body, into } => submit_cmd(&body, &into),
    }
}

// ============================================================================
// Logging
// ============================================================================

fn init_logging(verbose: u8, log_file: Option<&Path>, interactive: bool) -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        // stderr output would be drawn over the alternate screen.
        None if interactive => {}
        None => builder.with_writer(std::io::stderr).init(),
    }

    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

/// Interpret a `show` argument: `/`, `/app/{id}`, or a bare identifier.
pub fn route_for_target(target: &str) -> Route {
    Route::parse(target).unwrap_or_else(|| Route::from_identifier(target))
}

/// One line per app: `name version -- description`.
pub fn format_catalog(catalog: &Catalog) -> String {
    catalog
        .iter()
        .map(|app| {
            let version = if app.version.is_empty() {
                "-"
            } else {
                app.version.as_str()
            };
            format!("{} {} -- {}", app.name, version, app.description)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fetch the catalog once and print it.
pub async fn list_cmd<S: CatalogSource>(source: &S) -> Result<()> {
    let catalog = source
        .fetch_catalog()
        .await
        .context(state::LOAD_FAILURE_MESSAGE)?;

    if catalog.is_empty() {
        println!("No apps available.");
    } else {
        println!("{}", format_catalog(&catalog));
    }
    Ok(())
}

/// Trigger an install and report the outcome.
pub async fn install_cmd<S: CatalogSource>(source: &S, name: &str) -> Result<()> {
    install::request_install(source, name)
        .await
        .with_context(|| state::install_error_message(name))?;
    println!("{}", state::install_notice_message(name));
    Ok(())
}

fn print_report(report: &ValidationReport) {
    for diag in &report.diagnostics {
        let level = match diag.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        eprintln!("{level}[{}]: {}", diag.rule, diag.message);
    }
}

fn error_count(report: &ValidationReport) -> usize {
    report
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count()
}

/// Validate a catalog file, printing every diagnostic to stderr.
pub fn validate_catalog_cmd(path: &Path) -> Result<()> {
    let (catalog, mut report) = doohickey_catalog::load_catalog_checked(path)
        .with_context(|| format!("Failed to load catalog {}", path.display()))?;

    report.merge(doohickey_catalog::validate_catalog(&catalog));
    print_report(&report);

    if report.has_errors() {
        bail!(
            "{} has {} error(s)",
            path.display(),
            error_count(&report)
        );
    }

    println!("{} is valid ({} apps)", path.display(), catalog.len());
    Ok(())
}

/// Extract the submission in `body`, validate it and append it to `into`.
///
/// Nothing is written when the submission has errors.
pub fn submit_cmd(body: &Path, into: &Path) -> Result<()> {
    let text = std::fs::read_to_string(body)
        .with_context(|| format!("Failed to read {}", body.display()))?;
    let submission = doohickey_catalog::parse_submission(&text)
        .with_context(|| format!("No app submission found in {}", body.display()))?;

    let report = doohickey_catalog::validate_submission(&submission);
    print_report(&report);
    if report.has_errors() {
        bail!("submission has {} error(s)", error_count(&report));
    }

    let name = submission
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let count = doohickey_catalog::append_submission(into, submission)
        .with_context(|| format!("Failed to update {}", into.display()))?;

    tracing::info!(name, catalog = %into.display(), apps = count, "submission appended");
    println!("Added {name} to {} ({count} apps)", into.display());
    Ok(())
}
