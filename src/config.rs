//! Runtime configuration
//!
//! All settings come from environment variables (a `.env` file is honored)
//! and can be overridden per-invocation by CLI flags. The resolved value is
//! constructed once in `main` and passed by reference to the services that
//! need it.

use std::path::PathBuf;

use crate::error::{AppError, Result};

/// Resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// TDX terminal installation directory (contains `vipdoc/`)
    pub tdx_path: PathBuf,

    /// Directory CSV output files are written to
    pub csv_output_path: PathBuf,

    /// SQLite database file
    pub db_path: PathBuf,

    /// Rows per database insert transaction
    pub batch_size: usize,

    /// Show a progress bar over catalog iteration
    pub show_progress: bool,
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key).ok().filter(|v| !v.is_empty()).map(PathBuf::from)
}

impl Config {
    /// Build the configuration from the environment with CLI overrides
    /// applied on top. CLI flags win.
    ///
    /// `TDX_PATH` has no default: the tool cannot do anything without the
    /// terminal's data directory, so a value that is neither in the
    /// environment nor given as `--tdx-path` is a configuration error.
    pub fn resolve(
        tdx_path: Option<PathBuf>,
        output: Option<PathBuf>,
        db_path: Option<PathBuf>,
        batch_size: Option<usize>,
        no_progress: bool,
    ) -> Result<Self> {
        let tdx_path = tdx_path.or_else(|| env_path("TDX_PATH")).ok_or_else(|| {
            AppError::Config(
                "TDX_PATH is not set; set it in the environment or .env, or pass --tdx-path"
                    .to_string(),
            )
        })?;

        if !tdx_path.exists() {
            return Err(AppError::NotFound(format!(
                "TDX data path does not exist: {}",
                tdx_path.display()
            )));
        }

        let batch_size = match batch_size {
            Some(size) => size,
            None => match std::env::var("DB_BATCH_SIZE") {
                Ok(raw) => raw.parse::<usize>().map_err(|_| {
                    AppError::Config(format!("DB_BATCH_SIZE is not a valid number: {}", raw))
                })?,
                Err(_) => 10_000,
            },
        };

        let show_progress = !no_progress
            && std::env::var("SHOW_PROGRESS")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(true);

        Ok(Self {
            tdx_path,
            csv_output_path: output
                .or_else(|| env_path("CSV_OUTPUT_PATH"))
                .unwrap_or_else(|| PathBuf::from("output")),
            db_path: db_path
                .or_else(|| env_path("DB_PATH"))
                .unwrap_or_else(|| PathBuf::from("tdx_data.db")),
            batch_size,
            show_progress,
        })
    }
}
