//! Symbol discovery from on-disk vendor files
//!
//! The terminal keeps one `.day` file per listed instrument, so the daily
//! directories double as the symbol catalog. Only the primary A-share
//! boards are kept; funds, B-shares and everything else sharing the
//! directories are filtered out by code prefix.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::Market;
use crate::services::decoder::normalize_code;

/// One discoverable security
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub market: Market,
    /// Bare 6-digit exchange code
    pub code: String,
    /// Display name derived from board and file stem
    pub name: String,
}

fn daily_dir(config: &Config, market: Market) -> PathBuf {
    config
        .tdx_path
        .join("vipdoc")
        .join(market.folder())
        .join("lday")
}

/// Enumerate the symbols with daily data on disk, restricted to primary
/// listing boards.
///
/// # Errors
/// `NotFound` when neither market's daily directory exists, or when the
/// board filter leaves nothing — the pipeline has no work either way.
pub fn scan(config: &Config) -> Result<Vec<CatalogEntry>> {
    let roots: Vec<(Market, PathBuf)> = Market::all()
        .into_iter()
        .map(|market| (market, daily_dir(config, market)))
        .collect();

    if !roots.iter().any(|(_, dir)| dir.exists()) {
        return Err(AppError::NotFound(format!(
            "no daily data directories under {}",
            config.tdx_path.join("vipdoc").display()
        )));
    }

    let mut seen: HashSet<(Market, String)> = HashSet::new();
    let mut entries = Vec::new();

    for (market, dir) in roots {
        if !dir.exists() {
            debug!("Skipping missing market directory: {}", dir.display());
            continue;
        }

        for dir_entry in std::fs::read_dir(&dir)? {
            let path = dir_entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("day") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let code = normalize_code(stem);
            if !market.is_primary_board(code) {
                continue;
            }
            if !seen.insert((market, code.to_string())) {
                continue;
            }

            entries.push(CatalogEntry {
                market,
                code: code.to_string(),
                name: format!("{}{}", market.display_prefix(), stem),
            });
        }
    }

    if entries.is_empty() {
        return Err(AppError::NotFound(
            "no symbol data files matched the primary board filter".to_string(),
        ));
    }

    entries.sort_by(|a, b| (a.market.code(), &a.code).cmp(&(b.market.code(), &b.code)));
    info!("Catalog scan found {} symbols", entries.len());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_for(root: &TempDir) -> Config {
        Config {
            tdx_path: root.path().to_path_buf(),
            csv_output_path: root.path().join("output"),
            db_path: root.path().join("tdx_data.db"),
            batch_size: 10_000,
            show_progress: false,
        }
    }

    fn touch(root: &TempDir, market: &str, name: &str) {
        let dir = root.path().join("vipdoc").join(market).join("lday");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_scan_filters_to_primary_boards() {
        let root = TempDir::new().unwrap();
        touch(&root, "sz", "sz000001.day");
        touch(&root, "sz", "sz300750.day");
        touch(&root, "sz", "sz900001.day"); // B-share: excluded
        touch(&root, "sz", "sz159915.day"); // fund: excluded
        touch(&root, "sh", "sh600519.day");
        touch(&root, "sh", "sh510300.day"); // ETF: excluded
        touch(&root, "sh", "sh600519.tmp"); // wrong extension

        let entries = scan(&config_for(&root)).unwrap();
        let codes: Vec<&str> = entries.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["000001", "300750", "600519"]);

        let sh = entries.iter().find(|e| e.code == "600519").unwrap();
        assert_eq!(sh.market, Market::Shanghai);
        assert_eq!(sh.name, "SHAsh600519");
    }

    #[test]
    fn test_scan_with_single_market_present() {
        let root = TempDir::new().unwrap();
        touch(&root, "sh", "sh688981.day");

        let entries = scan(&config_for(&root)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].code, "688981");
    }

    #[test]
    fn test_scan_without_data_dirs_is_not_found() {
        let root = TempDir::new().unwrap();
        let err = scan(&config_for(&root)).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_scan_with_only_filtered_files_is_not_found() {
        let root = TempDir::new().unwrap();
        touch(&root, "sz", "sz900001.day");

        let err = scan(&config_for(&root)).unwrap_err();
        assert!(err.is_not_found());
    }
}
