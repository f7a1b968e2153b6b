//! Per-symbol processing driver
//!
//! For every selected symbol the driver runs one linear pass: decode the
//! vendor file, derive the coarser minute tiers where applicable, forward-
//! fill and attach the moving averages, apply the optional date filter and
//! hand the result to storage. Symbols are processed strictly one after
//! another; a failure in one symbol is logged and never blocks the rest of
//! the batch. Only the inability to obtain a catalog is fatal to a run.

use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::indicators::{attach_moving_averages, forward_fill};
use crate::models::{DailyBar, Market, MinuteBar, Timeframe};
use crate::services::aggregator::resample_minutes;
use crate::services::catalog;
use crate::services::decoder::{
    daily_file_path, decode_daily_file, decode_minute_file, minute_file_path, normalize_code,
};
use crate::services::storage::{SaveOptions, Storage};

/// Which symbols a run covers.
#[derive(Debug, Clone)]
pub enum Selection {
    /// Every symbol the catalog scanner finds
    All,
    /// One explicitly requested symbol
    Single { market: Market, code: String },
}

impl Selection {
    pub fn from_args(code: Option<String>, market: Option<u8>) -> Result<Self> {
        match (code, market) {
            (Some(code), Some(market_code)) => {
                let market = Market::from_code(market_code).ok_or_else(|| {
                    AppError::Parse(format!("invalid market code: {}", market_code))
                })?;
                Ok(Selection::Single {
                    market,
                    code: normalize_code(&code).to_string(),
                })
            }
            _ => Ok(Selection::All),
        }
    }
}

/// Inclusive date window applied before persistence. Minute bars are
/// compared by their calendar date, so an end bound keeps that whole
/// trading day.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        let parse_one = |raw: &str| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| AppError::Parse(format!("invalid date (expected YYYY-MM-DD): {}", raw)))
        };
        Ok(Self {
            start: start.map(parse_one).transpose()?,
            end: end.map(parse_one).transpose()?,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        if let Some(start) = self.start {
            if date < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if date > end {
                return false;
            }
        }
        true
    }
}

/// What a run accomplished, for the command layer to report.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunReport {
    /// Symbols that produced at least one persisted row
    pub symbols: usize,
    /// Persisted rows across all targets
    pub rows: u64,
}

fn catalog_progress(config: &Config, len: usize) -> ProgressBar {
    if !config.show_progress {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}

/// Scan the catalog and persist it as `stock_info`.
pub async fn run_stock_list(config: &Config, opts: SaveOptions) -> Result<RunReport> {
    let entries = catalog::scan(config)?;
    let mut storage = Storage::open(config, opts).await?;
    storage.save_catalog(&entries).await?;
    Ok(RunReport {
        symbols: entries.len(),
        rows: entries.len() as u64,
    })
}

/// Decode, process and persist daily bars for the selection.
pub async fn run_daily(
    config: &Config,
    selection: &Selection,
    range: &DateRange,
    opts: SaveOptions,
) -> Result<RunReport> {
    let mut storage = Storage::open(config, opts).await?;
    let mut report = RunReport::default();

    match selection {
        Selection::Single { market, code } => {
            let bars = process_daily_symbol(config, *market, code, range)?;
            if !bars.is_empty() {
                save_daily_logged(&mut storage, code, &bars, &mut report).await;
            }
        }
        Selection::All => {
            let entries = catalog::scan(config)?;
            info!("Processing daily bars for {} symbols", entries.len());
            let pb = catalog_progress(config, entries.len());

            for entry in &entries {
                match process_daily_symbol(config, entry.market, &entry.code, range) {
                    Ok(bars) if bars.is_empty() => {}
                    Ok(bars) => {
                        save_daily_logged(&mut storage, &entry.code, &bars, &mut report).await;
                    }
                    Err(err) if err.is_not_found() => {
                        // Catalog membership does not guarantee the file
                        // exists for this frequency.
                        debug!("No daily file for {}: {}", entry.code, err);
                    }
                    Err(err) => {
                        error!("Skipping {} daily data: {}", entry.code, err);
                    }
                }
                pb.inc(1);
            }
            pb.finish_and_clear();
        }
    }

    Ok(report)
}

/// Decode 5-minute bars, derive the 15/30/60-minute tiers and persist all
/// four for the selection.
pub async fn run_minutes(
    config: &Config,
    selection: &Selection,
    range: &DateRange,
    opts: SaveOptions,
) -> Result<RunReport> {
    let mut storage = Storage::open(config, opts).await?;
    let mut report = RunReport::default();

    match selection {
        Selection::Single { market, code } => {
            let rows = process_minute_symbol(config, *market, code, range, &mut storage).await?;
            if rows > 0 {
                report.symbols = 1;
                report.rows = rows;
            }
        }
        Selection::All => {
            let entries = catalog::scan(config)?;
            info!("Processing minute bars for {} symbols", entries.len());
            let pb = catalog_progress(config, entries.len());

            for entry in &entries {
                match process_minute_symbol(config, entry.market, &entry.code, range, &mut storage)
                    .await
                {
                    Ok(0) => {}
                    Ok(rows) => {
                        report.symbols += 1;
                        report.rows += rows;
                    }
                    Err(err) if err.is_not_found() => {
                        debug!("No 5-minute file for {}: {}", entry.code, err);
                    }
                    Err(err) => {
                        error!("Skipping {} minute data: {}", entry.code, err);
                    }
                }
                pb.inc(1);
            }
            pb.finish_and_clear();
        }
    }

    Ok(report)
}

/// Persistence failures are recorded, never escalated: the store's own
/// status is the only report, and the batch moves on.
async fn save_daily_logged(
    storage: &mut Storage,
    code: &str,
    bars: &[DailyBar],
    report: &mut RunReport,
) {
    match storage.save_daily(bars).await {
        Ok(()) => {
            report.symbols += 1;
            report.rows += bars.len() as u64;
        }
        Err(err) => error!("Failed to persist daily data for {}: {}", code, err),
    }
}

fn process_daily_symbol(
    config: &Config,
    market: Market,
    code: &str,
    range: &DateRange,
) -> Result<Vec<DailyBar>> {
    let path = daily_file_path(&config.tdx_path, market, code);
    let mut bars = decode_daily_file(&path, market, code)?;

    forward_fill(&mut bars);
    attach_moving_averages(&mut bars);
    bars.retain(|bar| range.contains(bar.date));
    Ok(bars)
}

async fn process_minute_symbol(
    config: &Config,
    market: Market,
    code: &str,
    range: &DateRange,
    storage: &mut Storage,
) -> Result<u64> {
    let path = minute_file_path(&config.tdx_path, market, code);
    let base = decode_minute_file(&path, market, code)?;
    if base.is_empty() {
        debug!("{} has no 5-minute bars", code);
        return Ok(0);
    }

    // The derived tiers are each bucketed straight from the raw 5-minute
    // series; indicators are computed per tier afterwards.
    let mut tiers: Vec<(Timeframe, Vec<MinuteBar>)> = Vec::with_capacity(4);
    for timeframe in Timeframe::derived_minutes() {
        let width = timeframe.bucket_minutes().unwrap();
        tiers.push((timeframe, resample_minutes(&base, width)));
    }
    tiers.insert(0, (Timeframe::Minute5, base));

    let mut rows = 0u64;
    for (timeframe, mut bars) in tiers {
        forward_fill(&mut bars);
        attach_moving_averages(&mut bars);
        bars.retain(|bar| range.contains(bar.date()));
        if bars.is_empty() {
            continue;
        }
        match storage.save_minutes(timeframe, &bars).await {
            Ok(()) => rows += bars.len() as u64,
            Err(err) => error!("Failed to persist {} {} data: {}", code, timeframe, err),
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MovingAverages;

    fn daily(day: u32) -> DailyBar {
        DailyBar {
            code: "000001".to_string(),
            market: Market::Shenzhen,
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: 10.0,
            high: 10.0,
            low: 10.0,
            close: 10.0,
            volume: 1.0,
            amount: 10.0,
            ma: MovingAverages::default(),
        }
    }

    #[test]
    fn test_date_range_is_inclusive_on_both_bounds() {
        let range = DateRange::parse(Some("2024-01-02"), Some("2024-01-02")).unwrap();
        let bars: Vec<DailyBar> = vec![daily(1), daily(2), daily(3)];
        let kept: Vec<&DailyBar> = bars.iter().filter(|b| range.contains(b.date)).collect();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn test_date_range_unbounded_sides() {
        let range = DateRange::parse(None, Some("2024-01-02")).unwrap();
        assert!(range.contains(NaiveDate::from_ymd_opt(2020, 5, 5).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()));

        let open = DateRange::default();
        assert!(open.contains(NaiveDate::from_ymd_opt(1999, 1, 1).unwrap()));
    }

    #[test]
    fn test_date_range_rejects_malformed_input() {
        assert!(DateRange::parse(Some("02/01/2024"), None).is_err());
        assert!(DateRange::parse(None, Some("2024-13-01")).is_err());
    }

    #[test]
    fn test_selection_requires_both_code_and_market() {
        assert!(matches!(
            Selection::from_args(None, None).unwrap(),
            Selection::All
        ));
        assert!(matches!(
            Selection::from_args(Some("000001".to_string()), None).unwrap(),
            Selection::All
        ));
        let single = Selection::from_args(Some("sz000001".to_string()), Some(0)).unwrap();
        match single {
            Selection::Single { market, code } => {
                assert_eq!(market, Market::Shenzhen);
                assert_eq!(code, "000001");
            }
            Selection::All => panic!("expected single selection"),
        }
    }

    #[test]
    fn test_selection_rejects_unknown_market() {
        assert!(Selection::from_args(Some("000001".to_string()), Some(2)).is_err());
    }
}
