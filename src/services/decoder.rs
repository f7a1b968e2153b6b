//! Vendor binary bar-file decoding
//!
//! The terminal stores bars as fixed 32-byte little-endian records, one file
//! per symbol and frequency, in chronological order:
//!
//! - daily (`vipdoc/{sz,sh}/lday/*.day`): date as a literal YYYYMMDD u32,
//!   OHLC as u32 price*100, amount as f32, volume as u32;
//! - 5-minute (`vipdoc/{sz,sh}/fzline/*.lc5`): a packed u16 date
//!   (`(year-2004)*2048 + month*100 + day`), a u16 counting minutes from
//!   midnight, OHLC and amount as f32, volume as u32.
//!
//! The `.lc5` time field is minutes-from-midnight; the older plain minute
//! formats store a literal HHMM and are not handled here.
//!
//! Decoding is a pure bytes-to-bars transformation. A trailing partial
//! record (truncated download) is dropped without error; the decoder does
//! not validate OHLC ordering or sign of volume, so malformed upstream
//! values pass through unchanged.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::error::{AppError, Result};
use crate::models::{DailyBar, Market, MinuteBar, MovingAverages};

/// Every record in both formats is 32 bytes
pub const RECORD_SIZE: usize = 32;

fn le_u16(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

fn le_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn le_f32(bytes: &[u8]) -> f32 {
    f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Strip an exchange-qualified code (`sz000001`) down to its 6-digit core.
pub fn normalize_code(code: &str) -> &str {
    if code.len() > 6 {
        code.get(code.len() - 6..).unwrap_or(code)
    } else {
        code
    }
}

/// Path of a symbol's daily bar file under the terminal's data root
pub fn daily_file_path(tdx_path: &Path, market: Market, code: &str) -> PathBuf {
    let folder = market.folder();
    tdx_path
        .join("vipdoc")
        .join(folder)
        .join("lday")
        .join(format!("{}{}.day", folder, normalize_code(code)))
}

/// Path of a symbol's 5-minute bar file under the terminal's data root
pub fn minute_file_path(tdx_path: &Path, market: Market, code: &str) -> PathBuf {
    let folder = market.folder();
    tdx_path
        .join("vipdoc")
        .join(folder)
        .join("fzline")
        .join(format!("{}{}.lc5", folder, normalize_code(code)))
}

fn read_records(path: &Path, kind: &str) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(AppError::NotFound(format!(
            "{} bar file does not exist: {}",
            kind,
            path.display()
        )));
    }
    Ok(fs::read(path)?)
}

/// Decode one symbol's daily bar file.
///
/// Returns the bars in file order (chronological). A zero-length file
/// yields an empty series; a trailing partial record is ignored.
pub fn decode_daily_file(path: &Path, market: Market, code: &str) -> Result<Vec<DailyBar>> {
    let content = read_records(path, "daily")?;
    let code = normalize_code(code);

    let mut bars = Vec::with_capacity(content.len() / RECORD_SIZE);
    for record in content.chunks_exact(RECORD_SIZE) {
        let raw_date = le_u32(&record[0..4]);
        let year = raw_date / 10_000;
        let month = (raw_date % 10_000) / 100;
        let day = raw_date % 100;
        let date = NaiveDate::from_ymd_opt(year as i32, month, day).ok_or_else(|| {
            AppError::Decode(format!(
                "invalid date {} in {}",
                raw_date,
                path.display()
            ))
        })?;

        bars.push(DailyBar {
            code: code.to_string(),
            market,
            date,
            open: le_u32(&record[4..8]) as f64 / 100.0,
            high: le_u32(&record[8..12]) as f64 / 100.0,
            low: le_u32(&record[12..16]) as f64 / 100.0,
            close: le_u32(&record[16..20]) as f64 / 100.0,
            amount: le_f32(&record[20..24]) as f64,
            volume: le_u32(&record[24..28]) as f64,
            ma: MovingAverages::default(),
        });
    }

    debug!("Decoded {} daily bars from {}", bars.len(), path.display());
    Ok(bars)
}

/// Decode one symbol's 5-minute bar file.
pub fn decode_minute_file(path: &Path, market: Market, code: &str) -> Result<Vec<MinuteBar>> {
    let content = read_records(path, "5-minute")?;
    let code = normalize_code(code);

    let mut bars = Vec::with_capacity(content.len() / RECORD_SIZE);
    for record in content.chunks_exact(RECORD_SIZE) {
        let raw_date = le_u16(&record[0..2]);
        let raw_time = le_u16(&record[2..4]);
        let datetime = unpack_minute_timestamp(raw_date, raw_time).ok_or_else(|| {
            AppError::Decode(format!(
                "invalid timestamp ({}, {}) in {}",
                raw_date,
                raw_time,
                path.display()
            ))
        })?;

        bars.push(MinuteBar {
            code: code.to_string(),
            market,
            datetime,
            open: le_f32(&record[4..8]) as f64,
            high: le_f32(&record[8..12]) as f64,
            low: le_f32(&record[12..16]) as f64,
            close: le_f32(&record[16..20]) as f64,
            amount: le_f32(&record[20..24]) as f64,
            volume: le_u32(&record[24..28]) as f64,
            ma: MovingAverages::default(),
        });
    }

    debug!(
        "Decoded {} 5-minute bars from {}",
        bars.len(),
        path.display()
    );
    Ok(bars)
}

fn unpack_minute_timestamp(raw_date: u16, raw_time: u16) -> Option<NaiveDateTime> {
    let year = (raw_date >> 11) as i32 + 2004;
    let month = (raw_date as u32 % 2048) / 100;
    let day = (raw_date as u32 % 2048) % 100;
    let hour = raw_time as u32 / 60;
    let minute = raw_time as u32 % 60;
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn daily_record(date: u32, open: u32, high: u32, low: u32, close: u32, amount: f32, volume: u32) -> Vec<u8> {
        let mut record = Vec::with_capacity(RECORD_SIZE);
        record.extend_from_slice(&date.to_le_bytes());
        record.extend_from_slice(&open.to_le_bytes());
        record.extend_from_slice(&high.to_le_bytes());
        record.extend_from_slice(&low.to_le_bytes());
        record.extend_from_slice(&close.to_le_bytes());
        record.extend_from_slice(&amount.to_le_bytes());
        record.extend_from_slice(&volume.to_le_bytes());
        record.extend_from_slice(&0u32.to_le_bytes());
        record
    }

    fn minute_record(date: u16, time: u16, prices: [f32; 4], amount: f32, volume: u32) -> Vec<u8> {
        let mut record = Vec::with_capacity(RECORD_SIZE);
        record.extend_from_slice(&date.to_le_bytes());
        record.extend_from_slice(&time.to_le_bytes());
        for price in prices {
            record.extend_from_slice(&price.to_le_bytes());
        }
        record.extend_from_slice(&amount.to_le_bytes());
        record.extend_from_slice(&volume.to_le_bytes());
        record.extend_from_slice(&0u32.to_le_bytes());
        record
    }

    /// (2024-2004)*2048 + month*100 + day
    fn pack_date(year: u16, month: u16, day: u16) -> u16 {
        (year - 2004) * 2048 + month * 100 + day
    }

    #[test]
    fn test_decode_daily_scaling() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sz000001.day");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&daily_record(20240102, 1051, 1072, 1043, 1066, 1_500_000.0, 123_456))
            .unwrap();

        let bars = decode_daily_file(&path, Market::Shenzhen, "sz000001").unwrap();
        assert_eq!(bars.len(), 1);
        let bar = &bars[0];
        assert_eq!(bar.code, "000001");
        assert_eq!(bar.date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bar.open, 10.51);
        assert_eq!(bar.high, 10.72);
        assert_eq!(bar.low, 10.43);
        assert_eq!(bar.close, 10.66);
        assert_eq!(bar.volume, 123_456.0);
        assert_eq!(bar.amount, 1_500_000.0);
        assert_eq!(bar.ma, MovingAverages::default());
    }

    #[test]
    fn test_decode_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sh600519.day");
        let mut bytes = daily_record(20240102, 170_000, 171_500, 169_000, 171_000, 9.9e8, 55_000);
        bytes.extend(daily_record(20240103, 171_000, 172_000, 170_500, 171_800, 8.1e8, 43_000));
        std::fs::write(&path, &bytes).unwrap();

        let first = decode_daily_file(&path, Market::Shanghai, "600519").unwrap();
        let second = decode_daily_file(&path, Market::Shanghai, "600519").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_truncated_file_yields_complete_records_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sz000001.day");
        let mut bytes = daily_record(20240102, 1000, 1010, 990, 1005, 1.0e6, 1000);
        bytes.extend_from_slice(&[0u8; 17]); // partial second record
        std::fs::write(&path, &bytes).unwrap();

        let bars = decode_daily_file(&path, Market::Shenzhen, "000001").unwrap();
        assert_eq!(bars.len(), 1);
    }

    #[test]
    fn test_empty_file_yields_empty_series() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sz000001.day");
        std::fs::write(&path, b"").unwrap();

        let bars = decode_daily_file(&path, Market::Shenzhen, "000001").unwrap();
        assert!(bars.is_empty());
    }

    #[test]
    fn test_missing_file_is_not_found_naming_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sz000404.day");
        let err = decode_daily_file(&path, Market::Shenzhen, "000404").unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("sz000404.day"));
    }

    #[test]
    fn test_decode_minute_timestamp_convention() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sz000001.lc5");
        // 09:35 is 575 minutes from midnight
        let bytes = minute_record(
            pack_date(2024, 1, 2),
            575,
            [10.0, 10.2, 9.9, 10.1],
            25_000.0,
            2_400,
        );
        std::fs::write(&path, &bytes).unwrap();

        let bars = decode_minute_file(&path, Market::Shenzhen, "000001").unwrap();
        assert_eq!(bars.len(), 1);
        let bar = &bars[0];
        assert_eq!(
            bar.datetime,
            NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(9, 35, 0)
                .unwrap()
        );
        assert_eq!(bar.open, 10.0);
        assert_eq!(bar.close, 10.1f32 as f64); // exact f32 widening
        assert_eq!(bar.volume, 2_400.0);
    }

    #[test]
    fn test_decode_minute_permissive_values() {
        // Inverted OHLC passes through untouched.
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sh600000.lc5");
        let bytes = minute_record(
            pack_date(2020, 6, 15),
            600,
            [9.0, 8.0, 9.5, 8.5],
            0.0,
            0,
        );
        std::fs::write(&path, &bytes).unwrap();

        let bars = decode_minute_file(&path, Market::Shanghai, "600000").unwrap();
        assert_eq!(bars[0].high, 8.0);
        assert_eq!(bars[0].low, 9.5);
    }

    #[test]
    fn test_invalid_packed_date_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sz000001.lc5");
        // month 13 cannot exist
        let bytes = minute_record(20 * 2048 + 13 * 100 + 1, 575, [1.0; 4], 0.0, 0);
        std::fs::write(&path, &bytes).unwrap();

        let err = decode_minute_file(&path, Market::Shenzhen, "000001").unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[test]
    fn test_file_paths() {
        let root = Path::new("/data/tdx");
        assert_eq!(
            daily_file_path(root, Market::Shenzhen, "000001"),
            Path::new("/data/tdx/vipdoc/sz/lday/sz000001.day")
        );
        assert_eq!(
            minute_file_path(root, Market::Shanghai, "sh600519"),
            Path::new("/data/tdx/vipdoc/sh/fzline/sh600519.lc5")
        );
    }
}
