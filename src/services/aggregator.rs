//! Resampling of 5-minute bars into coarser minute tiers
//!
//! One parameterized pass handles every target width; the pipeline invokes
//! it three times (15/30/60) over the same 5-minute input, so each tier is
//! bucketed directly from the source series rather than cascaded.

use std::collections::HashMap;

use chrono::{NaiveDateTime, Timelike};
use tracing::debug;

use crate::models::{MinuteBar, MovingAverages};

/// Resample one symbol's chronologically ordered 5-minute series into
/// fixed-width, wall-clock-aligned buckets.
///
/// Aggregation per bucket: open = first bar's open, high = max, low = min,
/// close = last bar's close, volume and amount are summed. Buckets that
/// receive no input bars produce no output row, and an empty input yields
/// an empty output.
///
/// # Arguments
/// * `bars` - Source series, one symbol, ascending by timestamp
/// * `bucket_minutes` - Target width (15, 30 or 60); must divide 60
pub fn resample_minutes(bars: &[MinuteBar], bucket_minutes: u32) -> Vec<MinuteBar> {
    if bars.is_empty() {
        return vec![];
    }

    // Group bars by bucket start time
    let mut buckets: HashMap<NaiveDateTime, Vec<&MinuteBar>> = HashMap::new();
    for bar in bars {
        buckets
            .entry(bucket_start(bar.datetime, bucket_minutes))
            .or_default()
            .push(bar);
    }

    let mut result: Vec<MinuteBar> = buckets
        .into_iter()
        .map(|(bucket_time, records)| aggregate_ohlcv(&records, bucket_time))
        .collect();

    result.sort_by_key(|bar| bar.datetime);

    debug!(
        "Resampled {} bars into {} {}-minute buckets",
        bars.len(),
        result.len(),
        bucket_minutes
    );
    result
}

/// Start of the bucket a bar belongs to.
///
/// Vendor minute bars are stamped with their closing time, so a bar landing
/// exactly on a boundary belongs to the window it closes: with 15-minute
/// buckets a 09:45 bar falls into the bucket starting 09:30, while a 09:50
/// bar opens the bucket at 09:45.
fn bucket_start(time: NaiveDateTime, bucket_minutes: u32) -> NaiveDateTime {
    let minute_of_day = time.hour() * 60 + time.minute();
    let shifted = minute_of_day.saturating_sub(1);
    let start = (shifted / bucket_minutes) * bucket_minutes;

    time.date().and_hms_opt(start / 60, start % 60, 0).unwrap()
}

fn aggregate_ohlcv(records: &[&MinuteBar], bucket_time: NaiveDateTime) -> MinuteBar {
    let first = records[0];
    let last = records[records.len() - 1];

    let high = records.iter().map(|r| r.high).fold(f64::NEG_INFINITY, f64::max);
    let low = records.iter().map(|r| r.low).fold(f64::INFINITY, f64::min);
    let volume = records.iter().map(|r| r.volume).sum();
    let amount = records.iter().map(|r| r.amount).sum();

    MinuteBar {
        code: first.code.clone(),
        market: first.market,
        datetime: bucket_time,
        open: first.open,
        high,
        low,
        close: last.close,
        volume,
        amount,
        // Indicators are attached after aggregation
        ma: MovingAverages::default(),
    }
}
