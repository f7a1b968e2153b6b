//! Moving-average computation over bar series
//!
//! Indicators are attached after a series is fully assembled (decoded, and
//! for the derived minute tiers, aggregated). Missing numeric inputs are
//! forward-filled first, so a filled close participates in the windows like
//! a real observation. A "missing" value in a decoded series is a non-finite
//! float: the vendor's packed f32 fields can carry NaN through corrupt
//! records, and the fill keeps those from poisoning every window they touch.

use std::collections::HashMap;

use super::bar::{OhlcvRecord, MA_PERIODS};

/// Calculate Simple Moving Average for a given period
///
/// # Arguments
/// * `closes` - Slice of closing prices
/// * `period` - Period for the moving average (e.g., 5, 13, 250)
///
/// # Returns
/// * Vector of MA values (entries before the window fills are 0.0)
pub fn calculate_sma(closes: &[f64], period: usize) -> Vec<f64> {
    let mut ma_values = vec![0.0; closes.len()];

    if period == 0 || closes.len() < period {
        return ma_values;
    }

    for i in (period - 1)..closes.len() {
        let start_idx = i + 1 - period;
        let sum: f64 = closes[start_idx..=i].iter().sum();
        ma_values[i] = sum / period as f64;
    }

    ma_values
}

/// Replace non-finite numeric fields with the most recent finite value seen
/// for the same field and symbol. Leading gaps with no prior value are left
/// as-is.
pub fn forward_fill<B: OhlcvRecord>(bars: &mut [B]) {
    let mut last_seen: HashMap<String, [Option<f64>; 6]> = HashMap::new();

    for bar in bars.iter_mut() {
        let code = bar.code().to_string();
        let last = last_seen.entry(code).or_insert([None; 6]);
        for (field, prev) in bar.numeric_fields_mut().into_iter().zip(last.iter_mut()) {
            if field.is_finite() {
                *prev = Some(*field);
            } else if let Some(value) = *prev {
                *field = value;
            }
        }
    }
}

/// Attach the full set of trailing moving averages to every bar.
///
/// Bars are grouped by symbol first, preserving input order within each
/// group, so a batch holding several interleaved symbols never mixes their
/// windows. A bar's value for a period stays None until `period` bars of
/// that symbol exist.
pub fn attach_moving_averages<B: OhlcvRecord>(bars: &mut [B]) {
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, bar) in bars.iter().enumerate() {
        groups.entry(bar.code().to_string()).or_default().push(idx);
    }

    for indices in groups.values() {
        let closes: Vec<f64> = indices.iter().map(|&i| bars[i].close()).collect();
        for period in MA_PERIODS {
            let ma_values = calculate_sma(&closes, period);
            for (pos, &idx) in indices.iter().enumerate() {
                if pos + 1 >= period {
                    bars[idx].ma_mut().set(period, Some(ma_values[pos]));
                }
            }
        }
    }
}
