use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::market::Market;

/// Moving-average periods attached to every bar, in column order.
pub const MA_PERIODS: [usize; 11] = [5, 10, 13, 21, 34, 55, 60, 89, 144, 233, 250];

/// Trailing simple moving averages of `close`.
///
/// A value is None until the bar has `period - 1` predecessors in its
/// symbol's series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovingAverages {
    pub ma5: Option<f64>,
    pub ma10: Option<f64>,
    pub ma13: Option<f64>,
    pub ma21: Option<f64>,
    pub ma34: Option<f64>,
    pub ma55: Option<f64>,
    pub ma60: Option<f64>,
    pub ma89: Option<f64>,
    pub ma144: Option<f64>,
    pub ma233: Option<f64>,
    pub ma250: Option<f64>,
}

impl MovingAverages {
    pub fn get(&self, period: usize) -> Option<f64> {
        match period {
            5 => self.ma5,
            10 => self.ma10,
            13 => self.ma13,
            21 => self.ma21,
            34 => self.ma34,
            55 => self.ma55,
            60 => self.ma60,
            89 => self.ma89,
            144 => self.ma144,
            233 => self.ma233,
            250 => self.ma250,
            _ => None,
        }
    }

    pub fn set(&mut self, period: usize, value: Option<f64>) {
        match period {
            5 => self.ma5 = value,
            10 => self.ma10 = value,
            13 => self.ma13 = value,
            21 => self.ma21 = value,
            34 => self.ma34 = value,
            55 => self.ma55 = value,
            60 => self.ma60 = value,
            89 => self.ma89 = value,
            144 => self.ma144 = value,
            233 => self.ma233 = value,
            250 => self.ma250 = value,
            _ => {}
        }
    }
}

/// One daily OHLCV observation. Daily bars carry a date only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    /// 6-digit exchange code
    pub code: String,
    pub market: Market,
    /// Trading day, exchange-local
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Traded shares
    pub volume: f64,
    /// Traded value (turnover)
    pub amount: f64,
    pub ma: MovingAverages,
}

/// One intraday OHLCV observation at a minute tier.
///
/// Minute bars are stamped with their closing time in exchange-local,
/// timezone-naive terms: the 09:35 bar covers trades up to 09:35.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinuteBar {
    /// 6-digit exchange code
    pub code: String,
    pub market: Market,
    pub datetime: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub amount: f64,
    pub ma: MovingAverages,
}

impl MinuteBar {
    /// Calendar date of the bar, used for date-range filtering and the
    /// persisted `date` column.
    pub fn date(&self) -> NaiveDate {
        self.datetime.date()
    }
}

/// Field access shared by both bar variants so forward-fill and the
/// moving-average pass are written once.
pub trait OhlcvRecord {
    fn code(&self) -> &str;
    fn close(&self) -> f64;
    /// The six numeric fields in fixed order: open, high, low, close,
    /// volume, amount.
    fn numeric_fields_mut(&mut self) -> [&mut f64; 6];
    fn ma_mut(&mut self) -> &mut MovingAverages;
}

impl OhlcvRecord for DailyBar {
    fn code(&self) -> &str {
        &self.code
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn numeric_fields_mut(&mut self) -> [&mut f64; 6] {
        [
            &mut self.open,
            &mut self.high,
            &mut self.low,
            &mut self.close,
            &mut self.volume,
            &mut self.amount,
        ]
    }

    fn ma_mut(&mut self) -> &mut MovingAverages {
        &mut self.ma
    }
}

impl OhlcvRecord for MinuteBar {
    fn code(&self) -> &str {
        &self.code
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn numeric_fields_mut(&mut self) -> [&mut f64; 6] {
        [
            &mut self.open,
            &mut self.high,
            &mut self.low,
            &mut self.close,
            &mut self.volume,
            &mut self.amount,
        ]
    }

    fn ma_mut(&mut self) -> &mut MovingAverages {
        &mut self.ma
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_averages_get_set() {
        let mut ma = MovingAverages::default();
        for period in MA_PERIODS {
            assert_eq!(ma.get(period), None);
        }
        ma.set(13, Some(9.5));
        assert_eq!(ma.get(13), Some(9.5));
        assert_eq!(ma.ma13, Some(9.5));
        ma.set(13, None);
        assert_eq!(ma.get(13), None);
    }
}
