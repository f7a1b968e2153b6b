use serde::{Deserialize, Serialize};
use std::fmt;

/// Bar-series granularity.
///
/// The closed set the pipeline knows about: daily bars read straight from
/// the vendor's `.day` files, 5-minute bars read from `.lc5` files, and the
/// three coarser minute tiers derived from the 5-minute series. 15/30/60 are
/// never read from a vendor file of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    /// Daily bars
    Daily,
    /// 5-minute bars
    Minute5,
    /// 15-minute bars (derived from 5-minute)
    Minute15,
    /// 30-minute bars (derived from 5-minute)
    Minute30,
    /// 60-minute bars (derived from 5-minute)
    Minute60,
}

impl Timeframe {
    /// Bucket width in minutes, None for the daily tier
    pub fn bucket_minutes(&self) -> Option<u32> {
        match self {
            Timeframe::Daily => None,
            Timeframe::Minute5 => Some(5),
            Timeframe::Minute15 => Some(15),
            Timeframe::Minute30 => Some(30),
            Timeframe::Minute60 => Some(60),
        }
    }

    /// Logical persistence target (database table, CSV file stem)
    pub fn table_name(&self) -> &'static str {
        match self {
            Timeframe::Daily => "daily_data",
            Timeframe::Minute5 => "minute5_data",
            Timeframe::Minute15 => "minute15_data",
            Timeframe::Minute30 => "minute30_data",
            Timeframe::Minute60 => "minute60_data",
        }
    }

    /// The minute tiers derived by resampling the 5-minute series
    pub fn derived_minutes() -> [Timeframe; 3] {
        [Timeframe::Minute15, Timeframe::Minute30, Timeframe::Minute60]
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Timeframe::Daily => "1d",
            Timeframe::Minute5 => "5m",
            Timeframe::Minute15 => "15m",
            Timeframe::Minute30 => "30m",
            Timeframe::Minute60 => "60m",
        };
        write!(f, "{}", label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_minutes() {
        assert_eq!(Timeframe::Daily.bucket_minutes(), None);
        assert_eq!(Timeframe::Minute5.bucket_minutes(), Some(5));
        assert_eq!(Timeframe::Minute60.bucket_minutes(), Some(60));
    }

    #[test]
    fn test_table_names() {
        assert_eq!(Timeframe::Daily.table_name(), "daily_data");
        assert_eq!(Timeframe::Minute15.table_name(), "minute15_data");
    }
}
