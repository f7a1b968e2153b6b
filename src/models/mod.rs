mod bar;
mod market;
mod timeframe;
pub mod indicators;

pub use bar::{DailyBar, MinuteBar, MovingAverages, OhlcvRecord, MA_PERIODS};
pub use market::Market;
pub use timeframe::Timeframe;

/// Chronological daily series for one or more symbols
pub type DailySeries = Vec<DailyBar>;

/// Chronological intraday series at one minute tier
pub type MinuteSeries = Vec<MinuteBar>;
