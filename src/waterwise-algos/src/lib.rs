pub(crate) mod weekly;
pub use weekly::{Extremes, TrailingWindow, WeeklyHistoryAggregator, daily_averages, find_extremes};

pub(crate) mod band;
pub use band::{HIGH_THRESHOLD, LOW_THRESHOLD, classify};

pub mod helpers;
