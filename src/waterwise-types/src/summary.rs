use serde::{Deserialize, Serialize};

use crate::{DailyAverage, Reading};

/// Display-ready digest of the last week of readings.
///
/// `highest`, `lowest` and `window_label` are `None` when the window holds no
/// readings at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub daily_averages: Vec<DailyAverage>,
    pub highest: Option<Reading>,
    pub lowest: Option<Reading>,
    pub window_label: Option<String>,
}

impl WeeklySummary {
    pub fn is_empty(&self) -> bool {
        self.daily_averages.is_empty()
    }
}
