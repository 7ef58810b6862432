use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One moisture observation as stored by the field device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reading {
    pub time: DateTime<Utc>,
    pub level: i32,
}

impl Reading {
    pub fn new(time: DateTime<Utc>, level: i32) -> Self {
        Self { time, level }
    }

    /// Calendar date of the reading as seen from `offset`.
    pub fn local_date(&self, offset: &FixedOffset) -> NaiveDate {
        self.time.with_timezone(offset).date_naive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyAverage {
    pub date: NaiveDate,
    pub average: i32,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn local_date_crosses_midnight() {
        let jakarta = FixedOffset::east_opt(7 * 3600).unwrap();
        // 18:30 UTC is already the next day in UTC+7
        let reading = Reading::new(Utc.with_ymd_and_hms(2024, 6, 1, 18, 30, 0).unwrap(), 42);

        assert_eq!(
            reading.local_date(&jakarta),
            NaiveDate::from_ymd_opt(2024, 6, 2).unwrap()
        );
        assert_eq!(
            reading.local_date(&FixedOffset::east_opt(0).unwrap()),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
    }

    #[test]
    fn reading_serializes_as_rfc3339() {
        let reading = Reading::new(Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(), 15);
        let json = serde_json::to_value(reading).unwrap();
        assert_eq!(json["time"], "2024-06-01T08:00:00Z");
        assert_eq!(json["level"], 15);
    }
}
