use std::collections::BTreeMap;

use chrono::{DateTime, Days, FixedOffset, NaiveDate, Utc};
use waterwise_types::{DailyAverage, Reading, WeeklySummary};

use crate::helpers::{format_date::FormatShortDate, rounding::mean_level};

/// Calendar days between "today" and the exclusive lower edge of the window.
const LOOKBACK_DAYS: u64 = 8;

/// The seven calendar days ending yesterday: `start < date <= end`.
///
/// Today is left out because its data is still incomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailingWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TrailingWindow {
    pub fn ending_yesterday(today: NaiveDate) -> Self {
        Self {
            start: today
                .checked_sub_days(Days::new(LOOKBACK_DAYS))
                .unwrap_or(NaiveDate::MIN),
            end: today.checked_sub_days(Days::new(1)).unwrap_or(NaiveDate::MIN),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start < date && date <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extremes {
    pub highest: Reading,
    pub lowest: Reading,
}

/// Single pass over `readings`; on ties the earliest element in iteration
/// order is kept.
pub fn find_extremes<'a, I>(readings: I) -> Option<Extremes>
where
    I: IntoIterator<Item = &'a Reading>,
{
    let mut readings = readings.into_iter();
    let first = *readings.next()?;

    let extremes = readings.fold(
        Extremes {
            highest: first,
            lowest: first,
        },
        |mut acc, reading| {
            if reading.level > acc.highest.level {
                acc.highest = *reading;
            }
            if reading.level < acc.lowest.level {
                acc.lowest = *reading;
            }
            acc
        },
    );

    Some(extremes)
}

/// Per-day rounded mean of `level`, ascending by date.
pub fn daily_averages(readings: &[Reading], offset: &FixedOffset) -> Vec<DailyAverage> {
    let mut by_date: BTreeMap<NaiveDate, Vec<i32>> = BTreeMap::new();
    for reading in readings {
        by_date
            .entry(reading.local_date(offset))
            .or_default()
            .push(reading.level);
    }

    by_date
        .into_iter()
        .filter_map(|(date, levels)| {
            mean_level(&levels).map(|average| DailyAverage { date, average })
        })
        .collect()
}

/// Builds the weekly history digest in a fixed reference timezone.
#[derive(Debug, Clone, Copy)]
pub struct WeeklyHistoryAggregator {
    offset: FixedOffset,
}

impl WeeklyHistoryAggregator {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn window(&self, now: DateTime<Utc>) -> TrailingWindow {
        TrailingWindow::ending_yesterday(now.with_timezone(&self.offset).date_naive())
    }

    pub fn summarize(&self, readings: &[Reading], now: DateTime<Utc>) -> WeeklySummary {
        let window = self.window(now);

        let daily_averages = daily_averages(readings, &self.offset)
            .into_iter()
            .filter(|day| window.contains(day.date))
            .collect::<Vec<_>>();

        let extremes = find_extremes(
            readings
                .iter()
                .filter(|reading| window.contains(reading.local_date(&self.offset))),
        );

        WeeklySummary {
            window_label: window_label(&daily_averages),
            highest: extremes.map(|e| e.highest),
            lowest: extremes.map(|e| e.lowest),
            daily_averages,
        }
    }
}

fn window_label(days: &[DailyAverage]) -> Option<String> {
    let (first, last) = (days.first()?, days.last()?);
    Some(format!(
        "{} - {}",
        first.date.format_short(),
        last.date.format_short()
    ))
}
