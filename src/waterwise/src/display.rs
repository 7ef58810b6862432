//! Text and JSON renderings of the two dashboard views.

use std::fmt::{self, Display};

use chrono::FixedOffset;
use serde::Serialize;
use serde_json::json;
use strum::IntoEnumIterator;
use waterwise_algos::{classify, helpers::format_date::FormatShortDate};
use waterwise_types::{Band, PumpStatus, Reading, WeeklySummary};

use crate::ConnectionState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorView {
    Loading,
    Live {
        moisture: i32,
        band: Band,
        pump: PumpStatus,
    },
}

impl MonitorView {
    pub fn new(state: ConnectionState, moisture: i32, pump: PumpStatus) -> Self {
        match state {
            ConnectionState::Connected => Self::Live {
                moisture,
                band: classify(moisture),
                pump,
            },
            ConnectionState::Connecting | ConnectionState::Disconnected => Self::Loading,
        }
    }
}

impl Display for MonitorView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorView::Loading => writeln!(f, "Current Moisture Level: connecting...")?,
            MonitorView::Live {
                moisture,
                band,
                pump,
            } => {
                writeln!(
                    f,
                    "Current Moisture Level: {moisture}% ({band}, {})",
                    band.color()
                )?;
                writeln!(f, "Water Pump Status: {pump}")?;
            }
        }

        let legend = Band::iter()
            .map(|band| format!("{band} {}", band.range_label()))
            .collect::<Vec<_>>();
        write!(f, "{}", legend.join(" | "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryView {
    Loading,
    Ready(WeeklySummary),
}

/// Series handed to a line chart: one label and one value per day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub data: Vec<i32>,
    pub legend: Vec<String>,
}

impl ChartData {
    pub const LEGEND: &'static str = "Average Moisture Level";
}

impl From<&WeeklySummary> for ChartData {
    fn from(summary: &WeeklySummary) -> Self {
        Self {
            labels: summary
                .daily_averages
                .iter()
                .map(|day| day.date.format_short())
                .collect(),
            data: summary.daily_averages.iter().map(|day| day.average).collect(),
            legend: vec![Self::LEGEND.to_string()],
        }
    }
}

pub struct HistoryReport<'a> {
    summary: &'a WeeklySummary,
    offset: FixedOffset,
}

impl<'a> HistoryReport<'a> {
    pub fn new(summary: &'a WeeklySummary, offset: FixedOffset) -> Self {
        Self { summary, offset }
    }

    fn reading_label(&self, reading: &Reading) -> String {
        format!(
            "{}% on {}",
            reading.level,
            reading.time.with_timezone(&self.offset).format_short()
        )
    }

    pub fn to_json(&self) -> serde_json::Value {
        let extreme = |reading: Option<Reading>| {
            reading.map(|reading| {
                json!({
                    "level": reading.level,
                    "time": reading.time.with_timezone(&self.offset).to_rfc3339(),
                    "label": self.reading_label(&reading),
                })
            })
        };

        json!({
            "window": self.summary.window_label,
            "chart": ChartData::from(self.summary),
            "daily_averages": self.summary.daily_averages,
            "highest": extreme(self.summary.highest),
            "lowest": extreme(self.summary.lowest),
        })
    }
}

impl Display for HistoryReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Weekly History")?;

        let Some(window) = &self.summary.window_label else {
            return write!(f, "No readings in the last 7 days");
        };
        writeln!(f, "{window}")?;

        let chart = ChartData::from(self.summary);
        for (label, average) in chart.labels.iter().zip(&chart.data) {
            let bar = "#".repeat((average.clamp(&0, &100) / 2) as usize);
            writeln!(f, "  {label:<7} {average:>3}% {bar}")?;
        }

        if let Some(highest) = &self.summary.highest {
            writeln!(f, "Highest Level: {}", self.reading_label(highest))?;
        }
        if let Some(lowest) = &self.summary.lowest {
            write!(f, "Lowest Level: {}", self.reading_label(lowest))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use waterwise_types::DailyAverage;

    use super::*;

    fn jakarta() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn summary() -> WeeklySummary {
        WeeklySummary {
            daily_averages: vec![
                DailyAverage {
                    date: NaiveDate::from_ymd_opt(2024, 6, 5).unwrap(),
                    average: 20,
                },
                DailyAverage {
                    date: NaiveDate::from_ymd_opt(2024, 6, 6).unwrap(),
                    average: 40,
                },
            ],
            highest: Some(Reading::new(
                Utc.with_ymd_and_hms(2024, 6, 6, 5, 0, 0).unwrap(),
                40,
            )),
            lowest: Some(Reading::new(
                Utc.with_ymd_and_hms(2024, 6, 5, 1, 0, 0).unwrap(),
                15,
            )),
            window_label: Some("Jun 5 - Jun 6".into()),
        }
    }

    #[test]
    fn chart_data_from_summary() {
        let chart = ChartData::from(&summary());
        assert_eq!(chart.labels, vec!["Jun 5", "Jun 6"]);
        assert_eq!(chart.data, vec![20, 40]);
        assert_eq!(chart.legend, vec![ChartData::LEGEND]);
    }

    #[test]
    fn history_report_text() {
        let summary = summary();
        let text = HistoryReport::new(&summary, jakarta()).to_string();

        assert_eq!(
            text,
            "Weekly History\n\
             Jun 5 - Jun 6\n  \
             Jun 5    20% ##########\n  \
             Jun 6    40% ####################\n\
             Highest Level: 40% on Jun 6, 12:00:00 PM\n\
             Lowest Level: 15% on Jun 5, 08:00:00 AM"
        );
    }

    #[test]
    fn history_report_empty() {
        let summary = WeeklySummary::default();
        let text = HistoryReport::new(&summary, jakarta()).to_string();
        assert_eq!(text, "Weekly History\nNo readings in the last 7 days");
    }

    #[test]
    fn history_report_json() {
        let summary = summary();
        let json = HistoryReport::new(&summary, jakarta()).to_json();

        assert_eq!(json["window"], "Jun 5 - Jun 6");
        assert_eq!(json["chart"]["data"], json!([20, 40]));
        assert_eq!(json["highest"]["level"], 40);
        assert_eq!(json["highest"]["time"], "2024-06-06T12:00:00+07:00");
        assert_eq!(json["lowest"]["label"], "15% on Jun 5, 08:00:00 AM");
        assert_eq!(json["daily_averages"][0]["date"], "2024-06-05");
    }

    #[test]
    fn monitor_view_text() {
        let view = MonitorView::new(ConnectionState::Connected, 25, PumpStatus::On);
        assert_eq!(
            view.to_string(),
            "Current Moisture Level: 25% (medium, #ffa500)\n\
             Water Pump Status: ON\n\
             low < 20% | medium 20 - 30% | high > 30%"
        );

        let view = MonitorView::new(ConnectionState::Connecting, 25, PumpStatus::On);
        assert!(view.to_string().starts_with("Current Moisture Level: connecting..."));
    }
}
