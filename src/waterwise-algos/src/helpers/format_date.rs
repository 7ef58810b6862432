use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

/// Short US-style labels: `Jun 1` for dates, `Jun 1, 08:00:00 AM` for
/// date-times.
pub trait FormatShortDate {
    fn format_short(&self) -> String;
}

impl FormatShortDate for NaiveDate {
    fn format_short(&self) -> String {
        self.format("%b %-d").to_string()
    }
}

impl FormatShortDate for NaiveDateTime {
    fn format_short(&self) -> String {
        self.format("%b %-d, %I:%M:%S %p").to_string()
    }
}

impl FormatShortDate for DateTime<FixedOffset> {
    fn format_short(&self) -> String {
        self.naive_local().format_short()
    }
}
