pub mod format_date;
pub mod rounding;
