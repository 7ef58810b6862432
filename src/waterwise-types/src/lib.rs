pub mod reading;
pub use reading::{DailyAverage, Reading};

pub mod live;
pub use live::{Band, PumpStatus};

pub mod summary;
pub use summary::WeeklySummary;
