use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Colour band the dashboard paints the moisture gauge with.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Band {
    Low,
    Medium,
    High,
}

impl Band {
    pub fn color(self) -> &'static str {
        match self {
            Band::Low => "#ff0000",
            Band::Medium => "#ffa500",
            Band::High => "#24b328",
        }
    }

    /// Legend text shown under the gauge.
    pub fn range_label(self) -> &'static str {
        match self {
            Band::Low => "< 20%",
            Band::Medium => "20 - 30%",
            Band::High => "> 30%",
        }
    }
}

/// State reported on the relay topic.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum PumpStatus {
    #[strum(serialize = "ON")]
    On,
    #[default]
    #[strum(serialize = "OFF")]
    Off,
    #[strum(default)]
    Other(String),
}

impl fmt::Display for PumpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PumpStatus::On => f.write_str("ON"),
            PumpStatus::Off => f.write_str("OFF"),
            PumpStatus::Other(raw) => f.write_str(raw),
        }
    }
}
