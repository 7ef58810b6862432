use waterwise_types::Band;

/// Levels strictly below this are [`Band::Low`].
pub const LOW_THRESHOLD: i32 = 20;

/// Levels strictly above this are [`Band::High`].
pub const HIGH_THRESHOLD: i32 = 30;

pub fn classify(level: i32) -> Band {
    if level < LOW_THRESHOLD {
        Band::Low
    } else if level <= HIGH_THRESHOLD {
        Band::Medium
    } else {
        Band::High
    }
}
