/// Integer mean of `count` values summing to `sum`, rounded half away from zero.
///
/// Returns `None` for an empty set.
pub fn rounded_mean(sum: i64, count: usize) -> Option<i64> {
    if count == 0 {
        return None;
    }

    let count = count as u128;
    let magnitude = (u128::from(sum.unsigned_abs()) * 2 + count) / (count * 2);
    let magnitude = i64::try_from(magnitude).unwrap_or(i64::MAX);

    if sum < 0 {
        Some(-magnitude)
    } else {
        Some(magnitude)
    }
}

pub fn mean_level(levels: &[i32]) -> Option<i32> {
    let sum = levels.iter().map(|level| i64::from(*level)).sum::<i64>();
    rounded_mean(sum, levels.len()).map(|mean| i32::try_from(mean).unwrap_or(i32::MAX))
}
