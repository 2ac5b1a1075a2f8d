//! Forgetting curve for dictionaries with historical info.
//!
//! Every recorded occurrence adds `boost_per_use` (plus `valid_word_bonus`
//! for words the main dictionary knows) to the entry's current decayed
//! probability. The stored probability then decays hyperbolically with the
//! time elapsed since the last occurrence.

use crate::probability::{ProbabilityInfo, NOT_A_VALID_TIMESTAMP};
use crate::settings::settings;

/// Levels saturate here; the count keeps growing.
pub const MAX_LEVEL: i32 = 3;

pub fn decay(timestamp: i32, now: i32) -> f64 {
    let elapsed = (i64::from(now) - i64::from(timestamp)).max(0);
    let hours = elapsed as f64 / 3600.0;
    1.0 / (1.0 + hours / settings().history.half_life_hours)
}

/// Probability as seen at `now`. Entries without historical info are flat.
pub fn decayed_probability(info: &ProbabilityInfo, now: i32) -> i32 {
    if !info.has_historical_info() {
        return info.probability;
    }
    (f64::from(info.probability) * decay(info.timestamp, now)).round() as i32
}

/// Applies `count` occurrences at `timestamp` to an existing entry (or a
/// fresh one when `current` is `None`).
pub fn record_occurrences(
    current: Option<&ProbabilityInfo>,
    is_valid: bool,
    count: i32,
    timestamp: i32,
) -> ProbabilityInfo {
    let h = &settings().history;
    let (base, previous_count) = match current {
        Some(info) if info.has_historical_info() => {
            (decayed_probability(info, timestamp), info.count)
        }
        Some(info) => (info.probability.max(0), info.count),
        None => (0, 0),
    };
    let per_use = h.boost_per_use + if is_valid { h.valid_word_bonus } else { 0 };
    let probability = base
        .saturating_add(per_use.saturating_mul(count.max(0)))
        .min(h.max_probability);
    let total = previous_count.saturating_add(count.max(0));
    let timestamp = if timestamp == NOT_A_VALID_TIMESTAMP {
        0
    } else {
        timestamp
    };
    ProbabilityInfo::with_history(probability, timestamp, total.min(MAX_LEVEL), total)
}

/// Whether GC should drop the entry.
pub fn should_discard(info: &ProbabilityInfo, now: i32) -> bool {
    info.has_historical_info() && decayed_probability(info, now) < settings().history.discard_probability
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: i32 = 3600;

    #[test]
    fn decay_halves_after_half_life() {
        let half_life = settings().history.half_life_hours as i32;
        let d = decay(0, half_life * HOUR);
        assert!((d - 0.5).abs() < 1e-9);
        assert!((decay(100, 100) - 1.0).abs() < f64::EPSILON);
        // Clock skew never boosts.
        assert!((decay(1000, 0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn occurrences_accumulate_and_cap() {
        let h = &settings().history;
        let first = record_occurrences(None, false, 1, 10 * HOUR);
        assert_eq!(first.probability, h.boost_per_use);
        assert_eq!(first.count, 1);
        assert_eq!(first.level, 1);
        assert!(first.has_historical_info());

        let second = record_occurrences(Some(&first), true, 1, 10 * HOUR);
        assert_eq!(
            second.probability,
            h.boost_per_use * 2 + h.valid_word_bonus
        );

        let many = record_occurrences(Some(&second), true, 100, 10 * HOUR);
        assert_eq!(many.probability, h.max_probability);
        assert_eq!(many.level, MAX_LEVEL);
        assert_eq!(many.count, 102);
    }

    #[test]
    fn old_entries_are_discarded() {
        let entry = record_occurrences(None, false, 1, 0);
        assert!(!should_discard(&entry, HOUR));
        assert!(should_discard(&entry, 10_000 * HOUR));
        assert!(!should_discard(&ProbabilityInfo::new(1), 10_000 * HOUR));
    }
}
