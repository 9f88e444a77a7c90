//! Training examples derived from a completion history.

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::habit::CompletionHistory;

/// Minutes in a day; labels live in `0..MINUTES_PER_DAY`.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Number of features per example.
pub const FEATURE_COUNT: usize = 3;

/// (day-of-week, hour, minute) of a completion. Day-of-week is 0 = Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub day_of_week: u8,
    pub hour: u8,
    pub minute: u8,
}

impl FeatureVector {
    pub fn of(instant: NaiveDateTime) -> Self {
        Self {
            day_of_week: instant.weekday().num_days_from_monday() as u8,
            hour: instant.hour() as u8,
            minute: instant.minute() as u8,
        }
    }

    pub fn values(&self) -> [f64; FEATURE_COUNT] {
        [
            f64::from(self.day_of_week),
            f64::from(self.hour),
            f64::from(self.minute),
        ]
    }
}

/// One (features of previous completion, time of next completion) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub features: FeatureVector,
    /// Minutes since midnight of the following completion.
    pub label: u32,
}

pub fn minutes_since_midnight(instant: NaiveDateTime) -> u32 {
    instant.hour() * 60 + instant.minute()
}

/// One example per consecutive pair of completions.
///
/// Histories shorter than two entries yield no examples.
pub fn prepare_features(history: &CompletionHistory) -> Vec<TrainingExample> {
    history
        .as_slice()
        .windows(2)
        .map(|pair| TrainingExample {
            features: FeatureVector::of(pair[0]),
            label: minutes_since_midnight(pair[1]),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn monday_is_zero() {
        // 2024-01-01 was a Monday
        assert_eq!(FeatureVector::of(at(2024, 1, 1, 9, 0)).day_of_week, 0);
        assert_eq!(FeatureVector::of(at(2024, 1, 7, 9, 0)).day_of_week, 6);
    }

    #[test]
    fn too_short_history_has_no_examples() {
        assert!(prepare_features(&CompletionHistory::new()).is_empty());
        let one: CompletionHistory = vec![at(2024, 1, 1, 8, 0)].into();
        assert!(prepare_features(&one).is_empty());
    }

    #[test]
    fn pairs_previous_features_with_next_label() {
        let history: CompletionHistory =
            vec![at(2024, 1, 1, 7, 45), at(2024, 1, 2, 8, 10), at(2024, 1, 3, 23, 59)].into();
        let examples = prepare_features(&history);

        assert_eq!(examples.len(), 2);
        assert_eq!(
            examples[0],
            TrainingExample {
                features: FeatureVector { day_of_week: 0, hour: 7, minute: 45 },
                label: 8 * 60 + 10,
            }
        );
        assert_eq!(examples[1].features.day_of_week, 1);
        assert_eq!(examples[1].label, 1439);
    }

    proptest! {
        #[test]
        fn one_example_per_consecutive_pair(
            offsets in proptest::collection::vec(0i64..60 * 24 * 365, 2..40)
        ) {
            let base = at(2023, 1, 1, 0, 0);
            let history: CompletionHistory = offsets
                .iter()
                .map(|m| base + chrono::Duration::minutes(*m))
                .collect();

            let examples = prepare_features(&history);
            prop_assert_eq!(examples.len(), history.len() - 1);
            for ex in &examples {
                prop_assert!(ex.label < MINUTES_PER_DAY);
                prop_assert!(ex.features.day_of_week <= 6);
                prop_assert!(ex.features.hour <= 23);
                prop_assert!(ex.features.minute <= 59);
            }
        }
    }
}
