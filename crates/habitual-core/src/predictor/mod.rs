//! Per-habit time-of-day prediction.
//!
//! A [`TimePredictor`] turns a habit's [`CompletionHistory`] into training
//! examples (see [`prepare_features`]) and fits a [`RandomForest`] that maps
//! the day-of-week, hour and minute of one completion to the
//! minutes-since-midnight of the next. Training returns a
//! [`TrainedPredictor`], so a prediction can never be requested from an
//! unfitted model.
//!
//! ## Usage
//!
//! ```ignore
//! let predictor = TimePredictor::default();
//! if let Some(trained) = predictor.train(&history) {
//!     let next = trained.predict_next(history.last().unwrap());
//! }
//! ```

mod features;
mod forest;

pub use features::{
    minutes_since_midnight, prepare_features, FeatureVector, TrainingExample, FEATURE_COUNT,
    MINUTES_PER_DAY,
};
pub use forest::{ForestParams, RandomForest, RegressionTree};

use chrono::{Days, NaiveDateTime, NaiveTime};

use crate::habit::CompletionHistory;

/// Fewest examples a model is fitted on (three completions).
pub const MIN_TRAINING_EXAMPLES: usize = 2;

/// Fits per-habit models.
#[derive(Debug, Clone, Default)]
pub struct TimePredictor {
    params: ForestParams,
}

impl TimePredictor {
    pub fn new(params: ForestParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Fit a model on `history`.
    ///
    /// Returns `None` when fewer than [`MIN_TRAINING_EXAMPLES`] examples
    /// exist, i.e. for histories of length 0, 1 or 2.
    pub fn train(&self, history: &CompletionHistory) -> Option<TrainedPredictor> {
        let examples = prepare_features(history);
        if examples.len() < MIN_TRAINING_EXAMPLES {
            tracing::debug!(
                completions = history.len(),
                "not enough history to train a predictor"
            );
            return None;
        }

        let samples: Vec<_> = examples.iter().map(|ex| ex.features.values()).collect();
        let targets: Vec<_> = examples.iter().map(|ex| f64::from(ex.label)).collect();
        let model = RandomForest::fit(&samples, &targets, &self.params)?;

        tracing::debug!(
            examples = examples.len(),
            trees = model.n_trees(),
            "trained time-of-day predictor"
        );
        Some(TrainedPredictor {
            model,
            example_count: examples.len(),
        })
    }
}

/// A fitted model for one habit.
#[derive(Debug, Clone)]
pub struct TrainedPredictor {
    model: RandomForest,
    example_count: usize,
}

impl TrainedPredictor {
    pub fn example_count(&self) -> usize {
        self.example_count
    }

    /// Predicted minutes-since-midnight, clamped to `[0, 1439]`.
    pub fn predict_minutes(&self, features: FeatureVector) -> f64 {
        let raw = self.model.predict(&features.values());
        raw.clamp(0.0, f64::from(MINUTES_PER_DAY - 1))
    }

    /// Predicted next completion: the calendar day after `last_completion`,
    /// at the predicted hour and minute.
    pub fn predict_next(&self, last_completion: NaiveDateTime) -> NaiveDateTime {
        let minutes = self.predict_minutes(FeatureVector::of(last_completion)).floor() as u32;
        let time = NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0).unwrap_or(NaiveTime::MIN);
        let next_date = last_completion
            .date()
            .checked_add_days(Days::new(1))
            .unwrap_or_else(|| last_completion.date());
        next_date.and_time(time)
    }
}
