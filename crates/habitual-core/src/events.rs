use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::habit::HabitId;

/// Where a reminder's fire instant came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireSource {
    /// Predicted by a model trained on the habit's history.
    Predicted,
    /// Too little history to train: last completion plus one day.
    LastCompletionPlusDay,
    /// No history at all: scheduling time plus one day.
    NowPlusDay,
}

/// Every reminder state change produces an Event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    ReminderScheduled {
        habit_id: HabitId,
        fire_at: NaiveDateTime,
        next_run: NaiveDateTime,
        source: FireSource,
        at: NaiveDateTime,
    },
    ReminderFired {
        habit_id: HabitId,
        habit_name: String,
        /// False when the notifier reported a failure.
        delivered: bool,
        at: NaiveDateTime,
    },
}
