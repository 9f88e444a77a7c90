//! The history store contract consumed by the predictor and scheduler.

use chrono::NaiveDateTime;

use crate::error::DatabaseError;
use crate::habit::{CompletionHistory, Habit, HabitId, NewHabit};

/// Durable record of habits and their completions.
///
/// The scheduler only reads through this trait; `record_completion` is the
/// single mutating operation besides `add_habit`.
pub trait HistoryStore {
    /// Create a habit and return its id.
    fn add_habit(&self, habit: &NewHabit) -> Result<HabitId, DatabaseError>;

    /// Append a completion for an existing habit.
    fn record_completion(&self, habit_id: HabitId, at: NaiveDateTime) -> Result<(), DatabaseError>;

    fn get_habit(&self, habit_id: HabitId) -> Result<Option<Habit>, DatabaseError>;

    /// Completion instants for `habit_id`, ascending. Empty for unknown ids.
    fn completion_history(&self, habit_id: HabitId) -> Result<CompletionHistory, DatabaseError>;

    /// All habits, ordered by id.
    fn all_habits(&self) -> Result<Vec<Habit>, DatabaseError>;
}

impl<T: HistoryStore + ?Sized> HistoryStore for &T {
    fn add_habit(&self, habit: &NewHabit) -> Result<HabitId, DatabaseError> {
        (**self).add_habit(habit)
    }

    fn record_completion(&self, habit_id: HabitId, at: NaiveDateTime) -> Result<(), DatabaseError> {
        (**self).record_completion(habit_id, at)
    }

    fn get_habit(&self, habit_id: HabitId) -> Result<Option<Habit>, DatabaseError> {
        (**self).get_habit(habit_id)
    }

    fn completion_history(&self, habit_id: HabitId) -> Result<CompletionHistory, DatabaseError> {
        (**self).completion_history(habit_id)
    }

    fn all_habits(&self) -> Result<Vec<Habit>, DatabaseError> {
        (**self).all_habits()
    }
}
