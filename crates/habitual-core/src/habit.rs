//! Habit and completion history model.
//!
//! All instants are local wall-clock times (`NaiveDateTime`); no timezone
//! conversion happens anywhere in the core.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Row id of a habit in the history store.
pub type HabitId = i64;

/// A tracked recurring activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub name: String,
    pub description: String,
    /// Preferred time of day, informational only.
    pub target_time: Option<TargetTime>,
    pub created_at: NaiveDateTime,
}

/// Input for [`crate::HistoryStore::add_habit`].
#[derive(Debug, Clone, Default)]
pub struct NewHabit {
    pub name: String,
    pub description: String,
    pub target_time: Option<TargetTime>,
}

impl NewHabit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_target_time(mut self, target_time: TargetTime) -> Self {
        self.target_time = Some(target_time);
        self
    }
}

/// Hour:minute time of day, serialized as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetTime(NaiveTime);

impl TargetTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    /// Parse an `HH:MM` string.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(Self)
            .map_err(|_| ValidationError::InvalidTimeOfDay(s.to_string()))
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    pub fn as_naive(&self) -> NaiveTime {
        self.0
    }
}

impl std::fmt::Display for TargetTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl TryFrom<String> for TargetTime {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TargetTime> for String {
    fn from(value: TargetTime) -> Self {
        value.to_string()
    }
}

/// A single recorded completion of a habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub habit_id: HabitId,
    pub completed_at: NaiveDateTime,
}

/// Completion instants of one habit, ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<NaiveDateTime>", into = "Vec<NaiveDateTime>")]
pub struct CompletionHistory {
    instants: Vec<NaiveDateTime>,
}

impl CompletionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.instants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instants.is_empty()
    }

    /// Most recent completion.
    pub fn last(&self) -> Option<NaiveDateTime> {
        self.instants.last().copied()
    }

    pub fn as_slice(&self) -> &[NaiveDateTime] {
        &self.instants
    }

    pub fn iter(&self) -> impl Iterator<Item = &NaiveDateTime> {
        self.instants.iter()
    }

    /// Insert keeping ascending order; equal instants keep insertion order.
    pub fn push(&mut self, instant: NaiveDateTime) {
        let idx = self.instants.partition_point(|existing| *existing <= instant);
        self.instants.insert(idx, instant);
    }
}

impl From<Vec<NaiveDateTime>> for CompletionHistory {
    fn from(mut instants: Vec<NaiveDateTime>) -> Self {
        instants.sort();
        Self { instants }
    }
}

impl From<CompletionHistory> for Vec<NaiveDateTime> {
    fn from(history: CompletionHistory) -> Self {
        history.instants
    }
}

impl FromIterator<NaiveDateTime> for CompletionHistory {
    fn from_iter<I: IntoIterator<Item = NaiveDateTime>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}

/// Parse a user-supplied local timestamp.
///
/// Accepts `YYYY-MM-DD HH:MM`, `YYYY-MM-DD HH:MM:SS` and the `T`-separated
/// forms of both.
pub fn parse_local_timestamp(s: &str) -> Result<NaiveDateTime, ValidationError> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ];
    let s = s.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| ValidationError::InvalidTimestamp(s.to_string()))
}
