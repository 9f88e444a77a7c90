//! # Habitual Core Library
//!
//! This library provides the core logic for Habitual, a habit tracker that
//! learns when each habit is usually done and reminds the user at that time.
//! All operations are available through the `habitual` CLI, which is a thin
//! layer over this crate.
//!
//! ## Architecture
//!
//! - **Storage**: SQLite habit/completion history behind the [`HistoryStore`]
//!   trait, and TOML-based configuration
//! - **Predictor**: per-habit random forest over (day-of-week, hour, minute)
//!   of the previous completion, predicting the next completion's time of day
//! - **Scheduler**: one recurring daily reminder per habit, fired by a
//!   polling loop the caller drives
//! - **Notify**: desktop or log delivery selected at startup
//!
//! ## Key Components
//!
//! - [`TimePredictor`]: feature preparation and model training
//! - [`ReminderScheduler`]: reminder table and polling loop
//! - [`Database`]: habit and completion persistence
//! - [`Config`]: application configuration management
//! - [`Notifier`]: trait for notification delivery

pub mod error;
pub mod events;
pub mod habit;
pub mod notify;
pub mod predictor;
pub mod scheduler;
pub mod storage;

pub use error::{ConfigError, CoreError, DatabaseError, NotifyError, ValidationError};
pub use events::{Event, FireSource};
pub use habit::{Completion, CompletionHistory, Habit, HabitId, NewHabit, TargetTime};
pub use notify::{DesktopNotifier, LogNotifier, Notifier, SilentNotifier};
pub use predictor::{ForestParams, TimePredictor, TrainedPredictor};
pub use scheduler::{ReminderEntry, ReminderScheduler, ReminderState, ScheduledReminder, SchedulerState};
pub use storage::{Config, Database, HistoryStore};
