//! Reminder scheduling.
//!
//! The [`ReminderScheduler`] keeps exactly one daily reminder per habit:
//! - With at least three completions, the fire time is predicted by a
//!   [`TrainedPredictor`](crate::predictor::TrainedPredictor)
//! - With one or two completions, it is the last completion plus one day
//! - With none, it is the scheduling time plus one day
//!
//! Once registered, a reminder recurs every day at the fire instant's time of
//! day. Recording new completions does not re-schedule anything; call
//! [`ReminderScheduler::schedule_reminder`] (or restart) to pick them up.
//!
//! ## State Transitions
//!
//! ```text
//! Unscheduled -> Scheduled -> Fired -> Fired ...
//! ```
//!
//! The scheduler has no internal thread. [`ReminderScheduler::tick`] checks
//! due reminders for a given instant; [`ReminderScheduler::run`] calls it on a
//! fixed interval until shutdown.

mod jobs;

pub use jobs::{next_occurrence, truncate_to_minute, DailyJob, DailyJobs};

use std::future::Future;
use std::time::Duration;

use chrono::{Days, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;

use crate::error::Result;
use crate::events::{Event, FireSource};
use crate::habit::{Habit, HabitId};
use crate::notify::Notifier;
use crate::predictor::TimePredictor;
use crate::storage::HistoryStore;

/// Notification title unless configured otherwise.
pub const DEFAULT_TITLE: &str = "Habit Reminder";

/// Interval between polls unless configured otherwise.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// The pending reminder for one habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledReminder {
    pub habit_id: HabitId,
    pub habit_name: String,
    /// Instant the reminder was computed for; it recurs daily at its time of day.
    pub fire_at: NaiveDateTime,
    pub source: FireSource,
    pub message: String,
}

/// A registered reminder together with its daily schedule.
pub type ReminderEntry = DailyJob<ScheduledReminder>;

/// Lifecycle of a habit's reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReminderState {
    Unscheduled,
    Scheduled {
        fire_at: NaiveDateTime,
        next_run: NaiveDateTime,
    },
    /// Fired at least once; still recurring.
    Fired {
        last_fired: NaiveDateTime,
        next_run: NaiveDateTime,
    },
}

/// Reminder table: habit id to its daily reminder job.
#[derive(Debug, Clone, Default)]
pub struct SchedulerState {
    jobs: DailyJobs<HabitId, ScheduledReminder>,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, habit_id: HabitId) -> Option<&ReminderEntry> {
        self.jobs.get(habit_id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

pub fn reminder_message(habit_name: &str) -> String {
    format!("Time to complete your habit: {habit_name}")
}

/// Keeps one recurring reminder per habit and fires due reminders.
pub struct ReminderScheduler<S, N> {
    store: S,
    notifier: N,
    predictor: TimePredictor,
    title: String,
    state: SchedulerState,
}

impl<S: HistoryStore, N: Notifier> ReminderScheduler<S, N> {
    pub fn new(store: S, notifier: N, predictor: TimePredictor) -> Self {
        Self {
            store,
            notifier,
            predictor,
            title: DEFAULT_TITLE.to_string(),
            state: SchedulerState::new(),
        }
    }

    /// Use a different notification title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    /// Compute the fire instant for `habit` without registering it.
    pub fn fire_instant(&self, habit: &Habit, now: NaiveDateTime) -> Result<(NaiveDateTime, FireSource)> {
        let history = self.store.completion_history(habit.id)?;

        let Some(last) = history.last() else {
            return Ok((plus_one_day(now), FireSource::NowPlusDay));
        };

        match self.predictor.train(&history) {
            Some(trained) => Ok((trained.predict_next(last), FireSource::Predicted)),
            None => Ok((plus_one_day(last), FireSource::LastCompletionPlusDay)),
        }
    }

    /// (Re)compute and register the reminder for `habit_id`.
    ///
    /// Unknown habits are ignored and yield `Ok(None)`.
    pub fn schedule_reminder(
        &mut self,
        habit_id: HabitId,
        now: NaiveDateTime,
    ) -> Result<Option<&ReminderEntry>> {
        let Some(habit) = self.store.get_habit(habit_id)? else {
            tracing::debug!(habit_id, "schedule requested for unknown habit");
            return Ok(None);
        };

        let (fire_at, source) = self.fire_instant(&habit, now)?;
        let reminder = ScheduledReminder {
            habit_id,
            message: reminder_message(&habit.name),
            habit_name: habit.name,
            fire_at,
            source,
        };

        let entry = self
            .state
            .jobs
            .register_daily(habit_id, fire_at.time(), reminder, now);

        tracing::info!(
            habit_id,
            habit = %entry.job.habit_name,
            time_of_day = %entry.time_of_day.format("%H:%M"),
            next_run = %entry.next_run,
            ?source,
            "reminder scheduled"
        );
        Ok(Some(entry))
    }

    /// Schedule every habit in the store, one `ReminderScheduled` event each.
    pub fn start(&mut self, now: NaiveDateTime) -> Result<Vec<Event>> {
        let habits = self.store.all_habits()?;
        let mut events = Vec::with_capacity(habits.len());
        for habit in habits {
            if let Some(entry) = self.schedule_reminder(habit.id, now)? {
                events.push(Event::ReminderScheduled {
                    habit_id: habit.id,
                    fire_at: entry.job.fire_at,
                    next_run: entry.next_run,
                    source: entry.job.source,
                    at: now,
                });
            }
        }
        tracing::info!(scheduled = events.len(), "reminder scheduler started");
        Ok(events)
    }

    /// Fire every reminder due at `now`.
    ///
    /// Notifier failures are logged and reported in the event; the reminder
    /// stays registered.
    pub fn tick(&mut self, now: NaiveDateTime) -> Vec<Event> {
        let due = self.state.jobs.run_due_jobs(now);
        let mut events = Vec::with_capacity(due.len());

        for habit_id in due {
            let Some(entry) = self.state.jobs.get(habit_id) else {
                continue;
            };
            let reminder = &entry.job;
            let delivered = match self.notifier.notify(&self.title, &reminder.message) {
                Ok(()) => {
                    tracing::info!(habit_id, habit = %reminder.habit_name, "reminder fired");
                    true
                }
                Err(e) => {
                    tracing::warn!(habit_id, habit = %reminder.habit_name, "reminder delivery failed: {e}");
                    false
                }
            };
            events.push(Event::ReminderFired {
                habit_id,
                habit_name: reminder.habit_name.clone(),
                delivered,
                at: now,
            });
        }
        events
    }

    /// Poll every `poll_interval` until `shutdown` resolves.
    ///
    /// `clock` supplies the current local time for each poll. The first poll
    /// happens immediately; late polls are delayed rather than bunched.
    pub async fn run<C, F>(&mut self, poll_interval: Duration, mut clock: C, shutdown: F)
    where
        C: FnMut() -> NaiveDateTime,
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!(poll_secs = poll_interval.as_secs(), "reminder loop running");
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!("reminder loop stopped");
                    return;
                }
                _ = interval.tick() => {
                    let events = self.tick(clock());
                    if !events.is_empty() {
                        tracing::debug!(fired = events.len(), "poll complete");
                    }
                }
            }
        }
    }

    pub fn reminder(&self, habit_id: HabitId) -> Option<&ReminderEntry> {
        self.state.get(habit_id)
    }

    /// All registered reminders, ordered by habit id.
    pub fn reminders(&self) -> Vec<&ReminderEntry> {
        self.state.jobs.iter().map(|(_, entry)| entry).collect()
    }

    pub fn state_of(&self, habit_id: HabitId) -> ReminderState {
        match self.state.get(habit_id) {
            None => ReminderState::Unscheduled,
            Some(entry) => match entry.last_run {
                None => ReminderState::Scheduled {
                    fire_at: entry.job.fire_at,
                    next_run: entry.next_run,
                },
                Some(last_fired) => ReminderState::Fired {
                    last_fired,
                    next_run: entry.next_run,
                },
            },
        }
    }
}

fn plus_one_day(at: NaiveDateTime) -> NaiveDateTime {
    at.checked_add_days(Days::new(1)).unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotifyError;
    use crate::habit::NewHabit;
    use crate::storage::Database;
    use chrono::NaiveDate;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: RefCell<Vec<(String, String)>>,
        fail: bool,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, title: &str, message: &str) -> std::result::Result<(), NotifyError> {
            self.sent.borrow_mut().push((title.to_string(), message.to_string()));
            if self.fail {
                return Err(NotifyError::UnsupportedPlatform("test".into()));
            }
            Ok(())
        }
    }

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn scheduler(notifier: &RecordingNotifier) -> ReminderScheduler<Database, &RecordingNotifier> {
        let db = Database::open_memory().unwrap();
        ReminderScheduler::new(db, notifier, TimePredictor::default())
    }

    #[test]
    fn unknown_habit_is_a_no_op() {
        let notifier = RecordingNotifier::default();
        let mut s = scheduler(&notifier);
        assert!(s.schedule_reminder(5, at(1, 9, 0)).unwrap().is_none());
        assert_eq!(s.state_of(5), ReminderState::Unscheduled);
        assert!(s.state().is_empty());
    }

    #[test]
    fn empty_history_fires_one_day_after_now() {
        let notifier = RecordingNotifier::default();
        let mut s = scheduler(&notifier);
        let id = s.store().add_habit(&NewHabit::new("Meditate")).unwrap();

        let now = at(1, 9, 17) + chrono::Duration::seconds(33);
        let entry = s.schedule_reminder(id, now).unwrap().unwrap();
        assert_eq!(entry.job.fire_at, now + chrono::Duration::hours(24));
        assert_eq!(entry.job.source, FireSource::NowPlusDay);
        assert_eq!(entry.next_run, at(2, 9, 17));
    }

    #[test]
    fn single_completion_fires_one_day_after_it() {
        let notifier = RecordingNotifier::default();
        let mut s = scheduler(&notifier);
        let id = s.store().add_habit(&NewHabit::new("Journal")).unwrap();
        s.store().record_completion(id, at(1, 21, 40)).unwrap();

        let entry = s.schedule_reminder(id, at(3, 8, 0)).unwrap().unwrap();
        assert_eq!(entry.job.fire_at, at(2, 21, 40));
        assert_eq!(entry.job.source, FireSource::LastCompletionPlusDay);
        // Registered by time of day: next 21:40 after now
        assert_eq!(entry.next_run, at(3, 21, 40));
    }

    #[test]
    fn two_completions_still_use_fallback() {
        let notifier = RecordingNotifier::default();
        let mut s = scheduler(&notifier);
        let id = s.store().add_habit(&NewHabit::new("Journal")).unwrap();
        s.store().record_completion(id, at(1, 21, 0)).unwrap();
        s.store().record_completion(id, at(2, 22, 0)).unwrap();

        let entry = s.schedule_reminder(id, at(2, 23, 0)).unwrap().unwrap();
        assert_eq!(entry.job.fire_at, at(3, 22, 0));
        assert_eq!(entry.job.source, FireSource::LastCompletionPlusDay);
    }

    #[test]
    fn enough_history_uses_prediction() {
        let notifier = RecordingNotifier::default();
        let mut s = scheduler(&notifier);
        let id = s.store().add_habit(&NewHabit::new("Run")).unwrap();
        for d in 1..=5 {
            s.store().record_completion(id, at(d, 6, 45)).unwrap();
        }

        let entry = s.schedule_reminder(id, at(5, 7, 0)).unwrap().unwrap();
        assert_eq!(entry.job.source, FireSource::Predicted);
        assert_eq!(entry.job.fire_at, at(6, 6, 45));
        assert_eq!(entry.job.message, "Time to complete your habit: Run");
    }

    #[test]
    fn rescheduling_is_idempotent() {
        let notifier = RecordingNotifier::default();
        let mut s = scheduler(&notifier);
        let id = s.store().add_habit(&NewHabit::new("Run")).unwrap();
        for (d, m) in [(1, 0), (2, 20), (3, 5), (4, 40)] {
            s.store().record_completion(id, at(d, 7, m)).unwrap();
        }

        let first = s.schedule_reminder(id, at(4, 9, 0)).unwrap().unwrap().clone();
        let second = s.schedule_reminder(id, at(4, 9, 0)).unwrap().unwrap().clone();
        assert_eq!(first.job.fire_at, second.job.fire_at);
        assert_eq!(s.state().len(), 1);
    }

    #[test]
    fn tick_fires_due_reminder_and_keeps_it() {
        let notifier = RecordingNotifier::default();
        let mut s = scheduler(&notifier);
        let id = s.store().add_habit(&NewHabit::new("Water plants")).unwrap();
        s.store().record_completion(id, at(1, 18, 0)).unwrap();
        s.schedule_reminder(id, at(2, 12, 0)).unwrap();

        assert!(s.tick(at(2, 17, 59)).is_empty());
        let events = s.tick(at(2, 18, 0));
        assert_eq!(
            events,
            vec![Event::ReminderFired {
                habit_id: id,
                habit_name: "Water plants".into(),
                delivered: true,
                at: at(2, 18, 0),
            }]
        );
        assert_eq!(
            notifier.sent.borrow().as_slice(),
            &[("Habit Reminder".to_string(), "Time to complete your habit: Water plants".to_string())]
        );
        assert_eq!(
            s.state_of(id),
            ReminderState::Fired {
                last_fired: at(2, 18, 0),
                next_run: at(3, 18, 0),
            }
        );
    }

    #[test]
    fn delivery_failure_keeps_reminder_registered() {
        let notifier = RecordingNotifier {
            fail: true,
            ..RecordingNotifier::default()
        };
        let mut s = scheduler(&notifier);
        let id = s.store().add_habit(&NewHabit::new("Floss")).unwrap();
        s.store().record_completion(id, at(1, 22, 0)).unwrap();
        s.schedule_reminder(id, at(2, 8, 0)).unwrap();

        let events = s.tick(at(2, 22, 0));
        assert!(matches!(events[0], Event::ReminderFired { delivered: false, .. }));
        assert!(matches!(s.state_of(id), ReminderState::Fired { .. }));
        assert_eq!(s.tick(at(3, 22, 0)).len(), 1);
    }

    #[test]
    fn custom_title_is_used() {
        let notifier = RecordingNotifier::default();
        let db = Database::open_memory().unwrap();
        let mut s = ReminderScheduler::new(db, &notifier, TimePredictor::default()).with_title("Nudge");
        let id = s.store().add_habit(&NewHabit::new("Walk")).unwrap();
        s.schedule_reminder(id, at(1, 10, 0)).unwrap();
        s.tick(at(2, 10, 0));
        assert_eq!(notifier.sent.borrow()[0].0, "Nudge");
    }

    #[test]
    fn start_schedules_every_habit() {
        let notifier = RecordingNotifier::default();
        let mut s = scheduler(&notifier);
        let a = s.store().add_habit(&NewHabit::new("A")).unwrap();
        let b = s.store().add_habit(&NewHabit::new("B")).unwrap();

        let events = s.start(at(1, 9, 0)).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            Event::ReminderScheduled { habit_id, source: FireSource::NowPlusDay, next_run, .. }
                if habit_id == a && next_run == at(2, 9, 0)
        ));
        let ids: Vec<_> = s.reminders().iter().map(|r| r.job.habit_id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn new_completions_need_explicit_reschedule() {
        let notifier = RecordingNotifier::default();
        let mut s = scheduler(&notifier);
        let id = s.store().add_habit(&NewHabit::new("Read")).unwrap();
        s.schedule_reminder(id, at(1, 9, 0)).unwrap();
        let before = s.reminder(id).unwrap().job.fire_at;

        s.store().record_completion(id, at(1, 21, 30)).unwrap();
        assert_eq!(s.reminder(id).unwrap().job.fire_at, before);

        s.schedule_reminder(id, at(1, 22, 0)).unwrap();
        assert_eq!(s.reminder(id).unwrap().job.fire_at, at(2, 21, 30));
    }
}
