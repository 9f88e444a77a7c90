//! Daily recurring jobs keyed by an id.
//!
//! A job fires whenever the polling clock has reached its next run, then
//! moves to the following daily occurrence of its time of day. Registering
//! under an existing key replaces the old job.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Earliest instant strictly after `after` whose time of day is `time_of_day`.
pub fn next_occurrence(time_of_day: NaiveTime, after: NaiveDateTime) -> NaiveDateTime {
    let candidate = after.date().and_time(time_of_day);
    if candidate > after {
        candidate
    } else {
        candidate
            .checked_add_days(Days::new(1))
            .unwrap_or(NaiveDateTime::MAX)
    }
}

/// Time of day at minute precision.
pub fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyJob<J> {
    pub time_of_day: NaiveTime,
    pub next_run: NaiveDateTime,
    pub last_run: Option<NaiveDateTime>,
    #[serde(flatten)]
    pub job: J,
}

#[derive(Debug, Clone)]
pub struct DailyJobs<K, J> {
    jobs: BTreeMap<K, DailyJob<J>>,
}

impl<K, J> Default for DailyJobs<K, J> {
    fn default() -> Self {
        Self {
            jobs: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Copy, J> DailyJobs<K, J> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `job` to run every day at `time_of_day` (seconds dropped),
    /// replacing any job under `key`.
    pub fn register_daily(
        &mut self,
        key: K,
        time_of_day: NaiveTime,
        job: J,
        now: NaiveDateTime,
    ) -> &DailyJob<J> {
        let time_of_day = truncate_to_minute(time_of_day);
        let entry = DailyJob {
            time_of_day,
            next_run: next_occurrence(time_of_day, now),
            last_run: None,
            job,
        };
        self.jobs.insert(key, entry);
        &self.jobs[&key]
    }

    /// Keys of every job due at `now`, earliest first.
    ///
    /// Each due job is stamped with `last_run = now` and advanced to its next
    /// daily occurrence after `now`.
    pub fn run_due_jobs(&mut self, now: NaiveDateTime) -> Vec<K> {
        let mut due: Vec<(NaiveDateTime, K)> = self
            .jobs
            .iter()
            .filter(|(_, job)| job.next_run <= now)
            .map(|(key, job)| (job.next_run, *key))
            .collect();
        due.sort();

        for (_, key) in &due {
            if let Some(job) = self.jobs.get_mut(key) {
                job.last_run = Some(now);
                job.next_run = next_occurrence(job.time_of_day, now);
            }
        }
        due.into_iter().map(|(_, key)| key).collect()
    }

    pub fn get(&self, key: K) -> Option<&DailyJob<J>> {
        self.jobs.get(&key)
    }

    /// Jobs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &DailyJob<J>)> {
        self.jobs.iter()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
