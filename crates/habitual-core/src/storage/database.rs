//! SQLite-based habit and completion storage.
//!
//! Provides persistent storage for:
//! - Habits (name, description, optional target time)
//! - Append-only completion records per habit

use std::path::Path;

use chrono::{Local, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::DatabaseError;
use crate::habit::{CompletionHistory, Habit, HabitId, NewHabit, TargetTime};

use super::history_store::HistoryStore;
use super::{data_dir, migrations};

/// Storage format for instants. Fixed width, so text order is time order.
const INSTANT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

fn format_instant(at: NaiveDateTime) -> String {
    at.format(INSTANT_FORMAT).to_string()
}

fn parse_instant(column: &str, raw: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(raw, INSTANT_FORMAT).map_err(|_| DatabaseError::CorruptValue {
        column: column.to_string(),
        value: raw.to_string(),
    })
}

/// Raw habit row before text columns are decoded.
struct HabitRow {
    id: HabitId,
    name: String,
    description: String,
    target_time: Option<String>,
    created_at: String,
}

impl HabitRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            target_time: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn into_habit(self) -> Result<Habit, DatabaseError> {
        let target_time = self
            .target_time
            .as_deref()
            .map(|raw| {
                TargetTime::parse(raw).map_err(|_| DatabaseError::CorruptValue {
                    column: "target_time".into(),
                    value: raw.to_string(),
                })
            })
            .transpose()?;
        Ok(Habit {
            id: self.id,
            name: self.name,
            description: self.description,
            target_time,
            created_at: parse_instant("created_at", &self.created_at)?,
        })
    }
}

/// SQLite database for habits and completions.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/habitual/habitual.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created, or the
    /// database cannot be opened or migrated.
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let path = data_dir()?.join("habitual.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory().map_err(|source| DatabaseError::OpenFailed {
            path: ":memory:".into(),
            source,
        })?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, DatabaseError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    fn habit_exists(&self, habit_id: HabitId) -> Result<bool, DatabaseError> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM habits WHERE id = ?1", params![habit_id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    /// Number of completions recorded for a habit.
    pub fn completion_count(&self, habit_id: HabitId) -> Result<u64, DatabaseError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM completions WHERE habit_id = ?1",
            params![habit_id],
            |row| row.get::<_, u64>(0),
        )?;
        Ok(count)
    }
}

impl HistoryStore for Database {
    fn add_habit(&self, habit: &NewHabit) -> Result<HabitId, DatabaseError> {
        let created_at = Local::now().naive_local();
        self.conn.execute(
            "INSERT INTO habits (name, description, target_time, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                habit.name,
                habit.description,
                habit.target_time.map(|t| t.to_string()),
                format_instant(created_at),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(habit_id = id, name = %habit.name, "habit added");
        Ok(id)
    }

    fn record_completion(&self, habit_id: HabitId, at: NaiveDateTime) -> Result<(), DatabaseError> {
        if !self.habit_exists(habit_id)? {
            return Err(DatabaseError::UnknownHabit(habit_id));
        }
        self.conn.execute(
            "INSERT INTO completions (habit_id, completed_at) VALUES (?1, ?2)",
            params![habit_id, format_instant(at)],
        )?;
        tracing::debug!(habit_id, completed_at = %at, "completion recorded");
        Ok(())
    }

    fn get_habit(&self, habit_id: HabitId) -> Result<Option<Habit>, DatabaseError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, description, target_time, created_at
                 FROM habits WHERE id = ?1",
                params![habit_id],
                HabitRow::from_row,
            )
            .optional()?;
        row.map(HabitRow::into_habit).transpose()
    }

    fn completion_history(&self, habit_id: HabitId) -> Result<CompletionHistory, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT completed_at FROM completions
             WHERE habit_id = ?1
             ORDER BY completed_at, id",
        )?;
        let rows = stmt.query_map(params![habit_id], |row| row.get::<_, String>(0))?;

        let mut instants = Vec::new();
        for raw in rows {
            instants.push(parse_instant("completed_at", &raw?)?);
        }
        Ok(instants.into())
    }

    fn all_habits(&self) -> Result<Vec<Habit>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, target_time, created_at
             FROM habits ORDER BY id",
        )?;
        let rows = stmt.query_map([], HabitRow::from_row)?;

        let mut habits = Vec::new();
        for row in rows {
            habits.push(row?.into_habit()?);
        }
        Ok(habits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn add_and_get_habit() {
        let db = Database::open_memory().unwrap();
        let id = db
            .add_habit(
                &NewHabit::new("Daily Exercise")
                    .with_description("30 minutes of cardio")
                    .with_target_time(TargetTime::new(8, 0).unwrap()),
            )
            .unwrap();

        let habit = db.get_habit(id).unwrap().unwrap();
        assert_eq!(habit.name, "Daily Exercise");
        assert_eq!(habit.description, "30 minutes of cardio");
        assert_eq!(habit.target_time, TargetTime::new(8, 0));
    }

    #[test]
    fn get_unknown_habit_is_none() {
        let db = Database::open_memory().unwrap();
        assert!(db.get_habit(42).unwrap().is_none());
    }

    #[test]
    fn history_is_ascending_regardless_of_insert_order() {
        let db = Database::open_memory().unwrap();
        let id = db.add_habit(&NewHabit::new("Read")).unwrap();
        db.record_completion(id, at(3, 21, 0)).unwrap();
        db.record_completion(id, at(1, 22, 15)).unwrap();
        db.record_completion(id, at(2, 20, 45)).unwrap();

        let history = db.completion_history(id).unwrap();
        assert_eq!(history.as_slice(), &[at(1, 22, 15), at(2, 20, 45), at(3, 21, 0)]);
        assert_eq!(db.completion_count(id).unwrap(), 3);
    }

    #[test]
    fn history_is_per_habit() {
        let db = Database::open_memory().unwrap();
        let a = db.add_habit(&NewHabit::new("A")).unwrap();
        let b = db.add_habit(&NewHabit::new("B")).unwrap();
        db.record_completion(a, at(1, 8, 0)).unwrap();

        assert_eq!(db.completion_history(a).unwrap().len(), 1);
        assert!(db.completion_history(b).unwrap().is_empty());
    }

    #[test]
    fn completion_for_unknown_habit_is_rejected() {
        let db = Database::open_memory().unwrap();
        let err = db.record_completion(99, at(1, 8, 0)).unwrap_err();
        assert!(matches!(err, DatabaseError::UnknownHabit(99)));
    }

    #[test]
    fn all_habits_ordered_by_id() {
        let db = Database::open_memory().unwrap();
        db.add_habit(&NewHabit::new("First")).unwrap();
        db.add_habit(&NewHabit::new("Second")).unwrap();

        let names: Vec<_> = db.all_habits().unwrap().into_iter().map(|h| h.name).collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[test]
    fn sub_second_precision_survives() {
        let db = Database::open_memory().unwrap();
        let id = db.add_habit(&NewHabit::new("Stretch")).unwrap();
        let precise = at(1, 7, 0) + chrono::Duration::microseconds(123_456);
        db.record_completion(id, precise).unwrap();
        assert_eq!(db.completion_history(id).unwrap().last(), Some(precise));
    }
}
