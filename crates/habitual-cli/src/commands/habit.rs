//! Habit and completion commands for CLI.

use chrono::Local;
use clap::{Args, Subcommand};
use habitual_core::habit::parse_local_timestamp;
use habitual_core::{Completion, Database, HabitId, HistoryStore, NewHabit, TargetTime};

#[derive(Subcommand)]
pub enum HabitAction {
    /// Create a new habit
    Add {
        /// Habit name
        name: String,
        /// Free-text description
        #[arg(long, default_value = "")]
        description: String,
        /// Preferred time of day as HH:MM
        #[arg(long)]
        target: Option<String>,
    },
    /// List all habits
    List,
    /// Show a habit's completion history
    History {
        /// Habit ID
        id: HabitId,
    },
}

#[derive(Args)]
pub struct CompleteArgs {
    /// Habit ID
    pub id: HabitId,
    /// Completion time as "YYYY-MM-DD HH:MM[:SS]" (default: now)
    #[arg(long)]
    pub at: Option<String>,
}

pub fn run(action: HabitAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        HabitAction::Add {
            name,
            description,
            target,
        } => {
            let mut habit = NewHabit::new(name).with_description(description);
            if let Some(target) = target {
                habit = habit.with_target_time(TargetTime::parse(&target)?);
            }
            let id = db.add_habit(&habit)?;
            let created = db.get_habit(id)?.ok_or("habit vanished after insert")?;
            eprintln!("Habit created: {id}");
            println!("{}", serde_json::to_string_pretty(&created)?);
        }
        HabitAction::List => {
            let habits = db.all_habits()?;
            println!("{}", serde_json::to_string_pretty(&habits)?);
        }
        HabitAction::History { id } => {
            if db.get_habit(id)?.is_none() {
                return Err(format!("habit not found: {id}").into());
            }
            let history = db.completion_history(id)?;
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
    }
    Ok(())
}

pub fn complete(args: CompleteArgs) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let at = match args.at {
        Some(raw) => parse_local_timestamp(&raw)?,
        None => Local::now().naive_local(),
    };
    db.record_completion(args.id, at)?;
    let completion = Completion {
        habit_id: args.id,
        completed_at: at,
    };
    println!("{}", serde_json::to_string_pretty(&completion)?);
    Ok(())
}
