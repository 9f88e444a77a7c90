//! Reminder commands: prediction preview, the polling loop and the demo.

use chrono::{Duration, Local, NaiveDateTime};
use clap::Args;
use habitual_core::notify;
use habitual_core::{
    Config, Database, HabitId, HistoryStore, NewHabit, Notifier, ReminderScheduler, TargetTime,
    TimePredictor,
};

#[derive(Args)]
pub struct PredictArgs {
    /// Habit ID (default: all habits)
    pub id: Option<HabitId>,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn build_scheduler(
    db: Database,
    config: &Config,
) -> ReminderScheduler<Database, Box<dyn Notifier + Send + Sync>> {
    let predictor = TimePredictor::new(config.predictor.forest_params());
    let notifier = notify::from_config(&config.notifications);
    ReminderScheduler::new(db, notifier, predictor).with_title(config.notifications.title.clone())
}

pub fn predict(args: PredictArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut scheduler = build_scheduler(Database::open()?, &config);
    let now = local_now();

    match args.id {
        Some(id) => {
            let entry = scheduler
                .schedule_reminder(id, now)?
                .ok_or_else(|| format!("habit not found: {id}"))?;
            println!("{}", serde_json::to_string_pretty(entry)?);
        }
        None => {
            scheduler.start(now)?;
            println!("{}", serde_json::to_string_pretty(&scheduler.reminders())?);
        }
    }
    Ok(())
}

/// Schedule every habit, then poll until Ctrl-C.
async fn run_scheduler(db: Database, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut scheduler = build_scheduler(db, config);
    scheduler.start(local_now())?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };
    scheduler
        .run(config.scheduler.poll_interval(), local_now, shutdown)
        .await;
    Ok(())
}

#[tokio::main]
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    run_scheduler(db, &config).await
}

#[tokio::main]
pub async fn demo() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;

    let id = db.add_habit(
        &NewHabit::new("Daily Exercise")
            .with_description("30 minutes of cardio")
            .with_target_time(TargetTime::parse("08:00")?),
    )?;
    let now = local_now();
    for days_ago in 0..7 {
        db.record_completion(id, now - Duration::days(days_ago))?;
    }
    tracing::info!(habit_id = id, "demo habit created with 7 completions");

    run_scheduler(db, &config).await
}
