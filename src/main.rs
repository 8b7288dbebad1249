// MedTime
// Main entry point: wires the services and runs a console demo

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, Local};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;

use medtime::config::AppConfig;
use medtime::models::medication::Medication;
use medtime::models::schedule::AlarmPayload;
use medtime::services::acknowledgment::{
    AckOutcome, AcknowledgmentHandler, AlarmEvent, AlarmEvents, AlarmPresenter, OccurrenceLedger,
};
use medtime::services::database::Database;
use medtime::services::history::HistoryRepository;
use medtime::services::notification::{DesktopNotifier, PlatformNotifier};
use medtime::services::schedule::{ScheduleStore, TriggerDispatcher};
use medtime::services::settings::SettingsGate;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting MedTime");

    let test_alarm = env::args().skip(1).any(|arg| arg == "--test-alarm");

    let config = AppConfig::load_default()?;
    let db_path = config.resolve_database_path()?;
    let db_path = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?
        .to_string();
    log::info!("Using database at {}", db_path);

    let db = Arc::new(Database::new(&db_path)?);
    db.initialize_schema()?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    runtime.block_on(run(config, db, test_alarm))
}

async fn run(config: AppConfig, db: Arc<Database>, test_alarm: bool) -> Result<()> {
    let handle = Handle::current();
    let desktop = Arc::new(DesktopNotifier::new(handle.clone()));
    let notifier: Arc<dyn PlatformNotifier> = desktop.clone();

    let events = AlarmEvents::default();
    let presenter = AlarmPresenter::new(
        Arc::new(ScheduleStore::new(notifier.clone())),
        Arc::new(OccurrenceLedger::new()),
        events.clone(),
    );
    let settings = Arc::new(SettingsGate::new(db.clone()));
    let dispatcher = Arc::new(TriggerDispatcher::new(
        presenter,
        settings,
        notifier,
        config.dispatch.clone(),
        handle,
    ));
    let handler = Arc::new(AcknowledgmentHandler::new(
        dispatcher.clone(),
        Arc::new(HistoryRepository::new(db.clone())),
    ));

    {
        let handler = handler.clone();
        desktop.on_received(move |payload| {
            handler.on_notification_received(payload);
        });
    }

    let mut alarms = events.subscribe();

    if test_alarm {
        dispatcher.schedule_test_alarm(Local::now())?;
    } else {
        let next_minute = (Local::now() + Duration::minutes(1)).format("%H:%M").to_string();
        let demo = Medication::new("demo", "Paracetamol", "500 mg", [next_minute])
            .map_err(anyhow::Error::msg)?;
        dispatcher.restore(&[demo])?;
    }
    dispatcher.diagnose();

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let payload = tokio::select! {
            event = alarms.recv() => match event {
                Ok(AlarmEvent::Presented(payload)) => payload,
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Missed {} alarm events", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, shutting down");
                break;
            }
        };

        println!("{}: {}", payload.title(), payload.body());
        println!("[t]ake, [s]nooze or [c]ancel?");

        let Some(line) = input.next_line().await? else {
            break;
        };
        if acknowledge(&handler, &payload, line.trim())? {
            break;
        }
    }

    for entry in HistoryRepository::new(db).list_recent(5)? {
        log::info!(
            "History: {} {} ({}) at {}",
            entry.status.as_str(),
            entry.name,
            entry.dose,
            entry.at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

/// Apply the user's answer. Returns `true` once the alarm is resolved.
fn acknowledge(handler: &AcknowledgmentHandler, payload: &AlarmPayload, answer: &str) -> Result<bool> {
    let outcome = match answer {
        "t" | "take" => handler.on_take(payload)?,
        "s" | "snooze" => handler.on_snooze(payload)?,
        "c" | "cancel" => handler.on_cancel(payload)?,
        other => {
            println!("Unknown answer {:?}, snoozing", other);
            handler.on_snooze(payload)?
        }
    };

    match outcome {
        AckOutcome::Snoozed(next) => {
            println!("Snoozed, next alarm {}", next);
            Ok(false)
        }
        AckOutcome::Taken(_) | AckOutcome::Cancelled { .. } => Ok(true),
        AckOutcome::AlreadyRecorded(state) => {
            println!("Already {:?}", state);
            Ok(true)
        }
    }
}
