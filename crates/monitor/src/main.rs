//! `scada-monitor` -- interactive single-sensor monitor.
//!
//! Registers the configured sensor with its motor running, starts a
//! sampler session, logs every monitor event, and takes operator commands
//! from stdin (`help` lists them). See [`MonitorConfig::from_env`] for the
//! environment variables.

use std::sync::Arc;

use anyhow::Context;
use scada_core::error::CoreError;
use scada_core::sensor::{MotorChange, NewSensor};
use scada_db::{MemoryReadingStore, MemorySensorRegistry};
use scada_events::{EventBus, MonitorEvent, MonitorEventKind};
use scada_monitor::cli::{Command, HELP};
use scada_monitor::{MonitorConfig, MonitorService};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scada_monitor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = MonitorConfig::from_env();
    tracing::info!(
        sensor_id = %config.sensor_id,
        tick_ms = config.tick.as_millis() as u64,
        "Starting scada-monitor",
    );

    let service = Arc::new(MonitorService::new(
        Arc::new(MemoryReadingStore::new()),
        Arc::new(MemorySensorRegistry::new()),
        Arc::new(EventBus::default()),
        config.clone(),
    ));

    let logger = tokio::spawn(log_events(service.subscribe()));

    let sensor_id = config.sensor_id.clone();
    service
        .register_sensor(NewSensor {
            sensor_id: sensor_id.clone(),
            name: config.sensor_name.clone(),
            motor_on: Some(true),
            ..Default::default()
        })
        .await
        .context("failed to register sensor")?;
    service
        .start(&sensor_id)
        .await
        .context("failed to start sampler")?;

    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        if let Err(e) = execute(&service, &sensor_id, command).await {
            println!("{e}");
        }
    }

    service.shutdown().await;
    logger.abort();
    tracing::info!("scada-monitor exited");
    Ok(())
}

/// Run one operator command against the configured sensor.
async fn execute(
    service: &MonitorService,
    sensor_id: &str,
    command: Command,
) -> Result<(), CoreError> {
    match command {
        Command::Pause => println!("Sampler {}", service.pause(sensor_id).await?),
        Command::Resume => println!("Sampler {}", service.resume(sensor_id).await?),
        Command::Start => println!("Sampler {}", service.start(sensor_id).await?),
        Command::MotorOn => report_motor(service.turn_motor_on(sensor_id).await?),
        Command::MotorOff => report_motor(service.turn_motor_off(sensor_id).await?),
        Command::Report => {
            let readings = service.recent(sensor_id, None).await?;
            if readings.is_empty() {
                println!("No readings yet");
            }
            for r in readings {
                println!(
                    "{}  {:>6.1}°C  {:>6.1} PSI  motor {}{}",
                    r.timestamp.format("%H:%M:%S"),
                    r.temperature,
                    r.pressure,
                    if r.motor_on { "on " } else { "off" },
                    r.warning_message
                        .map(|m| format!("  {m}"))
                        .unwrap_or_default(),
                );
            }
        }
        Command::Trend => {
            let t = service.trend(sensor_id, None).await?;
            println!(
                "{} readings from {} to {}",
                t.total_readings, t.start_time, t.end_time,
            );
            println!(
                "Temperature avg {:.2} min {:.2} max {:.2} °C",
                t.avg_temperature, t.min_temperature, t.max_temperature,
            );
            println!(
                "Pressure    avg {:.2} min {:.2} max {:.2} PSI",
                t.avg_pressure, t.min_pressure, t.max_pressure,
            );
            println!("Warnings    {}", t.warning_count);
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

fn report_motor(change: MotorChange) {
    match change {
        MotorChange::Switched { motor_on } => {
            println!("Motor turned {}", if motor_on { "on" } else { "off" })
        }
        MotorChange::Unchanged { motor_on } => {
            println!("Motor is already {}", if motor_on { "on" } else { "off" })
        }
    }
}

/// Log every monitor event until the bus closes.
async fn log_events(mut rx: broadcast::Receiver<MonitorEvent>) {
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event logger lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        let sensor_id = event.sensor_id.as_str();
        match &event.kind {
            MonitorEventKind::ReadingRecorded { reading } => tracing::info!(
                sensor_id,
                temperature = reading.temperature,
                pressure = reading.pressure,
                motor_on = reading.motor_on,
                "Reading",
            ),
            MonitorEventKind::ThresholdWarning { message, .. } => {
                tracing::warn!(sensor_id, %message, "Warning")
            }
            MonitorEventKind::CriticalShutdown { message } => {
                tracing::error!(sensor_id, %message, "CRITICAL SHUTDOWN; type 'start' for a new session")
            }
            MonitorEventKind::StoreFailure { error } => {
                tracing::error!(sensor_id, %error, "Store failure")
            }
            MonitorEventKind::LifecycleChanged { status, reason } => {
                tracing::info!(sensor_id, %status, reason = ?reason, "Sampler state changed")
            }
            MonitorEventKind::MotorChanged { motor_on } => {
                tracing::info!(sensor_id, motor_on, "Motor changed")
            }
        }
    }
}
