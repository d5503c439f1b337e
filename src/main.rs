//! AgroLink console - main entry point
//!
//! A thin interactive frontend over the link backend: it connects to the
//! configured field unit, prints readings and verdicts as they arrive, and
//! forwards actuator commands typed at the prompt. The session logic lives
//! entirely in the library; this binary is just the UI collaborator.

use agrolink::config::AppConfig;
use agrolink::link::{DeviceCommand, DeviceLink, LinkEvent};
use std::io::{BufRead, Write};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,agrolink=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting AgroLink console");

    // Load configuration: explicit path argument, or the default location
    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load(&path)?,
        None => AppConfig::load_or_default(),
    };
    tracing::info!(
        "Expecting device '{}' at {} baud",
        config.link.device_name,
        config.link.baud_rate
    );

    let (link, handle) = DeviceLink::new(config)?;
    let backend = std::thread::spawn(move || link.run());

    // Print worker events as they arrive
    let events = handle.events.clone();
    let printer = std::thread::spawn(move || {
        for event in events.iter() {
            match event {
                LinkEvent::Status(status) => println!("* link {}", status),
                LinkEvent::Notice(text) => println!("* {}", text),
                LinkEvent::Reading { reading, verdict } => {
                    println!(
                        "  gas {} | soil {} | {}",
                        reading.gas,
                        reading.moisture_label(),
                        verdict.summary()
                    );
                }
                LinkEvent::CommandSent(cmd) => println!("* sent '{}'", cmd),
                LinkEvent::CommandFailed { command, error } => {
                    println!("* could not send '{}': {}", command, error)
                }
                LinkEvent::RemoteStored { key } => println!("* mirrored as {}", key),
                LinkEvent::QueuedLocally => println!("* queued locally for later delivery"),
                LinkEvent::Drained(report) => println!(
                    "* delivered {}/{} queued readings ({} left)",
                    report.delivered, report.attempted, report.remaining
                ),
                LinkEvent::Stats(_) => {}
                LinkEvent::Shutdown => break,
            }
        }
    });

    println!("commands: connect | disconnect | on | off | read | drain | status | quit");
    handle.connect();

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        match line.trim() {
            "connect" => handle.connect(),
            "disconnect" => handle.disconnect(),
            "on" => handle.send(DeviceCommand::ActuatorOn),
            "off" => handle.send(DeviceCommand::ActuatorOff),
            "read" => handle.send(DeviceCommand::RequestReading),
            "drain" => handle.drain_pending(),
            "status" => {
                let snapshot = handle.snapshot();
                println!(
                    "link {} | gas {} | soil {} | {}",
                    snapshot.status,
                    snapshot
                        .last_gas
                        .map_or("--".to_string(), |g| g.to_string()),
                    snapshot
                        .last_moisture
                        .map_or("--".to_string(), |m| agrolink::types::moisture_label(m)
                            .to_string()),
                    snapshot
                        .last_verdict
                        .map_or("no verdict yet".to_string(), |v| v.summary())
                );
            }
            "quit" | "exit" => break,
            "" => {}
            other => println!("unknown command '{}'", other),
        }
        print!("> ");
        std::io::stdout().flush()?;
    }

    tracing::info!("Shutting down...");
    handle.shutdown();
    let _ = backend.join();
    let _ = printer.join();

    Ok(())
}
