use alerting_core::{
    config::{AppConfig, Backend, DEFAULT_CONFIG_PATH},
    events::LifecycleEvent,
    runtime::connect_stream,
};
use clap::Subcommand;
use tokio::sync::mpsc;

use super::utils::{load_config, print_info, print_warning, CliResult};

#[derive(Subcommand)]
pub enum EventsCommands {
    /// Follow the event topic and print lifecycle events as they arrive
    Watch {
        /// Stop after this many events (0 = until interrupted)
        #[arg(short = 'n', long, default_value = "0")]
        count: usize,

        /// Print raw payloads instead of a one-line summary
        #[arg(long)]
        raw: bool,

        /// Path to config file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: String,
    },
}

pub async fn handle_events_command(command: EventsCommands) -> CliResult<()> {
    match command {
        EventsCommands::Watch { count, raw, config } => {
            watch_events(&load_config(&config)?, count, raw).await
        }
    }
}

async fn watch_events(config: &AppConfig, count: usize, raw: bool) -> CliResult<()> {
    if config.broker.backend == Backend::Memory {
        print_warning("Broker backend is 'memory'; no events from other processes will arrive");
    }

    let stream = connect_stream(&config.broker)?;
    let (tx, mut rx) = mpsc::channel(256);
    stream.subscribe(&config.topics.event, tx).await?;
    print_info(&format!("Watching '{}' (Ctrl+C to stop)", config.topics.event));

    let mut seen = 0usize;
    loop {
        let payload = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            payload = rx.recv() => match payload {
                Some(payload) => payload,
                None => break,
            },
        };

        println!("{}", render_event(&payload, raw));

        seen += 1;
        if count > 0 && seen >= count {
            break;
        }
    }

    print_info(&format!("{seen} event(s) received"));
    Ok(())
}

fn render_event(payload: &[u8], raw: bool) -> String {
    if raw {
        return String::from_utf8_lossy(payload).into_owned();
    }

    match LifecycleEvent::from_bytes(payload) {
        Ok(event) => format!(
            "{} {:<8} {:<5} {} {}",
            event.timestamp().to_rfc3339(),
            event.action().as_str(),
            event.event_type().as_str(),
            event.alert_id().unwrap_or("-"),
            serde_json::Value::Object(event.message().clone())
        ),
        Err(e) => format!("[undecodable event: {e}] {}", String::from_utf8_lossy(payload)),
    }
}
