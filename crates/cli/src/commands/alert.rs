use std::path::{Path, PathBuf};

use alerting_core::{
    alerts::Alert,
    config::{AppConfig, Backend, DEFAULT_CONFIG_PATH},
    runtime::{connect_storage, connect_stream},
};
use chrono::{DateTime, Utc};
use clap::Subcommand;

use super::utils::{load_config, print_info, print_success, print_warning, CliError, CliResult};

#[derive(Subcommand)]
pub enum AlertCommands {
    /// Publish an alert read from a JSON file to the intake topic
    Publish {
        /// Path to a v1 alert JSON document
        file: PathBuf,

        /// Path to config file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: String,
    },

    /// Build an alert from arguments and publish it to the intake topic
    Send {
        /// Alert identity
        #[arg(long)]
        id: String,

        #[arg(long)]
        title: String,

        #[arg(long)]
        message: String,

        /// Publish the alert as resolved instead of firing
        #[arg(long)]
        resolved: bool,

        /// Start time in RFC 3339 (defaults to now)
        #[arg(long)]
        start: Option<String>,

        /// Path to config file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: String,
    },

    /// Print the stored snapshot of an alert
    Inspect {
        /// Alert identity
        id: String,

        /// Path to config file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: String,
    },

    /// Print the content hash of an alert JSON file
    Hash {
        /// Path to a v1 alert JSON document
        file: PathBuf,
    },
}

pub async fn handle_alert_command(command: AlertCommands) -> CliResult<()> {
    match command {
        AlertCommands::Publish { file, config } => {
            let alert = read_alert(&file)?;
            publish_alert(&load_config(&config)?, &alert).await
        }
        AlertCommands::Send { id, title, message, resolved, start, config } => {
            let start = parse_start(start.as_deref())?;
            let mut alert = Alert::new(id, title, message, start, true);
            if resolved {
                alert.resolve(Utc::now());
            }
            publish_alert(&load_config(&config)?, &alert).await
        }
        AlertCommands::Inspect { id, config } => inspect_alert(&load_config(&config)?, &id).await,
        AlertCommands::Hash { file } => {
            let alert = read_alert(&file)?;
            println!("{}", alert.hash());
            Ok(())
        }
    }
}

fn read_alert(file: &Path) -> CliResult<Alert> {
    let raw = std::fs::read_to_string(file)?;
    Ok(Alert::from_str(&raw)?)
}

fn parse_start(start: Option<&str>) -> CliResult<DateTime<Utc>> {
    match start {
        None => Ok(Utc::now()),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| CliError::Alert(format!("invalid start time '{raw}': {e}"))),
    }
}

fn warn_if_memory(backend: Backend, what: &str) {
    if backend == Backend::Memory {
        print_warning(&format!(
            "{what} backend is 'memory'; nothing outside this process will see the result"
        ));
    }
}

async fn publish_alert(config: &AppConfig, alert: &Alert) -> CliResult<()> {
    warn_if_memory(config.broker.backend, "Broker");

    let stream = connect_stream(&config.broker)?;
    let payload = alert.to_bytes()?;
    stream.publish(&config.topics.intake, &payload).await?;

    print_success(&format!(
        "Published alert {} ({}) to '{}'",
        alert.id(),
        if alert.is_firing() { "firing" } else { "resolved" },
        config.topics.intake
    ));
    Ok(())
}

async fn inspect_alert(config: &AppConfig, id: &str) -> CliResult<()> {
    warn_if_memory(config.storage.backend, "Storage");

    let storage = connect_storage(&config.storage)?;
    let Some(snapshot) = storage.get(id).await? else {
        print_info(&format!("No snapshot stored for alert {id}"));
        return Ok(());
    };

    let alert = Alert::from_bytes(&snapshot)?;
    println!("{}", serde_json::to_string_pretty(&alert)?);
    println!("hash: {}", alert.hash());
    Ok(())
}
