use clap::{Parser, Subcommand};

mod commands;
use commands::{
    handle_alert_command, handle_config_command, handle_events_command, AlertCommands,
    ConfigCommands, EventsCommands,
};

#[derive(Parser)]
#[command(name = "alerting-cli")]
#[command(about = "Alerting CLI - publish, inspect and watch alerts and manage configuration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Alert publishing and inspection
    #[command(subcommand)]
    Alert(AlertCommands),

    /// Configuration Management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Lifecycle event monitoring
    #[command(subcommand)]
    Events(EventsCommands),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Alert(alert_command) => handle_alert_command(alert_command).await?,
        Commands::Config(config_command) => handle_config_command(config_command)?,
        Commands::Events(events_command) => handle_events_command(events_command).await?,
    }

    Ok(())
}
