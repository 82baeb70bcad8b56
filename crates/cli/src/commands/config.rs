use std::path::Path;

use alerting_core::config::{AppConfig, DEFAULT_CONFIG_PATH};
use clap::Subcommand;

use super::utils::{print_error, print_info, print_success, CliError, CliResult};

const SAMPLE_CONFIG: &str = r#"# Alerting service configuration
# Every value below is the compiled default unless noted.

environment = "development"

# Stream backend for the intake, store and event topics: "memory" or "redis"
[broker]
backend = "memory"
# redis_url = "redis://127.0.0.1:6379"

# Snapshot store: "memory" or "redis"
[storage]
backend = "memory"
# redis_url = "redis://127.0.0.1:6379"
key_prefix = "alert"
# Snapshot expiry in seconds, 0 disables expiry
ttl_seconds = 0

[topics]
intake = "test.alert"
store = "alert.store"
event = "alert.event"

[processor]
workers = 4
queue_capacity = 1024
mirror_to_store_topic = true
report_refire = false
# "report" keeps consuming after a failed transition, "halt" stops the service
failure_policy = "report"

[processor.retry]
max_retries = 3
base_delay_ms = 100
max_delay_ms = 2000
jitter_factor = 0.2

[metrics]
enabled = true
prometheus_port = 9090

[logging]
level = "info"
format = "pretty"
"#;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate the current configuration
    Validate {
        /// Path to config file (defaults to config/config.toml)
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        file: String,
    },

    /// Show current configuration
    Show {
        /// Path to config file (defaults to config/config.toml)
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        file: String,

        /// Show sensitive values (like Redis URLs)
        #[arg(long)]
        show_sensitive: bool,
    },

    /// Generate a sample configuration file
    Generate {
        /// Output path for the config file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        output: String,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn handle_config_command(command: ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Validate { file } => validate_config(&file),
        ConfigCommands::Show { file, show_sensitive } => show_config(&file, show_sensitive),
        ConfigCommands::Generate { output, force } => generate_config(&output, force),
    }
}

fn validate_config(file: &str) -> CliResult<()> {
    if !Path::new(file).exists() {
        print_error(&format!("Configuration file not found: {file}"));
        return Err(CliError::Config(format!("File not found: {file}")));
    }

    print_info(&format!("Loading configuration from {file}..."));

    let config = AppConfig::from_file(file).map_err(|e| CliError::Config(e.to_string()))?;

    print_info("Validating configuration...");
    config.validate().map_err(CliError::Config)?;

    print_success("Configuration is valid!");

    println!("Configuration Summary:");
    println!("  Broker: {}", config.broker.backend.as_str());
    println!("  Storage: {}", config.storage.backend.as_str());
    println!(
        "  Topics: {} -> {} / {}",
        config.topics.intake, config.topics.store, config.topics.event
    );
    println!("  Workers: {}", config.processor.workers);
    println!(
        "  Metrics: {}",
        if config.metrics.enabled {
            "enabled"
        } else {
            "disabled"
        }
    );

    Ok(())
}

fn redact(url: Option<&str>, show_sensitive: bool) -> String {
    match url {
        None => "(not set)".to_string(),
        Some(url) if show_sensitive => url.to_string(),
        Some(_) => "[hidden - use --show-sensitive to reveal]".to_string(),
    }
}

fn show_config(file: &str, show_sensitive: bool) -> CliResult<()> {
    let config = AppConfig::from_file(file).map_err(|e| CliError::Config(e.to_string()))?;

    println!("Configuration from {file}:");
    println!("  Environment: {}", config.environment);

    println!("\n[Broker]");
    println!("  Backend: {}", config.broker.backend.as_str());
    println!("  Redis URL: {}", redact(config.broker.redis_url.as_deref(), show_sensitive));

    println!("\n[Storage]");
    println!("  Backend: {}", config.storage.backend.as_str());
    println!("  Redis URL: {}", redact(config.storage.redis_url.as_deref(), show_sensitive));
    println!("  Key Prefix: {}", config.storage.key_prefix);
    match config.storage_ttl() {
        Some(ttl) => println!("  TTL: {}s", ttl.as_secs()),
        None => println!("  TTL: none"),
    }

    println!("\n[Topics]");
    println!("  Intake: {}", config.topics.intake);
    println!("  Store: {}", config.topics.store);
    println!("  Event: {}", config.topics.event);

    let processor = &config.processor;
    println!("\n[Processor]");
    println!("  Workers: {}", processor.workers);
    println!("  Queue Capacity: {}", processor.queue_capacity);
    println!("  Mirror To Store Topic: {}", processor.mirror_to_store_topic);
    println!("  Report Re-fire: {}", processor.report_refire);
    println!("  Failure Policy: {:?}", processor.failure_policy);
    println!(
        "  Retry: {} retries, {}ms base, {}ms max, jitter {}",
        processor.retry.max_retries,
        processor.retry.base_delay_ms,
        processor.retry.max_delay_ms,
        processor.retry.jitter_factor
    );

    println!("\n[Metrics]");
    println!("  Enabled: {}", config.metrics.enabled);
    if let Some(port) = config.metrics.prometheus_port {
        println!("  Prometheus Port: {port}");
    }

    println!("\n[Logging]");
    println!("  Level: {}", config.logging.level);
    println!("  Format: {}", config.logging.format);

    Ok(())
}

fn generate_config(output: &str, force: bool) -> CliResult<()> {
    if Path::new(output).exists() && !force {
        return Err(CliError::Config(format!(
            "File {output} already exists. Use --force to overwrite."
        )));
    }

    if let Some(parent) = Path::new(output).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, SAMPLE_CONFIG)?;

    print_success(&format!("Sample configuration generated: {output}"));
    print_info("Remember to:");
    print_info("  1. Switch broker and storage to \"redis\" for multi-process deployments");
    print_info("  2. Set a storage TTL if stale snapshots should expire");

    Ok(())
}
