use std::fmt;

use alerting_core::{
    alerts::AlertError,
    config::AppConfig,
    ports::{StorageError, StreamError},
};

#[derive(Debug)]
pub enum CliError {
    Config(String),
    Io(String),
    Transport(String),
    Alert(String),
    General(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Transport(msg) => write!(f, "Transport error: {msg}"),
            Self::Alert(msg) => write!(f, "Alert error: {msg}"),
            Self::General(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(error: serde_json::Error) -> Self {
        Self::General(error.to_string())
    }
}

impl From<AlertError> for CliError {
    fn from(error: AlertError) -> Self {
        Self::Alert(error.to_string())
    }
}

impl From<StorageError> for CliError {
    fn from(error: StorageError) -> Self {
        Self::Transport(error.to_string())
    }
}

impl From<StreamError> for CliError {
    fn from(error: StreamError) -> Self {
        Self::Transport(error.to_string())
    }
}

pub type CliResult<T> = Result<T, CliError>;

/// Loads and validates the configuration at `file`, with environment overrides.
pub fn load_config(file: &str) -> CliResult<AppConfig> {
    let config = AppConfig::from_file(file).map_err(|e| CliError::Config(e.to_string()))?;
    config.validate().map_err(CliError::Config)?;
    Ok(config)
}

pub fn print_success(message: &str) {
    println!("[SUCCESS] {message}");
}

pub fn print_error(message: &str) {
    eprintln!("[ERROR] {message}");
}

pub fn print_info(message: &str) {
    println!("[INFO] {message}");
}

pub fn print_warning(message: &str) {
    eprintln!("[WARN] {message}");
}
