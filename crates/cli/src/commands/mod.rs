pub mod alert;
pub mod config;
pub mod events;
pub mod utils;

pub use alert::{handle_alert_command, AlertCommands};
pub use config::{handle_config_command, ConfigCommands};
pub use events::{handle_events_command, EventsCommands};
