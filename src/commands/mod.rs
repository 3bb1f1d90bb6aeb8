//! CLI command implementations.

mod auth_cmd;
mod sync_cmd;

pub use auth_cmd::{LoginCommand, RegisterCommand, VerifyCommand};
pub use sync_cmd::{PullCommand, PushCommand, StatusCommand};

use crate::client::ClientError;
use crate::config::ConfigError;

/// Errors from CLI commands
#[derive(Debug)]
pub enum CommandError {
    Client(ClientError),
    Config(ConfigError),
    Io(std::io::Error),
    Json(serde_json::Error),
    Usage(String),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Client(e) => write!(f, "{}", e),
            CommandError::Config(e) => write!(f, "{}", e),
            CommandError::Io(e) => write!(f, "{}", e),
            CommandError::Json(e) => write!(f, "{}", e),
            CommandError::Usage(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Client(e) => Some(e),
            CommandError::Config(e) => Some(e),
            CommandError::Io(e) => Some(e),
            CommandError::Json(e) => Some(e),
            CommandError::Usage(_) => None,
        }
    }
}

impl From<ClientError> for CommandError {
    fn from(e: ClientError) -> Self {
        CommandError::Client(e)
    }
}

impl From<ConfigError> for CommandError {
    fn from(e: ConfigError) -> Self {
        CommandError::Config(e)
    }
}

impl From<std::io::Error> for CommandError {
    fn from(e: std::io::Error) -> Self {
        CommandError::Io(e)
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(e: serde_json::Error) -> Self {
        CommandError::Json(e)
    }
}
