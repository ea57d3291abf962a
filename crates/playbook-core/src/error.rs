use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaybookError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown hook phase: {phase}")]
    UnknownPhase { phase: String },

    #[error("Option with key '{key}' already exists")]
    OptionAlreadyExists { key: String },

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Circuit open for '{name}', {remaining_ms}ms until reset")]
    CircuitOpen { name: String, remaining_ms: u64 },

    #[error("Action group '{name}': {} of {total} children failed", .failures.len())]
    Aggregate {
        name: String,
        total: usize,
        failures: Vec<(String, Arc<PlaybookError>)>,
    },

    #[error("Menu error: {reason}")]
    Menu {
        reason: String,
        #[source]
        source: Option<Box<PlaybookError>>,
    },

    #[error("{original} (on_error hook '{hook}' also failed: {cause})")]
    ErrorHookFailed {
        original: Box<PlaybookError>,
        hook: String,
        cause: Box<PlaybookError>,
    },

    #[error("Action failed: {0}")]
    Action(String),

    #[error("Interrupted")]
    Interrupted,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlaybookError {
    /// Short error code string for log correlation and headless exit reporting.
    pub fn code(&self) -> &'static str {
        match self {
            PlaybookError::Config(_) => "CONFIG_ERROR",
            PlaybookError::UnknownPhase { .. } => "UNKNOWN_PHASE",
            PlaybookError::OptionAlreadyExists { .. } => "OPTION_ALREADY_EXISTS",
            PlaybookError::InvalidAction(_) => "INVALID_ACTION",
            PlaybookError::CircuitOpen { .. } => "CIRCUIT_OPEN",
            PlaybookError::Aggregate { .. } => "AGGREGATE_ERROR",
            PlaybookError::Menu { .. } => "MENU_ERROR",
            PlaybookError::ErrorHookFailed { .. } => "ERROR_HOOK_FAILED",
            PlaybookError::Action(_) => "ACTION_ERROR",
            PlaybookError::Interrupted => "INTERRUPTED",
            PlaybookError::Serialization(_) => "SERIALIZATION_ERROR",
            PlaybookError::Io(_) => "IO_ERROR",
        }
    }

    /// Convenience constructor for user-callable failures.
    pub fn action(message: impl Into<String>) -> Self {
        PlaybookError::Action(message.into())
    }

    /// Convenience constructor for menu dispatch failures wrapping a cause.
    pub fn menu(reason: impl Into<String>, source: Option<PlaybookError>) -> Self {
        PlaybookError::Menu {
            reason: reason.into(),
            source: source.map(Box::new),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlaybookError>;
