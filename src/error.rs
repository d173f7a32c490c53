//! Error handling for Retempo
//!
//! Every failure leaves the player in a consistent, re-attemptable state.
//! Errors carry a stable code plus recovery suggestions for the status line.

use thiserror::Error;

/// Result type alias for Retempo operations
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Main error type for player operations
#[derive(Error, Debug)]
pub enum PlayerError {
    // Transport Errors
    #[error("No audio file selected")]
    NoSource,

    #[error("Playback rejected by the platform: {reason}")]
    PlaybackRejected { reason: String },

    // Audio Graph Errors
    #[error("Failed to create audio context: {reason}")]
    ContextCreation { reason: String },

    #[error("Failed to resume audio context: {reason}")]
    ContextResume { reason: String },

    #[error("Failed to load processing module from {url}: {reason}")]
    ModuleLoad { url: String, reason: String },

    #[error("Failed to create processing node '{processor}': {reason}")]
    NodeCreation { processor: String, reason: String },

    #[error("Failed to connect audio graph: {reason}")]
    GraphConnection { reason: String },

    /// Reported to callers that waited on someone else's failed attempt
    #[error("Audio graph unavailable: {reason}")]
    GraphUnavailable { reason: String },

    // Control Errors
    #[error("Invalid value for {control}: '{raw}'")]
    InvalidControlValue { control: String, raw: String },

    // Source Errors
    #[error("Failed to open audio file: {reason}")]
    SourceAttach { reason: String },

    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PlayerError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            PlayerError::NoSource => "NO_SOURCE",
            PlayerError::PlaybackRejected { .. } => "PLAYBACK_REJECTED",
            PlayerError::ContextCreation { .. } => "CONTEXT_CREATION",
            PlayerError::ContextResume { .. } => "CONTEXT_RESUME",
            PlayerError::ModuleLoad { .. } => "MODULE_LOAD",
            PlayerError::NodeCreation { .. } => "NODE_CREATION",
            PlayerError::GraphConnection { .. } => "GRAPH_CONNECTION",
            PlayerError::GraphUnavailable { .. } => "GRAPH_UNAVAILABLE",
            PlayerError::InvalidControlValue { .. } => "INVALID_CONTROL_VALUE",
            PlayerError::SourceAttach { .. } => "SOURCE_ATTACH",
            PlayerError::Config { .. } => "CONFIG_ERROR",
            PlayerError::Io(_) => "IO_ERROR",
            PlayerError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the user can recover by retrying the same action
    pub fn is_recoverable(&self) -> bool {
        match self {
            PlayerError::NoSource => true,
            PlayerError::PlaybackRejected { .. } => true,
            PlayerError::ContextResume { .. } => true,
            PlayerError::ModuleLoad { .. } => true,
            PlayerError::GraphConnection { .. } => true,
            PlayerError::GraphUnavailable { .. } => true,
            PlayerError::InvalidControlValue { .. } => true,
            PlayerError::SourceAttach { .. } => true,
            _ => false,
        }
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            PlayerError::NoSource => vec!["Select an audio file before pressing play"],
            PlayerError::PlaybackRejected { .. } => vec![
                "Press play again; browsers only start audio after a user gesture",
                "Check that the file is a format your browser can decode",
            ],
            PlayerError::ModuleLoad { .. } => vec![
                "Use a recent Chromium-based browser (Chrome, Edge) with AudioWorklet support",
                "Check your network connection to the module CDN",
                "Press play again to retry loading the module",
            ],
            PlayerError::NodeCreation { .. } => vec![
                "The loaded module does not register the configured processor name",
                "Check the processor name in the player configuration",
            ],
            PlayerError::ContextCreation { .. } | PlayerError::ContextResume { .. } => {
                vec!["Reload the page and press play again"]
            }
            PlayerError::GraphConnection { .. } | PlayerError::GraphUnavailable { .. } => {
                vec!["Press play again to retry building the audio graph"]
            }
            PlayerError::SourceAttach { .. } => vec!["Try selecting the file again"],
            PlayerError::Config { .. } => vec!["Fix the player configuration and reload"],
            _ => vec![],
        }
    }

    /// Get a user-friendly message for this error
    pub fn friendly_message(&self) -> String {
        match self {
            PlayerError::NoSource => "Pick an audio file first, then press play.".to_string(),
            PlayerError::ModuleLoad { .. } => {
                "The time-stretching engine could not be loaded. Tempo and pitch \
                 controls stay inactive until it loads; press play to retry."
                    .to_string()
            }
            PlayerError::PlaybackRejected { .. } => {
                "The browser refused to start playback. Press play again.".to_string()
            }
            _ => self.to_string(),
        }
    }
}
