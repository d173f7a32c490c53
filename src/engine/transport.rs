//! Transport State Machine for Retempo
//!
//! Tracks whether a source is loaded and whether it is playing. The
//! asynchronous work around a play request (graph bootstrap, context resume,
//! native play) lives in the player session; this type only records the
//! transitions that actually happened.

use std::fmt;

use tracing::{debug, warn};

use crate::error::{PlayerError, Result};

/// Transport states
///
/// "Ended" is not a state of its own: natural end of stream passes straight
/// through to [`TransportState::Paused`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    /// No file selected yet (default state)
    #[default]
    NoSource,
    /// A file is selected and has not been played
    ReadyToPlay,
    /// Native playback is running
    Playing,
    /// Paused by the user, end of stream, or the page being hidden
    Paused,
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportState::NoSource => write!(f, "NoSource"),
            TransportState::ReadyToPlay => write!(f, "ReadyToPlay"),
            TransportState::Playing => write!(f, "Playing"),
            TransportState::Paused => write!(f, "Paused"),
        }
    }
}

/// Why playback stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    /// The user pressed pause
    User,
    /// The stream reached its natural end
    Ended,
    /// The page became hidden while playing
    Hidden,
}

impl fmt::Display for PauseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PauseReason::User => write!(f, "user"),
            PauseReason::Ended => write!(f, "ended"),
            PauseReason::Hidden => write!(f, "hidden"),
        }
    }
}

/// Manages transport state for one player session
#[derive(Debug, Clone, Default)]
pub struct Transport {
    /// Current transport state
    state: TransportState,

    /// Why the last pause happened, if any
    last_pause: Option<PauseReason>,
}

impl Transport {
    /// Create a transport with no source
    ///
    /// # Example
    /// ```
    /// use retempo::engine::{Transport, TransportState};
    /// let transport = Transport::new();
    /// assert_eq!(transport.state(), TransportState::NoSource);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// A file was selected
    ///
    /// State transition: Any -> ReadyToPlay
    pub fn source_selected(&mut self) {
        debug!(from = %self.state, "[TRANSPORT] Source selected");
        self.state = TransportState::ReadyToPlay;
        self.last_pause = None;
    }

    /// Guard for a play request: a source must be loaded
    ///
    /// # Example
    /// ```
    /// use retempo::engine::Transport;
    /// let mut transport = Transport::new();
    /// assert!(transport.check_can_play().is_err());
    /// transport.source_selected();
    /// assert!(transport.check_can_play().is_ok());
    /// ```
    pub fn check_can_play(&self) -> Result<()> {
        if self.has_source() {
            Ok(())
        } else {
            Err(PlayerError::NoSource)
        }
    }

    /// Native playback started
    ///
    /// State transitions:
    /// - ReadyToPlay -> Playing
    /// - Paused -> Playing
    /// - Playing -> Playing (no-op)
    /// - NoSource -> NoSource (ignored)
    pub fn started(&mut self) {
        match self.state {
            TransportState::ReadyToPlay | TransportState::Paused => {
                self.state = TransportState::Playing;
                debug!("[TRANSPORT] Playing");
            }
            TransportState::Playing => {
                debug!("[TRANSPORT] Already playing");
            }
            TransportState::NoSource => {
                warn!("[TRANSPORT] Playback started without a source - ignored");
            }
        }
    }

    /// Playback stopped
    ///
    /// State transitions:
    /// - Playing -> Paused
    /// - anything else: no-op
    ///
    /// Returns whether the state changed.
    ///
    /// # Example
    /// ```
    /// use retempo::engine::{PauseReason, Transport, TransportState};
    /// let mut transport = Transport::new();
    /// transport.source_selected();
    /// transport.started();
    /// assert!(transport.pause(PauseReason::Hidden));
    /// assert_eq!(transport.state(), TransportState::Paused);
    /// ```
    pub fn pause(&mut self, reason: PauseReason) -> bool {
        if self.state != TransportState::Playing {
            debug!(%reason, state = %self.state, "[TRANSPORT] Not playing, pause ignored");
            return false;
        }
        self.state = TransportState::Paused;
        self.last_pause = Some(reason);
        debug!(%reason, "[TRANSPORT] Paused");
        true
    }

    // ========================================================================
    // State Queries
    // ========================================================================

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn has_source(&self) -> bool {
        self.state != TransportState::NoSource
    }

    /// Reason for the most recent pause since the source was selected
    pub fn last_pause(&self) -> Option<PauseReason> {
        self.last_pause
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
