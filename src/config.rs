//! Player configuration
//!
//! Everything the player needs to know about its environment: where the
//! processing module lives, which parameters it exposes, the control ranges,
//! and every user-facing string. Defaults reproduce the stock French UI.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PlayerError, Result};

/// Default location of the SoundTouch worklet bundle
pub const DEFAULT_MODULE_URL: &str =
    "https://cdn.jsdelivr.net/npm/@soundtouchjs/audio-worklet@0.2.1/dist/soundtouch-worklet.js";

/// Processor name registered by the SoundTouch worklet
pub const DEFAULT_PROCESSOR_NAME: &str = "soundtouch-processor";

/// Top-level player configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub worklet: WorkletConfig,
    pub tempo: RangeSpec,
    pub pitch: RangeSpec,
    pub playback: PlaybackConfig,
    pub labels: Labels,
}

/// External processing module settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkletConfig {
    /// URL the module definition is fetched from
    pub module_url: String,
    /// Name the module registers its processor under
    pub processor_name: String,
    pub params: ParamNames,
}

impl Default for WorkletConfig {
    fn default() -> Self {
        Self {
            module_url: DEFAULT_MODULE_URL.to_string(),
            processor_name: DEFAULT_PROCESSOR_NAME.to_string(),
            params: ParamNames::default(),
        }
    }
}

/// Names of the automatable parameters on the processing node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamNames {
    pub tempo: String,
    pub pitch: String,
    pub rate: String,
}

impl Default for ParamNames {
    fn default() -> Self {
        Self {
            tempo: "tempo".to_string(),
            pitch: "pitchSemitones".to_string(),
            rate: "rate".to_string(),
        }
    }
}

/// Range of a user control
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeSpec {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default: f64,
}

impl RangeSpec {
    /// Tempo ratio range: 0.5x to 2x
    pub const TEMPO: RangeSpec = RangeSpec {
        min: 0.5,
        max: 2.0,
        step: 0.01,
        default: 1.0,
    };

    /// Pitch range: one octave either way, whole semitones
    pub const PITCH: RangeSpec = RangeSpec {
        min: -12.0,
        max: 12.0,
        step: 1.0,
        default: 0.0,
    };

    /// Clamp a value into `[min, max]`
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Clamp `value`, then move it to the nearest step counted from `min`,
    /// the way a range input does.
    pub fn snap(&self, value: f64) -> f64 {
        let steps = ((self.clamp(value) - self.min) / self.step).round();
        // Trim the float noise of the multiplication (0.5 + 30 * 0.01).
        let snapped = ((self.min + steps * self.step) * 1e9).round() / 1e9;
        self.clamp(snapped)
    }

    fn validate(&self, name: &str) -> Result<()> {
        let finite = [self.min, self.max, self.step, self.default]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(PlayerError::Config {
                reason: format!("{name} range contains a non-finite value"),
            });
        }
        if self.min >= self.max {
            return Err(PlayerError::Config {
                reason: format!("{name} range min {} is not below max {}", self.min, self.max),
            });
        }
        if self.step <= 0.0 {
            return Err(PlayerError::Config {
                reason: format!("{name} step must be positive"),
            });
        }
        if self.default < self.min || self.default > self.max {
            return Err(PlayerError::Config {
                reason: format!(
                    "{name} default {} outside [{}, {}]",
                    self.default, self.min, self.max
                ),
            });
        }
        Ok(())
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            worklet: WorkletConfig::default(),
            tempo: RangeSpec::TEMPO,
            pitch: RangeSpec::PITCH,
            playback: PlaybackConfig::default(),
            labels: Labels::default(),
        }
    }
}

/// Transport policy switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Start native playback even when the processing module failed to load.
    /// Tempo and pitch are inert in that case.
    pub allow_unprocessed: bool,
    /// Pause when the page is hidden while playing
    pub pause_when_hidden: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            allow_unprocessed: true,
            pause_when_hidden: true,
        }
    }
}

/// User-facing strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub play: String,
    pub pause: String,
    pub semitone: String,
    pub semitones: String,
    pub local_file_artist: String,
    /// Appended after the file size in MiB
    pub file_hint_suffix: String,
    pub status_loading: String,
    pub status_ready: String,
    pub status_failed: String,
    pub alert_module_failed: String,
    pub alert_no_source: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            play: "Lecture".to_string(),
            pause: "Pause".to_string(),
            semitone: "demi-ton".to_string(),
            semitones: "demi-tons".to_string(),
            local_file_artist: "Fichier local".to_string(),
            file_hint_suffix: "Mo — lu uniquement dans ton navigateur.".to_string(),
            status_loading: "Chargement du moteur de time-stretching…".to_string(),
            status_ready: "Graph audio initialisé (SoundTouch actif)".to_string(),
            status_failed: "Erreur AudioWorklet. Essaie sur Chrome/Edge récents.".to_string(),
            alert_module_failed: "Impossible d'initialiser le moteur de time-stretching.\n\
                Vérifie ton navigateur (Chrome/Edge récents) ou ta connexion réseau (CDN jsDelivr)."
                .to_string(),
            alert_no_source: "Commence par importer un fichier MP3.".to_string(),
        }
    }
}

impl PlayerConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON configuration. Missing sections take their defaults,
    /// but a range, when given, must be complete.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PlayerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check ranges and required worklet settings
    pub fn validate(&self) -> Result<()> {
        if self.worklet.module_url.trim().is_empty() {
            return Err(PlayerError::Config {
                reason: "worklet module_url is empty".to_string(),
            });
        }
        if self.worklet.processor_name.trim().is_empty() {
            return Err(PlayerError::Config {
                reason: "worklet processor_name is empty".to_string(),
            });
        }
        self.tempo.validate("tempo")?;
        self.pitch.validate("pitch")?;
        Ok(())
    }
}
