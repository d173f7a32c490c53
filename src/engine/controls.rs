//! Control binding
//!
//! Tempo and pitch controls feed both their display label and, once the graph
//! exists, the matching live parameter on the processing node. Writes are
//! immediate and last-write-wins; there is no queue.

use std::fmt;

use tracing::debug;

use super::graph::ProcessingNode;
use crate::config::{Labels, ParamNames, PlayerConfig, RangeSpec};
use crate::error::{PlayerError, Result};
use crate::format::{pitch_label, tempo_label};

/// The two user controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    /// Speed ratio, pitch preserved
    Tempo,
    /// Semitone offset, speed preserved
    Pitch,
}

impl ControlKind {
    /// Name of the live parameter this control drives
    pub fn param_name<'a>(&self, names: &'a ParamNames) -> &'a str {
        match self {
            ControlKind::Tempo => &names.tempo,
            ControlKind::Pitch => &names.pitch,
        }
    }

    pub fn range(&self, config: &PlayerConfig) -> RangeSpec {
        match self {
            ControlKind::Tempo => config.tempo,
            ControlKind::Pitch => config.pitch,
        }
    }

    /// Display label for `value`
    pub fn label(&self, value: f64, labels: &Labels) -> String {
        match self {
            ControlKind::Tempo => tempo_label(value),
            ControlKind::Pitch => pitch_label(value, labels),
        }
    }

    /// Parse a raw control value.
    ///
    /// The value is clamped into `range` and snapped to its step, which for
    /// the stock pitch range means whole semitones.
    pub fn parse(&self, raw: &str, range: &RangeSpec) -> Result<f64> {
        let value: f64 = raw
            .trim()
            .parse()
            .ok()
            .filter(|v: &f64| v.is_finite())
            .ok_or_else(|| PlayerError::InvalidControlValue {
                control: self.to_string(),
                raw: raw.to_string(),
            })?;
        Ok(range.snap(value))
    }
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlKind::Tempo => write!(f, "tempo"),
            ControlKind::Pitch => write!(f, "pitch"),
        }
    }
}

/// Current control values, mirrored into the node whenever it exists
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlState {
    /// Tempo ratio (1.0 = original speed)
    pub tempo: f64,
    /// Pitch offset in semitones
    pub pitch: f64,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            tempo: 1.0,
            pitch: 0.0,
        }
    }
}

impl ControlState {
    /// Initial values from the configured control defaults
    pub fn from_config(config: &PlayerConfig) -> Self {
        Self {
            tempo: config.tempo.snap(config.tempo.default),
            pitch: config.pitch.snap(config.pitch.default),
        }
    }

    pub fn get(&self, kind: ControlKind) -> f64 {
        match kind {
            ControlKind::Tempo => self.tempo,
            ControlKind::Pitch => self.pitch,
        }
    }

    pub fn with(self, kind: ControlKind, value: f64) -> Self {
        match kind {
            ControlKind::Tempo => Self {
                tempo: value,
                ..self
            },
            ControlKind::Pitch => Self {
                pitch: value,
                ..self
            },
        }
    }
}

/// Write a value into a live parameter, skipping parameters the node lacks.
///
/// Returns whether the write happened. Runs on every slider tick, so a
/// missing parameter is only traced here; seeding reports it once.
pub fn write_param<N: ProcessingNode>(node: &N, name: &str, value: f64) -> bool {
    let written = node.set_param(name, value);
    if written {
        debug!(param = name, value, "live parameter updated");
    } else {
        debug!(param = name, "parameter not exposed, skipped");
    }
    written
}
