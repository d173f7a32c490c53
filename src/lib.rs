//! Retempo - Tempo and Pitch Audio Player
//!
//! Plays a local audio file with tempo (speed ratio) and pitch (semitone
//! shift) adjustable independently of each other. The time-stretching itself
//! is done by an external real-time processing module loaded at runtime;
//! this crate owns everything around it:
//!
//! - Audio graph lifecycle: lazy, one-shot, retryable bootstrap
//! - Parameter routing from the controls to the live processing node
//! - Transport state machine (play, pause, end of stream, page hidden)
//! - Clock, progress and label formatting
//!
//! # Architecture
//!
//! [`player::PlayerSession`] is generic over an [`engine::AudioHost`] and a
//! [`engine::PlayerView`]. The `web` feature provides the browser host
//! (`AudioContext` + `AudioWorkletNode` + `<audio>`); [`engine::mock`]
//! provides a scriptable host for tests.

pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod player;

#[cfg(feature = "web")]
pub mod web;

pub use config::PlayerConfig;
pub use error::{PlayerError, Result};
pub use player::{PlayerCommand, PlayerSession};
