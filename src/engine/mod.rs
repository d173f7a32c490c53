//! Audio Engine Module
//!
//! Everything between the UI events and the external audio platform:
//! - Host abstraction (context, processing node, media element, view)
//! - Graph bootstrap
//! - Control binding
//! - Transport state machine
//! - Position tracking

pub mod bootstrap;
pub mod controls;
pub mod graph;
pub mod mock;
pub mod position;
pub mod transport;

pub use bootstrap::{GraphBootstrapper, GraphLifecycle};
pub use controls::{ControlKind, ControlState};
pub use graph::{
    AudioGraphContext, AudioHost, ContextState, MediaElement, PlaybackSource, PlayerView,
    ProcessingNode, SourceInfo,
};
pub use position::PositionReadout;
pub use transport::{PauseReason, Transport, TransportState};
