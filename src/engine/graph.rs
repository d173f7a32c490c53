//! Host abstraction
//!
//! The player never decodes audio or runs DSP itself. It drives four external
//! collaborators through these traits: the audio host (which creates the
//! real-time graph context), the context, the processing node loaded from
//! the external module, and the native media element. [`PlayerView`] is the
//! output surface.
//!
//! All traits are single-threaded: methods take `&self` and implementations
//! use interior mutability, the same way browser handles behave.

use std::fmt;
use std::future::Future;

use crate::error::Result;

/// Power state of an audio context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextState {
    #[default]
    Running,
    /// Created without a user gesture, or suspended by the platform
    Suspended,
    Closed,
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextState::Running => write!(f, "running"),
            ContextState::Suspended => write!(f, "suspended"),
            ContextState::Closed => write!(f, "closed"),
        }
    }
}

/// Platform entry point for the real-time audio graph
pub trait AudioHost {
    /// The native media element whose output feeds the graph
    type Media: MediaElement;
    type Context: AudioGraphContext<Media = Self::Media>;

    /// Create the audio context. Called at most once per session.
    fn create_context(&self) -> Result<Self::Context>;
}

/// A live audio graph container
pub trait AudioGraphContext {
    type Media;
    type Node: ProcessingNode;

    /// Fetch and register an external processing module definition
    fn add_module(&self, url: &str) -> impl Future<Output = Result<()>>;

    /// Instantiate a processor registered by a loaded module
    fn create_node(&self, processor: &str) -> Result<Self::Node>;

    /// Route the media element's output into `node`
    fn connect_media(&self, media: &Self::Media, node: &Self::Node) -> Result<()>;

    /// Route `node` into the output device
    fn connect_destination(&self, node: &Self::Node) -> Result<()>;

    fn state(&self) -> ContextState;

    fn resume(&self) -> impl Future<Output = Result<()>>;
}

/// The externally loaded time-stretch / pitch-shift unit
pub trait ProcessingNode {
    /// Write `value` into parameter `name`. Returns `false` if the parameter
    /// does not exist on this node.
    fn set_param(&self, name: &str, value: f64) -> bool;
}

/// What the player shows about a selected file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub name: String,
    pub size_bytes: u64,
}

/// A transient playable handle for the loaded file (an object URL in browsers)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSource {
    pub handle: String,
    pub info: SourceInfo,
}

/// The native media element: decode, transport, position notifications
pub trait MediaElement {
    /// A user-selected file as the platform represents it
    type File;

    fn describe(&self, file: &Self::File) -> SourceInfo;

    /// Point the element at `file` and start loading it
    fn attach(&self, file: &Self::File) -> Result<PlaybackSource>;

    /// Release a handle previously returned by [`MediaElement::attach`]
    fn release(&self, source: &PlaybackSource);

    /// Start native playback. The platform may reject the request.
    fn play(&self) -> impl Future<Output = Result<()>>;

    fn pause(&self);

    fn is_paused(&self) -> bool;

    /// Playback position in seconds
    fn current_time(&self) -> f64;

    /// Duration in seconds; NaN while unknown
    fn duration(&self) -> f64;
}

/// Output surface of the player
pub trait PlayerView {
    fn show_track(&self, title: &str, artist: &str, hint: &str);
    fn set_play_enabled(&self, enabled: bool);
    fn set_play_label(&self, label: &str);
    /// Toggle the "now playing" visual cue
    fn set_now_playing(&self, playing: bool);
    fn set_clock(&self, elapsed: &str, total: &str);
    /// Progress bar fill, 0..=100
    fn set_progress(&self, percent: f64);
    fn set_status(&self, text: &str);
    /// Toggle the binary "ready" indicator next to the status line
    fn set_ready(&self, ready: bool);
    fn set_tempo_label(&self, label: &str);
    fn set_pitch_label(&self, label: &str);
    /// Blocking user-facing message
    fn alert(&self, message: &str);
}
