//! Mock host implementations for testing
//!
//! These stand in for the browser: no audio is produced, but every call is
//! counted and failures can be scripted, so the session's lifecycle can be
//! checked end to end without a platform.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use tokio::sync::Notify;

use super::graph::{
    AudioGraphContext, AudioHost, ContextState, MediaElement, PlaybackSource, PlayerView,
    ProcessingNode, SourceInfo,
};
use crate::config::DEFAULT_PROCESSOR_NAME;
use crate::error::{PlayerError, Result};

// ============================================================================
// Audio host
// ============================================================================

#[derive(Debug)]
struct HostState {
    exposed_params: Vec<String>,
    processor_name: String,
    contexts_created: Cell<usize>,
    module_loads: Cell<usize>,
    nodes_created: Cell<usize>,
    resumes: Cell<usize>,
    fail_loads: Cell<usize>,
    fail_destination: Cell<usize>,
    fail_context: Cell<bool>,
    fail_resume: Cell<bool>,
    start_suspended: Cell<bool>,
    registered: RefCell<Vec<String>>,
    connections: RefCell<Vec<String>>,
    load_gate: RefCell<Option<Rc<Notify>>>,
    last_node: RefCell<Option<MockNode>>,
}

/// Mock audio host; clones share state so tests can keep a handle
#[derive(Debug, Clone)]
pub struct MockAudioHost {
    state: Rc<HostState>,
}

impl MockAudioHost {
    /// A host whose module exposes `tempo`, `pitchSemitones` and `rate`
    pub fn new() -> Self {
        Self::with_params(&["tempo", "pitchSemitones", "rate"])
    }

    /// A host whose module exposes only `params`
    pub fn with_params(params: &[&str]) -> Self {
        Self {
            state: Rc::new(HostState {
                exposed_params: params.iter().map(|p| p.to_string()).collect(),
                processor_name: DEFAULT_PROCESSOR_NAME.to_string(),
                contexts_created: Cell::new(0),
                module_loads: Cell::new(0),
                nodes_created: Cell::new(0),
                resumes: Cell::new(0),
                fail_loads: Cell::new(0),
                fail_destination: Cell::new(0),
                fail_context: Cell::new(false),
                fail_resume: Cell::new(false),
                start_suspended: Cell::new(false),
                registered: RefCell::new(Vec::new()),
                connections: RefCell::new(Vec::new()),
                load_gate: RefCell::new(None),
                last_node: RefCell::new(None),
            }),
        }
    }

    /// Fail the next `count` module loads with a simulated network error
    pub fn fail_next_module_loads(&self, count: usize) {
        self.state.fail_loads.set(count);
    }

    /// Fail the next `count` connections from a node to the destination
    pub fn fail_next_destination_connects(&self, count: usize) {
        self.state.fail_destination.set(count);
    }

    pub fn fail_context_creation(&self, fail: bool) {
        self.state.fail_context.set(fail);
    }

    pub fn fail_resume(&self, fail: bool) {
        self.state.fail_resume.set(fail);
    }

    /// Create contexts in the suspended state, as autoplay policies do
    pub fn start_suspended(&self, suspended: bool) {
        self.state.start_suspended.set(suspended);
    }

    /// Hold module loads until the returned gate is opened
    pub fn gate_module_loads(&self) -> LoadGate {
        let notify = Rc::new(Notify::new());
        *self.state.load_gate.borrow_mut() = Some(notify.clone());
        LoadGate { notify }
    }

    pub fn contexts_created(&self) -> usize {
        self.state.contexts_created.get()
    }

    pub fn module_loads(&self) -> usize {
        self.state.module_loads.get()
    }

    pub fn nodes_created(&self) -> usize {
        self.state.nodes_created.get()
    }

    pub fn resumes(&self) -> usize {
        self.state.resumes.get()
    }

    /// Graph edges in connection order, e.g. `media -> node#1`
    pub fn connections(&self) -> Vec<String> {
        self.state.connections.borrow().clone()
    }

    /// Current value of a parameter on the most recently created node
    pub fn param(&self, name: &str) -> Option<f64> {
        self.state
            .last_node
            .borrow()
            .as_ref()
            .and_then(|node| node.value(name))
    }

    /// Number of writes a parameter received on the latest node
    pub fn param_writes(&self, name: &str) -> usize {
        self.state
            .last_node
            .borrow()
            .as_ref()
            .map_or(0, |node| node.writes(name))
    }
}

impl Default for MockAudioHost {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioHost for MockAudioHost {
    type Media = MockMedia;
    type Context = MockContext;

    fn create_context(&self) -> Result<MockContext> {
        if self.state.fail_context.get() {
            return Err(PlayerError::ContextCreation {
                reason: "simulated: AudioContext unavailable".to_string(),
            });
        }
        self.state
            .contexts_created
            .set(self.state.contexts_created.get() + 1);
        let initial = if self.state.start_suspended.get() {
            ContextState::Suspended
        } else {
            ContextState::Running
        };
        Ok(MockContext {
            host: self.state.clone(),
            state: Cell::new(initial),
        })
    }
}

/// Opens a gated module load
#[derive(Debug, Clone)]
pub struct LoadGate {
    notify: Rc<Notify>,
}

impl LoadGate {
    /// Let one pending (or the next) module load proceed
    pub fn open(&self) {
        self.notify.notify_one();
    }
}

// ============================================================================
// Context and node
// ============================================================================

#[derive(Debug)]
pub struct MockContext {
    host: Rc<HostState>,
    state: Cell<ContextState>,
}

impl AudioGraphContext for MockContext {
    type Media = MockMedia;
    type Node = MockNode;

    async fn add_module(&self, url: &str) -> Result<()> {
        self.host.module_loads.set(self.host.module_loads.get() + 1);

        let gate = self.host.load_gate.borrow().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let remaining = self.host.fail_loads.get();
        if remaining > 0 {
            self.host.fail_loads.set(remaining - 1);
            return Err(PlayerError::ModuleLoad {
                url: url.to_string(),
                reason: "simulated network failure".to_string(),
            });
        }
        self.host
            .registered
            .borrow_mut()
            .push(self.host.processor_name.clone());
        Ok(())
    }

    fn create_node(&self, processor: &str) -> Result<MockNode> {
        if !self.host.registered.borrow().iter().any(|p| p == processor) {
            return Err(PlayerError::NodeCreation {
                processor: processor.to_string(),
                reason: "processor not registered".to_string(),
            });
        }
        let id = self.host.nodes_created.get() + 1;
        self.host.nodes_created.set(id);

        let node = MockNode {
            id,
            params: Rc::new(RefCell::new(
                self.host
                    .exposed_params
                    .iter()
                    .map(|name| (name.clone(), ParamSlot::default()))
                    .collect(),
            )),
        };
        *self.host.last_node.borrow_mut() = Some(node.clone());
        Ok(node)
    }

    fn connect_media(&self, media: &MockMedia, node: &MockNode) -> Result<()> {
        // A media element can only feed one graph.
        if media.routed.replace(true) {
            return Err(PlayerError::GraphConnection {
                reason: "media element already connected".to_string(),
            });
        }
        self.host
            .connections
            .borrow_mut()
            .push(format!("media -> node#{}", node.id));
        Ok(())
    }

    fn connect_destination(&self, node: &MockNode) -> Result<()> {
        let remaining = self.host.fail_destination.get();
        if remaining > 0 {
            self.host.fail_destination.set(remaining - 1);
            return Err(PlayerError::GraphConnection {
                reason: "simulated: output device unavailable".to_string(),
            });
        }
        self.host
            .connections
            .borrow_mut()
            .push(format!("node#{} -> destination", node.id));
        Ok(())
    }

    fn state(&self) -> ContextState {
        self.state.get()
    }

    async fn resume(&self) -> Result<()> {
        self.host.resumes.set(self.host.resumes.get() + 1);
        if self.host.fail_resume.get() {
            return Err(PlayerError::ContextResume {
                reason: "simulated resume failure".to_string(),
            });
        }
        self.state.set(ContextState::Running);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ParamSlot {
    value: Option<f64>,
    writes: usize,
}

/// Mock processing node; parameters start unset
#[derive(Debug, Clone)]
pub struct MockNode {
    id: usize,
    params: Rc<RefCell<BTreeMap<String, ParamSlot>>>,
}

impl MockNode {
    pub fn value(&self, name: &str) -> Option<f64> {
        self.params.borrow().get(name).and_then(|slot| slot.value)
    }

    pub fn writes(&self, name: &str) -> usize {
        self.params.borrow().get(name).map_or(0, |slot| slot.writes)
    }
}

impl ProcessingNode for MockNode {
    fn set_param(&self, name: &str, value: f64) -> bool {
        match self.params.borrow_mut().get_mut(name) {
            Some(slot) => {
                slot.value = Some(value);
                slot.writes += 1;
                true
            }
            None => false,
        }
    }
}

// ============================================================================
// Media element
// ============================================================================

/// A file as the mock media element sees it
#[derive(Debug, Clone, PartialEq)]
pub struct MockFile {
    pub name: String,
    pub size_bytes: u64,
    /// Duration reported once metadata has loaded
    pub duration: f64,
}

impl MockFile {
    pub fn new(name: &str, size_bytes: u64, duration: f64) -> Self {
        Self {
            name: name.to_string(),
            size_bytes,
            duration,
        }
    }
}

#[derive(Debug)]
struct MediaState {
    src: Option<String>,
    pending_duration: f64,
    duration: f64,
    current_time: f64,
    paused: bool,
    next_handle: usize,
    released: Vec<String>,
}

/// Mock native media element
#[derive(Debug)]
pub struct MockMedia {
    state: RefCell<MediaState>,
    routed: Cell<bool>,
    reject_play: Cell<bool>,
    play_calls: Cell<usize>,
    pause_calls: Cell<usize>,
}

impl MockMedia {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(MediaState {
                src: None,
                pending_duration: f64::NAN,
                duration: f64::NAN,
                current_time: 0.0,
                paused: true,
                next_handle: 0,
                released: Vec::new(),
            }),
            routed: Cell::new(false),
            reject_play: Cell::new(false),
            play_calls: Cell::new(0),
            pause_calls: Cell::new(0),
        }
    }

    /// Reject play requests, as a browser does without a user gesture
    pub fn reject_play(&self, reject: bool) {
        self.reject_play.set(reject);
    }

    /// Metadata arrived: the duration becomes known
    pub fn load_metadata(&self) {
        let mut state = self.state.borrow_mut();
        state.duration = state.pending_duration;
    }

    pub fn set_current_time(&self, seconds: f64) {
        self.state.borrow_mut().current_time = seconds;
    }

    /// Play through to the end: the element pauses itself at the duration
    pub fn run_to_end(&self) {
        let mut state = self.state.borrow_mut();
        state.current_time = state.duration;
        state.paused = true;
    }

    /// Whether a graph has taken this element's output
    pub fn is_routed(&self) -> bool {
        self.routed.get()
    }

    pub fn src(&self) -> Option<String> {
        self.state.borrow().src.clone()
    }

    pub fn released(&self) -> Vec<String> {
        self.state.borrow().released.clone()
    }

    pub fn play_calls(&self) -> usize {
        self.play_calls.get()
    }

    pub fn pause_calls(&self) -> usize {
        self.pause_calls.get()
    }
}

impl Default for MockMedia {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaElement for MockMedia {
    type File = MockFile;

    fn describe(&self, file: &MockFile) -> SourceInfo {
        SourceInfo {
            name: file.name.clone(),
            size_bytes: file.size_bytes,
        }
    }

    fn attach(&self, file: &MockFile) -> Result<PlaybackSource> {
        let mut state = self.state.borrow_mut();
        state.next_handle += 1;
        let handle = format!("blob:mock/{}", state.next_handle);
        state.src = Some(handle.clone());
        state.pending_duration = file.duration;
        state.duration = f64::NAN;
        state.current_time = 0.0;
        state.paused = true;
        Ok(PlaybackSource {
            handle,
            info: self.describe(file),
        })
    }

    fn release(&self, source: &PlaybackSource) {
        self.state.borrow_mut().released.push(source.handle.clone());
    }

    async fn play(&self) -> Result<()> {
        self.play_calls.set(self.play_calls.get() + 1);
        if self.reject_play.get() {
            return Err(PlayerError::PlaybackRejected {
                reason: "NotAllowedError: play() requires a user gesture".to_string(),
            });
        }
        let mut state = self.state.borrow_mut();
        if state.src.is_none() {
            return Err(PlayerError::PlaybackRejected {
                reason: "NotSupportedError: no source".to_string(),
            });
        }
        state.paused = false;
        Ok(())
    }

    fn pause(&self) {
        self.pause_calls.set(self.pause_calls.get() + 1);
        self.state.borrow_mut().paused = true;
    }

    fn is_paused(&self) -> bool {
        self.state.borrow().paused
    }

    fn current_time(&self) -> f64 {
        self.state.borrow().current_time
    }

    fn duration(&self) -> f64 {
        self.state.borrow().duration
    }
}

// ============================================================================
// View
// ============================================================================

/// Everything currently displayed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewSnapshot {
    pub title: String,
    pub artist: String,
    pub hint: String,
    pub play_enabled: bool,
    pub play_label: String,
    pub now_playing: bool,
    pub elapsed: String,
    pub total: String,
    pub progress_percent: f64,
    pub status: String,
    pub ready: bool,
    pub tempo_label: String,
    pub pitch_label: String,
}

/// View that records what would be on screen
#[derive(Debug, Default)]
pub struct RecordingView {
    snapshot: RefCell<ViewSnapshot>,
    status_history: RefCell<Vec<String>>,
    alerts: RefCell<Vec<String>>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Every status text set, oldest first
    pub fn status_history(&self) -> Vec<String> {
        self.status_history.borrow().clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.borrow().clone()
    }
}

impl PlayerView for RecordingView {
    fn show_track(&self, title: &str, artist: &str, hint: &str) {
        let mut snapshot = self.snapshot.borrow_mut();
        snapshot.title = title.to_string();
        snapshot.artist = artist.to_string();
        snapshot.hint = hint.to_string();
    }

    fn set_play_enabled(&self, enabled: bool) {
        self.snapshot.borrow_mut().play_enabled = enabled;
    }

    fn set_play_label(&self, label: &str) {
        self.snapshot.borrow_mut().play_label = label.to_string();
    }

    fn set_now_playing(&self, playing: bool) {
        self.snapshot.borrow_mut().now_playing = playing;
    }

    fn set_clock(&self, elapsed: &str, total: &str) {
        let mut snapshot = self.snapshot.borrow_mut();
        snapshot.elapsed = elapsed.to_string();
        snapshot.total = total.to_string();
    }

    fn set_progress(&self, percent: f64) {
        self.snapshot.borrow_mut().progress_percent = percent;
    }

    fn set_status(&self, text: &str) {
        self.snapshot.borrow_mut().status = text.to_string();
        self.status_history.borrow_mut().push(text.to_string());
    }

    fn set_ready(&self, ready: bool) {
        self.snapshot.borrow_mut().ready = ready;
    }

    fn set_tempo_label(&self, label: &str) {
        self.snapshot.borrow_mut().tempo_label = label.to_string();
    }

    fn set_pitch_label(&self, label: &str) {
        self.snapshot.borrow_mut().pitch_label = label.to_string();
    }

    fn alert(&self, message: &str) {
        self.alerts.borrow_mut().push(message.to_string());
    }
}
