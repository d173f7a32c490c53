//! Player session
//!
//! One owned object per page: configuration, control state, transport,
//! graph bootstrapper, media element and view. Every UI event maps to a
//! method here (or to a [`PlayerCommand`] passed to [`PlayerSession::dispatch`]).
//!
//! All methods take `&self`. State lives in `Cell`/`RefCell` and no borrow is
//! held across an await, so a second event can be handled while a play
//! request is still waiting on the graph.

use std::cell::{Cell, RefCell};

use tracing::{debug, error, info, warn};

use crate::config::PlayerConfig;
use crate::engine::bootstrap::{GraphBootstrapper, GraphLifecycle};
use crate::engine::controls::{write_param, ControlKind, ControlState};
use crate::engine::graph::{
    AudioGraphContext, AudioHost, ContextState, MediaElement, PlaybackSource, PlayerView,
    SourceInfo,
};
use crate::engine::position::PositionReadout;
use crate::engine::transport::{PauseReason, Transport, TransportState};
use crate::error::Result;
use crate::format::file_hint;

/// File type accepted by host `H`'s media element
pub type FileOf<H> = <<H as AudioHost>::Media as MediaElement>::File;

/// UI events, in the order the UI produced them
#[derive(Debug, Clone)]
pub enum PlayerCommand<F> {
    /// The user picked a file
    SelectFile(F),
    /// The play/pause toggle was pressed
    TogglePlay,
    /// A range control moved; `raw` is the control's string value
    SetControl { kind: ControlKind, raw: String },
    /// The media element reported a new position
    TimeUpdate,
    /// The media element learned the duration
    MetadataLoaded,
    /// The stream reached its natural end
    Ended,
    VisibilityChanged { hidden: bool },
}

/// An audio player session over host `H` rendering to view `V`
pub struct PlayerSession<H: AudioHost, V: PlayerView> {
    config: PlayerConfig,
    media: H::Media,
    view: V,
    graph: GraphBootstrapper<H>,
    controls: Cell<ControlState>,
    transport: RefCell<Transport>,
    source: RefCell<Option<PlaybackSource>>,
}

impl<H: AudioHost, V: PlayerView> PlayerSession<H, V> {
    /// Create a session and render its initial state.
    ///
    /// The play toggle starts disabled; tempo and pitch labels show the
    /// configured defaults.
    pub fn new(config: PlayerConfig, host: H, media: H::Media, view: V) -> Result<Self> {
        config.validate()?;
        let controls = ControlState::from_config(&config);

        let session = Self {
            graph: GraphBootstrapper::new(host),
            controls: Cell::new(controls),
            transport: RefCell::new(Transport::new()),
            source: RefCell::new(None),
            config,
            media,
            view,
        };

        let labels = &session.config.labels;
        session.view.set_play_enabled(false);
        session.view.set_play_label(&labels.play);
        session.view.set_now_playing(false);
        session.view.set_ready(false);
        session.render_position(&PositionReadout::zero());
        session
            .view
            .set_tempo_label(&ControlKind::Tempo.label(controls.tempo, labels));
        session
            .view
            .set_pitch_label(&ControlKind::Pitch.label(controls.pitch, labels));
        Ok(session)
    }

    /// Handle one UI event
    pub async fn dispatch(&self, command: PlayerCommand<FileOf<H>>) -> Result<()> {
        match command {
            PlayerCommand::SelectFile(file) => self.select_file(&file),
            PlayerCommand::TogglePlay => self.toggle_play().await.map(|_| ()),
            PlayerCommand::SetControl { kind, raw } => self.set_control(kind, &raw).map(|_| ()),
            PlayerCommand::TimeUpdate | PlayerCommand::MetadataLoaded => {
                self.refresh_position();
                Ok(())
            }
            PlayerCommand::Ended => {
                self.on_ended();
                Ok(())
            }
            PlayerCommand::VisibilityChanged { hidden } => {
                self.on_visibility_change(hidden);
                Ok(())
            }
        }
    }

    // ========================================================================
    // Source selection
    // ========================================================================

    /// Load a user-selected file, replacing (and releasing) any previous one.
    ///
    /// State transition: Any -> ReadyToPlay
    pub fn select_file(&self, file: &FileOf<H>) -> Result<()> {
        let source = self.media.attach(file)?;
        info!(name = %source.info.name, bytes = source.info.size_bytes, "source selected");

        let previous = self.source.replace(Some(source.clone()));
        if let Some(previous) = previous {
            debug!(handle = %previous.handle, "releasing previous source");
            self.media.release(&previous);
        }

        let labels = &self.config.labels;
        self.view.show_track(
            &source.info.name,
            &labels.local_file_artist,
            &file_hint(source.info.size_bytes, labels),
        );
        self.view.set_play_enabled(true);
        self.view.set_play_label(&labels.play);
        self.view.set_now_playing(false);
        self.render_position(&PositionReadout::zero());

        self.transport.borrow_mut().source_selected();
        Ok(())
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// The play/pause toggle. Returns the resulting transport state.
    pub async fn toggle_play(&self) -> Result<TransportState> {
        if self.transport.borrow().is_playing() {
            self.pause(PauseReason::User);
            return Ok(self.transport_state());
        }
        self.play().await
    }

    /// Start playback, building the graph first if needed.
    ///
    /// State transitions: ReadyToPlay/Paused -> Playing. On any error the
    /// state and the toggle are left as they were.
    ///
    /// A failed graph falls back to unprocessed playback only when allowed
    /// and when the media output is not caught in a half-built graph, where
    /// it would be silent.
    pub async fn play(&self) -> Result<TransportState> {
        let guard = self.transport.borrow().check_can_play();
        if let Err(e) = guard {
            warn!("play requested with no source");
            self.view.alert(&self.config.labels.alert_no_source);
            return Err(e);
        }

        if let Err(e) = self
            .graph
            .ensure_ready(&self.media, &self.controls, &self.config, &self.view)
            .await
        {
            if !self.config.playback.allow_unprocessed || self.graph.media_stranded() {
                return Err(e);
            }
            warn!("processing graph unavailable, playing unprocessed");
        }

        self.resume_context().await?;

        if let Err(e) = self.media.play().await {
            error!(error = %e, "native playback rejected");
            return Err(e);
        }

        self.transport.borrow_mut().started();
        self.view.set_play_label(&self.config.labels.pause);
        self.view.set_now_playing(true);
        Ok(self.transport_state())
    }

    async fn resume_context(&self) -> Result<()> {
        let Some(context) = self.graph.context() else {
            return Ok(());
        };
        if context.state() != ContextState::Suspended {
            return Ok(());
        }
        debug!("resuming suspended audio context");
        context.resume().await.map_err(|e| {
            error!(error = %e, "audio context resume failed");
            e
        })
    }

    /// Stop playback. Synchronous; the native pause is issued immediately.
    ///
    /// State transition: Playing -> Paused
    pub fn pause(&self, reason: PauseReason) {
        if reason != PauseReason::Ended {
            self.media.pause();
        }
        self.transport.borrow_mut().pause(reason);
        self.view.set_play_label(&self.config.labels.play);
        self.view.set_now_playing(false);
    }

    /// Natural end of stream; passes through to the paused display
    pub fn on_ended(&self) {
        debug!("stream ended");
        self.pause(PauseReason::Ended);
        self.refresh_position();
    }

    /// Page visibility changed. Hiding the page while playing pauses.
    pub fn on_visibility_change(&self, hidden: bool) {
        if hidden && self.config.playback.pause_when_hidden && !self.media.is_paused() {
            info!("page hidden while playing, pausing");
            self.pause(PauseReason::Hidden);
        }
    }

    // ========================================================================
    // Position
    // ========================================================================

    /// Recompute the clock and progress bar from the media element
    pub fn refresh_position(&self) -> PositionReadout {
        let readout = PositionReadout::from_media(self.media.current_time(), self.media.duration());
        self.render_position(&readout);
        readout
    }

    fn render_position(&self, readout: &PositionReadout) {
        self.view.set_clock(&readout.elapsed, &readout.total);
        self.view.set_progress(readout.progress_percent);
    }

    // ========================================================================
    // Controls
    // ========================================================================

    /// A range control moved.
    ///
    /// The label always updates; the live parameter updates only once the
    /// graph is ready. Until then the value waits in the control state and is
    /// seeded at bootstrap. Returns the value actually applied.
    pub fn set_control(&self, kind: ControlKind, raw: &str) -> Result<f64> {
        let value = kind.parse(raw, &kind.range(&self.config)).map_err(|e| {
            warn!(error = %e, "ignoring control input");
            e
        })?;

        self.controls.set(self.controls.get().with(kind, value));
        let label = kind.label(value, &self.config.labels);
        match kind {
            ControlKind::Tempo => self.view.set_tempo_label(&label),
            ControlKind::Pitch => self.view.set_pitch_label(&label),
        }

        if let Some(node) = self.graph.node() {
            write_param(node, kind.param_name(&self.config.worklet.params), value);
        }
        Ok(value)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn transport_state(&self) -> TransportState {
        self.transport.borrow().state()
    }

    pub fn last_pause(&self) -> Option<PauseReason> {
        self.transport.borrow().last_pause()
    }

    pub fn controls(&self) -> ControlState {
        self.controls.get()
    }

    pub fn graph_lifecycle(&self) -> GraphLifecycle {
        self.graph.lifecycle()
    }

    pub fn graph(&self) -> &GraphBootstrapper<H> {
        &self.graph
    }

    pub fn source_info(&self) -> Option<SourceInfo> {
        self.source.borrow().as_ref().map(|s| s.info.clone())
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn media(&self) -> &H::Media {
        &self.media
    }

    pub fn view(&self) -> &V {
        &self.view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::{MockAudioHost, MockFile, MockMedia, RecordingView};

    type MockSession = PlayerSession<MockAudioHost, RecordingView>;

    fn session_with(config: PlayerConfig) -> (MockSession, MockAudioHost) {
        let host = MockAudioHost::new();
        let session =
            PlayerSession::new(config, host.clone(), MockMedia::new(), RecordingView::new())
                .unwrap();
        (session, host)
    }

    fn session() -> (MockSession, MockAudioHost) {
        session_with(PlayerConfig::default())
    }

    fn song() -> MockFile {
        MockFile::new("song.mp3", 3 * 1024 * 1024, 225.0)
    }

    #[test]
    fn test_initial_render() {
        let (session, _) = session();
        let snapshot = session.view().snapshot();
        assert!(!snapshot.play_enabled);
        assert_eq!(snapshot.play_label, "Lecture");
        assert_eq!(snapshot.tempo_label, "1.00×");
        assert_eq!(snapshot.pitch_label, "0 demi-ton");
        assert_eq!(snapshot.elapsed, "0:00");
        assert_eq!(session.transport_state(), TransportState::NoSource);
        assert_eq!(session.graph_lifecycle(), GraphLifecycle::Uninitialized);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = PlayerConfig::default();
        config.worklet.processor_name.clear();
        let result = PlayerSession::new(
            config,
            MockAudioHost::new(),
            MockMedia::new(),
            RecordingView::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_select_file_arms_player() {
        let (session, _) = session();
        session.select_file(&song()).unwrap();

        let snapshot = session.view().snapshot();
        assert!(snapshot.play_enabled);
        assert_eq!(snapshot.title, "song.mp3");
        assert_eq!(snapshot.artist, "Fichier local");
        assert!(snapshot.hint.starts_with("3.0 Mo"));
        assert_eq!(session.transport_state(), TransportState::ReadyToPlay);
        assert_eq!(session.source_info().unwrap().name, "song.mp3");
    }

    #[tokio::test]
    async fn test_toggle_play_then_pause() {
        let (session, host) = session();
        session.select_file(&song()).unwrap();

        let state = session.toggle_play().await.unwrap();
        assert_eq!(state, TransportState::Playing);
        assert_eq!(host.module_loads(), 1);
        assert_eq!(session.view().snapshot().play_label, "Pause");
        assert!(session.view().snapshot().now_playing);

        let state = session.toggle_play().await.unwrap();
        assert_eq!(state, TransportState::Paused);
        assert!(session.media().is_paused());
        assert_eq!(session.view().snapshot().play_label, "Lecture");
        assert!(!session.view().snapshot().now_playing);
        assert_eq!(session.last_pause(), Some(PauseReason::User));
    }

    #[tokio::test]
    async fn test_module_failure_blocks_play_when_configured() {
        let mut config = PlayerConfig::default();
        config.playback.allow_unprocessed = false;
        let (session, host) = session_with(config);
        host.fail_next_module_loads(1);
        session.select_file(&song()).unwrap();

        let err = session.toggle_play().await.unwrap_err();
        assert_eq!(err.error_code(), "MODULE_LOAD");
        assert_eq!(session.media().play_calls(), 0);
        assert_eq!(session.transport_state(), TransportState::ReadyToPlay);
    }

    #[tokio::test]
    async fn test_invalid_control_input_keeps_state() {
        let (session, _) = session();
        session.set_control(ControlKind::Tempo, "1.5").unwrap();
        assert!(session.set_control(ControlKind::Tempo, "fast").is_err());
        assert_eq!(session.controls().tempo, 1.5);
        assert_eq!(session.view().snapshot().tempo_label, "1.50×");
    }
}
