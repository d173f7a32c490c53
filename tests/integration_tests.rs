//! Integration Tests
//!
//! End-to-end player sessions against the mock host.

use pretty_assertions::assert_eq;
use retempo::engine::mock::{MockAudioHost, MockFile, MockMedia, RecordingView, ViewSnapshot};
use retempo::engine::{ControlKind, GraphLifecycle, MediaElement, PauseReason, TransportState};
use retempo::{PlayerCommand, PlayerConfig, PlayerError, PlayerSession};

type Session = PlayerSession<MockAudioHost, RecordingView>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn new_session(config: PlayerConfig) -> (Session, MockAudioHost) {
    init_tracing();
    let host = MockAudioHost::new();
    let session = PlayerSession::new(config, host.clone(), MockMedia::new(), RecordingView::new())
        .expect("default config is valid");
    (session, host)
}

fn track(name: &str, duration: f64) -> MockFile {
    MockFile::new(name, 5 * 1024 * 1024, duration)
}

// === Full Scenario ===

#[tokio::test]
async fn test_full_listening_session() {
    let (session, host) = new_session(PlayerConfig::default());

    // Play before any file: prompt, nothing else
    let err = session.toggle_play().await.unwrap_err();
    assert!(matches!(err, PlayerError::NoSource));
    assert_eq!(session.transport_state(), TransportState::NoSource);
    assert_eq!(
        session.view().alerts(),
        vec!["Commence par importer un fichier MP3.".to_string()]
    );
    assert_eq!(host.contexts_created(), 0);

    // Tempo moved before playback: label only, remembered for later
    session.set_control(ControlKind::Tempo, "1.25").unwrap();
    assert_eq!(session.view().snapshot().tempo_label, "1.25×");
    assert_eq!(session.graph_lifecycle(), GraphLifecycle::Uninitialized);

    // Load a 3:45 file
    session.select_file(&track("song.mp3", 225.0)).unwrap();
    session.media().load_metadata();
    session.refresh_position();
    assert_eq!(session.view().snapshot().total, "3:45");
    assert_eq!(session.transport_state(), TransportState::ReadyToPlay);

    // Play: one bootstrap, seeded from the controls
    let state = session.toggle_play().await.unwrap();
    assert_eq!(state, TransportState::Playing);
    assert_eq!(session.graph().attempts(), 1);
    assert_eq!(host.module_loads(), 1);
    assert_eq!(host.param("tempo"), Some(1.25));
    assert_eq!(host.param("pitchSemitones"), Some(0.0));
    assert_eq!(host.param("rate"), Some(1.0));
    assert_eq!(
        host.connections(),
        vec!["media -> node#1".to_string(), "node#1 -> destination".to_string()]
    );

    // Pitch +5 goes live immediately
    session.set_control(ControlKind::Pitch, "5").unwrap();
    assert_eq!(session.view().snapshot().pitch_label, "+5 demi-tons");
    assert_eq!(host.param("pitchSemitones"), Some(5.0));

    // Halfway through
    session.media().set_current_time(112.5);
    session.refresh_position();

    let expected = ViewSnapshot {
        title: "song.mp3".to_string(),
        artist: "Fichier local".to_string(),
        hint: "5.0 Mo — lu uniquement dans ton navigateur.".to_string(),
        play_enabled: true,
        play_label: "Pause".to_string(),
        now_playing: true,
        elapsed: "1:52".to_string(),
        total: "3:45".to_string(),
        progress_percent: 50.0,
        status: "Graph audio initialisé (SoundTouch actif)".to_string(),
        ready: true,
        tempo_label: "1.25×".to_string(),
        pitch_label: "+5 demi-tons".to_string(),
    };
    assert_eq!(session.view().snapshot(), expected);

    // Page hidden: auto-pause
    session.on_visibility_change(true);
    assert_eq!(session.transport_state(), TransportState::Paused);
    assert_eq!(session.last_pause(), Some(PauseReason::Hidden));
    assert!(session.media().is_paused());
    let snapshot = session.view().snapshot();
    assert_eq!(snapshot.play_label, "Lecture");
    assert!(!snapshot.now_playing);
}

#[tokio::test]
async fn test_session_driven_by_commands() {
    let (session, host) = new_session(PlayerConfig::default());

    session
        .dispatch(PlayerCommand::SetControl {
            kind: ControlKind::Pitch,
            raw: "-3".to_string(),
        })
        .await
        .unwrap();
    session
        .dispatch(PlayerCommand::SelectFile(track("a.flac", 61.0)))
        .await
        .unwrap();
    session.media().load_metadata();

    let commands = vec![
        PlayerCommand::MetadataLoaded,
        PlayerCommand::TogglePlay,
        PlayerCommand::TimeUpdate,
        PlayerCommand::SetControl {
            kind: ControlKind::Tempo,
            raw: "0.8".to_string(),
        },
    ];
    for command in commands {
        session.dispatch(command).await.unwrap();
    }

    assert_eq!(session.transport_state(), TransportState::Playing);
    assert_eq!(host.param("pitchSemitones"), Some(-3.0));
    assert_eq!(host.param("tempo"), Some(0.8));
    let snapshot = session.view().snapshot();
    assert_eq!(snapshot.total, "1:01");
    assert_eq!(snapshot.pitch_label, "-3 demi-tons");
    assert_eq!(snapshot.tempo_label, "0.80×");

    session.media().run_to_end();
    session.dispatch(PlayerCommand::Ended).await.unwrap();
    assert_eq!(session.transport_state(), TransportState::Paused);
    assert_eq!(session.view().snapshot().progress_percent, 100.0);
}

// === Transport ===

#[tokio::test]
async fn test_natural_end_shows_play_again() {
    let (session, _) = new_session(PlayerConfig::default());
    session.select_file(&track("song.mp3", 10.0)).unwrap();
    session.media().load_metadata();
    session.toggle_play().await.unwrap();

    session.media().run_to_end();
    session.on_ended();

    assert_eq!(session.transport_state(), TransportState::Paused);
    assert_eq!(session.last_pause(), Some(PauseReason::Ended));
    assert_eq!(session.view().snapshot().play_label, "Lecture");
    assert!(!session.view().snapshot().now_playing);
    // The element already stopped itself; no extra pause is issued.
    assert_eq!(session.media().pause_calls(), 0);

    // Play again from wherever the element is
    let state = session.toggle_play().await.unwrap();
    assert_eq!(state, TransportState::Playing);
}

#[tokio::test]
async fn test_rejected_play_leaves_toggle_alone() {
    let (session, _) = new_session(PlayerConfig::default());
    session.select_file(&track("song.mp3", 10.0)).unwrap();
    session.media().reject_play(true);

    let err = session.toggle_play().await.unwrap_err();
    assert_eq!(err.error_code(), "PLAYBACK_REJECTED");
    assert_eq!(session.transport_state(), TransportState::ReadyToPlay);
    let snapshot = session.view().snapshot();
    assert_eq!(snapshot.play_label, "Lecture");
    assert!(!snapshot.now_playing);
    // The graph itself came up fine
    assert_eq!(session.graph_lifecycle(), GraphLifecycle::Ready);

    session.media().reject_play(false);
    assert_eq!(session.toggle_play().await.unwrap(), TransportState::Playing);
}

#[tokio::test]
async fn test_hidden_while_paused_does_nothing() {
    let (session, _) = new_session(PlayerConfig::default());
    session.select_file(&track("song.mp3", 10.0)).unwrap();

    session.on_visibility_change(true);
    assert_eq!(session.transport_state(), TransportState::ReadyToPlay);
    assert_eq!(session.media().pause_calls(), 0);

    session.toggle_play().await.unwrap();
    session.on_visibility_change(false);
    assert_eq!(session.transport_state(), TransportState::Playing);
}

#[tokio::test]
async fn test_hidden_pause_can_be_disabled() {
    let mut config = PlayerConfig::default();
    config.playback.pause_when_hidden = false;
    let (session, _) = new_session(config);
    session.select_file(&track("song.mp3", 10.0)).unwrap();
    session.toggle_play().await.unwrap();

    session.on_visibility_change(true);
    assert_eq!(session.transport_state(), TransportState::Playing);
}

// === Sources ===

#[tokio::test]
async fn test_replacing_file_releases_previous_and_keeps_graph() {
    let (session, host) = new_session(PlayerConfig::default());
    session.select_file(&track("first.mp3", 10.0)).unwrap();
    session.toggle_play().await.unwrap();

    session.select_file(&track("second.mp3", 20.0)).unwrap();
    assert_eq!(session.media().released(), vec!["blob:mock/1".to_string()]);
    assert_eq!(session.media().src(), Some("blob:mock/2".to_string()));
    assert_eq!(session.transport_state(), TransportState::ReadyToPlay);
    let snapshot = session.view().snapshot();
    assert_eq!(snapshot.title, "second.mp3");
    assert_eq!(snapshot.play_label, "Lecture");
    assert!(!snapshot.now_playing);
    assert_eq!(snapshot.elapsed, "0:00");
    assert_eq!(snapshot.progress_percent, 0.0);

    session.toggle_play().await.unwrap();
    assert_eq!(host.contexts_created(), 1);
    assert_eq!(host.module_loads(), 1);
    assert_eq!(host.nodes_created(), 1);
}

// === Controls ===

#[tokio::test]
async fn test_control_values_clamped_and_snapped() {
    let (session, host) = new_session(PlayerConfig::default());
    session.select_file(&track("song.mp3", 10.0)).unwrap();
    session.toggle_play().await.unwrap();

    assert_eq!(session.set_control(ControlKind::Tempo, "9").unwrap(), 2.0);
    assert_eq!(session.set_control(ControlKind::Pitch, "2.4").unwrap(), 2.0);
    assert_eq!(host.param("tempo"), Some(2.0));
    assert_eq!(host.param("pitchSemitones"), Some(2.0));
    assert_eq!(session.view().snapshot().pitch_label, "+2 demi-tons");
}

#[tokio::test]
async fn test_rapid_slider_moves_last_write_wins() {
    let (session, host) = new_session(PlayerConfig::default());
    session.select_file(&track("song.mp3", 10.0)).unwrap();
    session.toggle_play().await.unwrap();

    for raw in ["1.1", "1.2", "1.3", "1.4"] {
        session.set_control(ControlKind::Tempo, raw).unwrap();
    }
    assert_eq!(host.param("tempo"), Some(1.4));
    // One seed plus four live writes
    assert_eq!(host.param_writes("tempo"), 5);
}
