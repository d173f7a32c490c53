//! Audio graph bootstrap
//!
//! Builds `media -> processing node -> destination` once per session:
//!
//! 1. create the audio context (first call only; never recreated)
//! 2. report the loading status
//! 3. fetch and register the external processing module
//! 4. create the node, connect it, seed its parameters from the controls
//!
//! At most one attempt is in flight. A caller arriving while one runs waits
//! for it and shares its outcome instead of starting a second graph; only a
//! later call retries. A retry resumes where the failed attempt stopped: the
//! context, the module registration, the node and the media routing are each
//! made once.

use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;

use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use super::controls::{write_param, ControlState};
use super::graph::{AudioGraphContext, AudioHost, PlayerView};
use crate::config::PlayerConfig;
use crate::error::{PlayerError, Result};

/// Processing node type produced by host `H`
pub type NodeOf<H> = <<H as AudioHost>::Context as AudioGraphContext>::Node;

/// Where the graph is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphLifecycle {
    #[default]
    Uninitialized,
    /// An attempt is in flight
    Bootstrapping,
    /// Graph built; tempo and pitch are live
    Ready,
    /// Last attempt failed; the next call retries
    Failed,
}

impl fmt::Display for GraphLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphLifecycle::Uninitialized => write!(f, "uninitialized"),
            GraphLifecycle::Bootstrapping => write!(f, "bootstrapping"),
            GraphLifecycle::Ready => write!(f, "ready"),
            GraphLifecycle::Failed => write!(f, "failed"),
        }
    }
}

/// Marks an attempt in flight. Dropping it wakes the waiters, also when the
/// attempt's future is abandoned midway.
struct InFlight<'a> {
    flag: &'a Cell<bool>,
    settled: &'a Notify,
}

impl<'a> InFlight<'a> {
    fn enter(flag: &'a Cell<bool>, settled: &'a Notify) -> Self {
        flag.set(true);
        Self { flag, settled }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
        self.settled.notify_waiters();
    }
}

/// One-shot, idempotent builder of the processing graph
pub struct GraphBootstrapper<H: AudioHost> {
    host: H,
    context: OnceCell<H::Context>,
    node: OnceCell<NodeOf<H>>,

    // Progress kept across failed attempts
    module_loaded: Cell<bool>,
    pending_node: RefCell<Option<NodeOf<H>>>,
    media_connected: Cell<bool>,

    in_flight: Cell<bool>,
    settled: Notify,
    last_failure: RefCell<Option<String>>,
    lifecycle: Cell<GraphLifecycle>,
    attempts: Cell<u32>,
}

impl<H: AudioHost> GraphBootstrapper<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            context: OnceCell::new(),
            node: OnceCell::new(),
            module_loaded: Cell::new(false),
            pending_node: RefCell::new(None),
            media_connected: Cell::new(false),
            in_flight: Cell::new(false),
            settled: Notify::new(),
            last_failure: RefCell::new(None),
            lifecycle: Cell::new(GraphLifecycle::Uninitialized),
            attempts: Cell::new(0),
        }
    }

    /// Make sure the graph exists, building it on first use.
    ///
    /// Control values are read from `controls` after the module has loaded,
    /// so slider moves made while loading are honored.
    ///
    /// On failure the status line, ready indicator and alert have already
    /// been updated through `view`, once per attempt; the error is returned
    /// for the caller to decide whether playback may continue unprocessed.
    /// Callers that joined a failed attempt get [`PlayerError::GraphUnavailable`].
    pub async fn ensure_ready<V: PlayerView>(
        &self,
        media: &H::Media,
        controls: &Cell<ControlState>,
        config: &PlayerConfig,
        view: &V,
    ) -> Result<&NodeOf<H>> {
        if let Some(node) = self.node.get() {
            return Ok(node);
        }
        if self.in_flight.get() {
            return self.join_in_flight().await;
        }

        let guard = InFlight::enter(&self.in_flight, &self.settled);
        self.last_failure.replace(None);
        let result = match self.attempt(media, controls, config, view).await {
            Ok(node) => Ok(self.node.get_or_init(|| node)),
            Err(e) => {
                self.last_failure.replace(Some(e.to_string()));
                Err(e)
            }
        };
        drop(guard);
        result
    }

    async fn join_in_flight(&self) -> Result<&NodeOf<H>> {
        debug!(attempt = self.attempts.get(), "waiting on in-flight graph bootstrap");
        // Registered before the first poll, so the attempt's wakeup is not missed.
        let settled = self.settled.notified();
        settled.await;

        match self.node.get() {
            Some(node) => Ok(node),
            None => Err(PlayerError::GraphUnavailable {
                reason: self
                    .last_failure
                    .borrow()
                    .clone()
                    .unwrap_or_else(|| "bootstrap attempt abandoned".to_string()),
            }),
        }
    }

    async fn attempt<V: PlayerView>(
        &self,
        media: &H::Media,
        controls: &Cell<ControlState>,
        config: &PlayerConfig,
        view: &V,
    ) -> Result<NodeOf<H>> {
        self.attempts.set(self.attempts.get() + 1);
        self.lifecycle.set(GraphLifecycle::Bootstrapping);
        debug!(attempt = self.attempts.get(), "bootstrapping audio graph");

        match self.build(media, controls, config, view).await {
            Ok(node) => {
                self.lifecycle.set(GraphLifecycle::Ready);
                view.set_status(&config.labels.status_ready);
                view.set_ready(true);
                info!(
                    processor = %config.worklet.processor_name,
                    "audio graph ready"
                );
                Ok(node)
            }
            Err(e) => {
                self.lifecycle.set(GraphLifecycle::Failed);
                error!(error = %e, code = e.error_code(), "audio graph initialization failed");
                view.set_status(&config.labels.status_failed);
                view.set_ready(false);
                view.alert(&config.labels.alert_module_failed);
                Err(e)
            }
        }
    }

    async fn build<V: PlayerView>(
        &self,
        media: &H::Media,
        controls: &Cell<ControlState>,
        config: &PlayerConfig,
        view: &V,
    ) -> Result<NodeOf<H>> {
        let worklet = &config.worklet;
        let context = self.get_or_create_context()?;

        view.set_status(&config.labels.status_loading);
        if !self.module_loaded.get() {
            context.add_module(&worklet.module_url).await?;
            self.module_loaded.set(true);
            debug!(url = %worklet.module_url, "processing module registered");
        }

        let node = match self.pending_node.take() {
            Some(node) => node,
            None => context.create_node(&worklet.processor_name)?,
        };
        if let Err(e) = self.wire(context, media, &node) {
            // The node may already hold the media output; the retry reuses it.
            self.pending_node.replace(Some(node));
            return Err(e);
        }

        // The node owns all speed change, so native rate stays at 1.
        let values = controls.get();
        for (name, value) in [
            (&worklet.params.tempo, values.tempo),
            (&worklet.params.pitch, values.pitch),
            (&worklet.params.rate, 1.0),
        ] {
            if !write_param(&node, name, value) {
                warn!(param = %name, "processing node does not expose parameter");
            }
        }

        Ok(node)
    }

    fn wire(&self, context: &H::Context, media: &H::Media, node: &NodeOf<H>) -> Result<()> {
        if !self.media_connected.get() {
            context.connect_media(media, node)?;
            self.media_connected.set(true);
        }
        context.connect_destination(node)
    }

    fn get_or_create_context(&self) -> Result<&H::Context> {
        if let Some(context) = self.context.get() {
            return Ok(context);
        }
        let context = self.host.create_context()?;
        debug!(state = %context.state(), "audio context created");
        Ok(self.context.get_or_init(|| context))
    }

    /// The live processing node, once the graph is ready
    pub fn node(&self) -> Option<&NodeOf<H>> {
        self.node.get()
    }

    /// The audio context, if one has been created (even by a failed attempt)
    pub fn context(&self) -> Option<&H::Context> {
        self.context.get()
    }

    pub fn lifecycle(&self) -> GraphLifecycle {
        self.lifecycle.get()
    }

    pub fn is_ready(&self) -> bool {
        self.node.get().is_some()
    }

    /// Whether the media output is routed into a node that does not reach
    /// the destination yet. Native playback would be silent.
    pub fn media_stranded(&self) -> bool {
        self.media_connected.get() && self.node.get().is_none()
    }

    /// Number of bootstrap attempts started so far
    pub fn attempts(&self) -> u32 {
        self.attempts.get()
    }

    pub fn host(&self) -> &H {
        &self.host
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::{MockAudioHost, MockMedia, RecordingView};

    fn controls() -> Cell<ControlState> {
        Cell::new(ControlState {
            tempo: 1.5,
            pitch: -2.0,
        })
    }

    #[tokio::test]
    async fn test_first_call_builds_graph() {
        let host = MockAudioHost::new();
        let bootstrapper = GraphBootstrapper::new(host.clone());
        let media = MockMedia::new();
        let view = RecordingView::new();
        let config = PlayerConfig::default();

        assert_eq!(bootstrapper.lifecycle(), GraphLifecycle::Uninitialized);
        bootstrapper
            .ensure_ready(&media, &controls(), &config, &view)
            .await
            .unwrap();

        assert_eq!(bootstrapper.lifecycle(), GraphLifecycle::Ready);
        assert!(bootstrapper.is_ready());
        assert_eq!(host.contexts_created(), 1);
        assert_eq!(host.module_loads(), 1);
        assert_eq!(host.nodes_created(), 1);
        assert!(media.is_routed());
        assert_eq!(host.param("tempo"), Some(1.5));
        assert_eq!(host.param("pitchSemitones"), Some(-2.0));
        assert_eq!(host.param("rate"), Some(1.0));

        let snapshot = view.snapshot();
        assert_eq!(snapshot.status, config.labels.status_ready);
        assert!(snapshot.ready);
        assert_eq!(
            view.status_history(),
            vec![
                config.labels.status_loading.clone(),
                config.labels.status_ready.clone()
            ]
        );
    }

    #[tokio::test]
    async fn test_second_call_is_idempotent() {
        let host = MockAudioHost::new();
        let bootstrapper = GraphBootstrapper::new(host.clone());
        let media = MockMedia::new();
        let view = RecordingView::new();
        let config = PlayerConfig::default();
        let controls = controls();

        bootstrapper
            .ensure_ready(&media, &controls, &config, &view)
            .await
            .unwrap();
        bootstrapper
            .ensure_ready(&media, &controls, &config, &view)
            .await
            .unwrap();

        assert_eq!(bootstrapper.attempts(), 1);
        assert_eq!(host.contexts_created(), 1);
        assert_eq!(host.module_loads(), 1);
        assert_eq!(host.nodes_created(), 1);
    }

    #[tokio::test]
    async fn test_failure_then_retry_reuses_context() {
        let host = MockAudioHost::new();
        host.fail_next_module_loads(1);
        let bootstrapper = GraphBootstrapper::new(host.clone());
        let media = MockMedia::new();
        let view = RecordingView::new();
        let config = PlayerConfig::default();
        let controls = controls();

        let err = bootstrapper
            .ensure_ready(&media, &controls, &config, &view)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "MODULE_LOAD");
        assert_eq!(bootstrapper.lifecycle(), GraphLifecycle::Failed);
        assert!(bootstrapper.node().is_none());
        assert!(bootstrapper.context().is_some());
        assert!(!media.is_routed());

        let snapshot = view.snapshot();
        assert_eq!(snapshot.status, config.labels.status_failed);
        assert!(!snapshot.ready);
        assert_eq!(view.alerts(), vec![config.labels.alert_module_failed.clone()]);

        bootstrapper
            .ensure_ready(&media, &controls, &config, &view)
            .await
            .unwrap();
        assert_eq!(bootstrapper.lifecycle(), GraphLifecycle::Ready);
        assert_eq!(bootstrapper.attempts(), 2);
        assert_eq!(host.contexts_created(), 1);
        assert_eq!(host.module_loads(), 2);
        assert_eq!(host.nodes_created(), 1);
    }

    #[tokio::test]
    async fn test_retry_after_node_failure_keeps_module() {
        let host = MockAudioHost::new();
        let bootstrapper = GraphBootstrapper::new(host.clone());
        let media = MockMedia::new();
        let view = RecordingView::new();
        let mut config = PlayerConfig::default();
        config.worklet.processor_name = "not-registered".to_string();

        bootstrapper
            .ensure_ready(&media, &controls(), &config, &view)
            .await
            .unwrap_err();
        assert_eq!(host.module_loads(), 1);

        config.worklet.processor_name = crate::config::DEFAULT_PROCESSOR_NAME.to_string();
        bootstrapper
            .ensure_ready(&media, &controls(), &config, &view)
            .await
            .unwrap();
        assert_eq!(bootstrapper.attempts(), 2);
        assert_eq!(host.module_loads(), 1);
        assert_eq!(host.nodes_created(), 1);
    }

    #[tokio::test]
    async fn test_missing_params_skipped() {
        let host = MockAudioHost::with_params(&["tempo"]);
        let bootstrapper = GraphBootstrapper::new(host.clone());
        let media = MockMedia::new();
        let view = RecordingView::new();

        bootstrapper
            .ensure_ready(&media, &controls(), &PlayerConfig::default(), &view)
            .await
            .unwrap();

        assert_eq!(bootstrapper.lifecycle(), GraphLifecycle::Ready);
        assert_eq!(host.param("tempo"), Some(1.5));
        assert_eq!(host.param("pitchSemitones"), None);
        assert_eq!(host.param("rate"), None);
        assert!(view.alerts().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_processor_fails() {
        let host = MockAudioHost::new();
        let bootstrapper = GraphBootstrapper::new(host.clone());
        let media = MockMedia::new();
        let view = RecordingView::new();
        let mut config = PlayerConfig::default();
        config.worklet.processor_name = "not-registered".to_string();

        let err = bootstrapper
            .ensure_ready(&media, &controls(), &config, &view)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "NODE_CREATION");
        assert_eq!(bootstrapper.lifecycle(), GraphLifecycle::Failed);
        assert_eq!(view.alerts().len(), 1);
    }

    #[tokio::test]
    async fn test_context_creation_failure() {
        let host = MockAudioHost::new();
        host.fail_context_creation(true);
        let bootstrapper = GraphBootstrapper::new(host.clone());
        let view = RecordingView::new();

        let err = bootstrapper
            .ensure_ready(&MockMedia::new(), &controls(), &PlayerConfig::default(), &view)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "CONTEXT_CREATION");
        assert!(bootstrapper.context().is_none());
        assert_eq!(host.module_loads(), 0);
    }
}
