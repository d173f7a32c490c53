//! Web Audio host
//!
//! `AudioContext` + `AudioWorkletNode` for the graph, `<audio>` for decode and
//! native transport. Object URLs stand in for playback handles.

use std::cell::RefCell;

use tracing::warn;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AudioContext, AudioContextState, AudioParam, AudioWorkletNode, File, HtmlAudioElement,
    MediaElementAudioSourceNode, Url,
};

use crate::engine::{
    AudioGraphContext, AudioHost, ContextState, MediaElement, PlaybackSource, ProcessingNode,
    SourceInfo,
};
use crate::error::{PlayerError, Result};

/// Best-effort text for a rejected promise or thrown value
pub(crate) fn js_reason(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    value
        .as_string()
        .unwrap_or_else(|| format!("{value:?}"))
}

/// Creates the page's `AudioContext`
#[derive(Debug, Clone, Copy, Default)]
pub struct WebAudioHost;

impl AudioHost for WebAudioHost {
    type Media = HtmlAudio;
    type Context = WebAudioContext;

    fn create_context(&self) -> Result<WebAudioContext> {
        let context = AudioContext::new().map_err(|e| PlayerError::ContextCreation {
            reason: js_reason(&e),
        })?;
        Ok(WebAudioContext {
            context,
            source: RefCell::new(None),
        })
    }
}

#[derive(Debug)]
pub struct WebAudioContext {
    context: AudioContext,
    // Held so the media source node lives as long as the context.
    source: RefCell<Option<MediaElementAudioSourceNode>>,
}

impl AudioGraphContext for WebAudioContext {
    type Media = HtmlAudio;
    type Node = WorkletNode;

    async fn add_module(&self, url: &str) -> Result<()> {
        let load_error = |e: JsValue| PlayerError::ModuleLoad {
            url: url.to_string(),
            reason: js_reason(&e),
        };
        let worklet = self.context.audio_worklet().map_err(load_error)?;
        let promise = worklet.add_module(url).map_err(load_error)?;
        JsFuture::from(promise).await.map_err(load_error)?;
        Ok(())
    }

    fn create_node(&self, processor: &str) -> Result<WorkletNode> {
        AudioWorkletNode::new(&self.context, processor)
            .map(|node| WorkletNode { node })
            .map_err(|e| PlayerError::NodeCreation {
                processor: processor.to_string(),
                reason: js_reason(&e),
            })
    }

    fn connect_media(&self, media: &HtmlAudio, node: &WorkletNode) -> Result<()> {
        let connect_error = |e: JsValue| PlayerError::GraphConnection {
            reason: js_reason(&e),
        };
        let source = self
            .context
            .create_media_element_source(&media.element)
            .map_err(connect_error)?;
        source
            .connect_with_audio_node(&node.node)
            .map_err(connect_error)?;
        *self.source.borrow_mut() = Some(source);
        Ok(())
    }

    fn connect_destination(&self, node: &WorkletNode) -> Result<()> {
        node.node
            .connect_with_audio_node(&self.context.destination())
            .map_err(|e| PlayerError::GraphConnection {
                reason: js_reason(&e),
            })?;
        Ok(())
    }

    fn state(&self) -> ContextState {
        match self.context.state() {
            AudioContextState::Running => ContextState::Running,
            AudioContextState::Suspended => ContextState::Suspended,
            _ => ContextState::Closed,
        }
    }

    async fn resume(&self) -> Result<()> {
        let resume_error = |e: JsValue| PlayerError::ContextResume {
            reason: js_reason(&e),
        };
        let promise = self.context.resume().map_err(resume_error)?;
        JsFuture::from(promise).await.map_err(resume_error)?;
        Ok(())
    }
}

/// The SoundTouch (or compatible) worklet node
#[derive(Debug)]
pub struct WorkletNode {
    node: AudioWorkletNode,
}

impl WorkletNode {
    fn param(&self, name: &str) -> Option<AudioParam> {
        let params = self.node.parameters().ok()?;
        // AudioParamMap is maplike; read it through the Map interface.
        let map: &js_sys::Map = params.unchecked_ref();
        map.get(&JsValue::from_str(name)).dyn_into::<AudioParam>().ok()
    }
}

impl ProcessingNode for WorkletNode {
    fn set_param(&self, name: &str, value: f64) -> bool {
        match self.param(name) {
            Some(param) => {
                param.set_value(value as f32);
                true
            }
            None => false,
        }
    }
}

/// The page's `<audio>` element
#[derive(Debug, Clone)]
pub struct HtmlAudio {
    element: HtmlAudioElement,
}

impl HtmlAudio {
    pub fn new(element: HtmlAudioElement) -> Self {
        Self { element }
    }

    pub fn element(&self) -> &HtmlAudioElement {
        &self.element
    }
}

impl MediaElement for HtmlAudio {
    type File = File;

    fn describe(&self, file: &File) -> SourceInfo {
        SourceInfo {
            name: file.name(),
            size_bytes: file.size().max(0.0) as u64,
        }
    }

    fn attach(&self, file: &File) -> Result<PlaybackSource> {
        let handle = Url::create_object_url_with_blob(file).map_err(|e| {
            PlayerError::SourceAttach {
                reason: js_reason(&e),
            }
        })?;
        self.element.set_src(&handle);
        self.element.load();
        Ok(PlaybackSource {
            handle,
            info: self.describe(file),
        })
    }

    fn release(&self, source: &PlaybackSource) {
        if let Err(e) = Url::revoke_object_url(&source.handle) {
            warn!(handle = %source.handle, reason = %js_reason(&e), "failed to revoke object URL");
        }
    }

    async fn play(&self) -> Result<()> {
        let rejected = |e: JsValue| PlayerError::PlaybackRejected {
            reason: js_reason(&e),
        };
        let promise = self.element.play().map_err(rejected)?;
        JsFuture::from(promise).await.map_err(rejected)?;
        Ok(())
    }

    fn pause(&self) {
        if let Err(e) = self.element.pause() {
            warn!(reason = %js_reason(&e), "native pause failed");
        }
    }

    fn is_paused(&self) -> bool {
        self.element.paused()
    }

    fn current_time(&self) -> f64 {
        self.element.current_time()
    }

    fn duration(&self) -> f64 {
        self.element.duration()
    }
}
