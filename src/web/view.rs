//! DOM view
//!
//! Binds [`PlayerView`] to the player page's elements by id.

use tracing::warn;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlButtonElement, HtmlElement, Window};

use super::host::js_reason;
use crate::engine::PlayerView;

/// Element ids (and the status dot selector) of the player page
#[derive(Debug, Clone)]
pub struct ElementIds {
    pub audio: String,
    pub file_input: String,
    pub play_pause: String,
    pub track_title: String,
    pub track_artist: String,
    pub file_hint: String,
    pub tempo_slider: String,
    pub pitch_slider: String,
    pub tempo_display: String,
    pub pitch_display: String,
    pub current_time: String,
    pub duration: String,
    pub time_bar_fill: String,
    pub cover: String,
    pub status_text: String,
    pub status_dot_selector: String,
}

impl Default for ElementIds {
    fn default() -> Self {
        Self {
            audio: "audio".to_string(),
            file_input: "fileInput".to_string(),
            play_pause: "playPause".to_string(),
            track_title: "trackTitle".to_string(),
            track_artist: "trackArtist".to_string(),
            file_hint: "fileHint".to_string(),
            tempo_slider: "tempoSlider".to_string(),
            pitch_slider: "pitchSlider".to_string(),
            tempo_display: "tempoDisplay".to_string(),
            pitch_display: "pitchDisplay".to_string(),
            current_time: "currentTime".to_string(),
            duration: "duration".to_string(),
            time_bar_fill: "timeBarFill".to_string(),
            cover: "cover".to_string(),
            status_text: "statusText".to_string(),
            status_dot_selector: ".status-dot".to_string(),
        }
    }
}

/// Look up an element by id and cast it
pub(crate) fn by_id<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("missing element #{id}")))?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("element #{id} has an unexpected type")))
}

fn log_dom_error<T>(what: &str, result: Result<T, JsValue>) {
    if let Err(e) = result {
        warn!(reason = %js_reason(&e), "DOM update failed: {what}");
    }
}

pub struct DomView {
    window: Window,
    title: HtmlElement,
    artist: HtmlElement,
    hint: HtmlElement,
    play_button: HtmlButtonElement,
    current_time: HtmlElement,
    duration: HtmlElement,
    time_bar_fill: HtmlElement,
    cover: HtmlElement,
    status_text: HtmlElement,
    status_dot: Element,
    tempo_display: HtmlElement,
    pitch_display: HtmlElement,
}

impl DomView {
    pub fn from_document(
        window: &Window,
        document: &Document,
        ids: &ElementIds,
    ) -> Result<Self, JsValue> {
        let status_dot = document
            .query_selector(&ids.status_dot_selector)?
            .ok_or_else(|| {
                JsValue::from_str(&format!("missing element {}", ids.status_dot_selector))
            })?;

        Ok(Self {
            window: window.clone(),
            title: by_id(document, &ids.track_title)?,
            artist: by_id(document, &ids.track_artist)?,
            hint: by_id(document, &ids.file_hint)?,
            play_button: by_id(document, &ids.play_pause)?,
            current_time: by_id(document, &ids.current_time)?,
            duration: by_id(document, &ids.duration)?,
            time_bar_fill: by_id(document, &ids.time_bar_fill)?,
            cover: by_id(document, &ids.cover)?,
            status_text: by_id(document, &ids.status_text)?,
            status_dot,
            tempo_display: by_id(document, &ids.tempo_display)?,
            pitch_display: by_id(document, &ids.pitch_display)?,
        })
    }
}

impl PlayerView for DomView {
    fn show_track(&self, title: &str, artist: &str, hint: &str) {
        self.title.set_text_content(Some(title));
        self.artist.set_text_content(Some(artist));
        self.hint.set_text_content(Some(hint));
    }

    fn set_play_enabled(&self, enabled: bool) {
        self.play_button.set_disabled(!enabled);
    }

    fn set_play_label(&self, label: &str) {
        self.play_button.set_text_content(Some(label));
    }

    fn set_now_playing(&self, playing: bool) {
        log_dom_error(
            "cover class",
            self.cover.class_list().toggle_with_force("playing", playing),
        );
    }

    fn set_clock(&self, elapsed: &str, total: &str) {
        self.current_time.set_text_content(Some(elapsed));
        self.duration.set_text_content(Some(total));
    }

    fn set_progress(&self, percent: f64) {
        log_dom_error(
            "progress width",
            self.time_bar_fill
                .style()
                .set_property("width", &format!("{percent}%")),
        );
    }

    fn set_status(&self, text: &str) {
        self.status_text.set_text_content(Some(text));
    }

    fn set_ready(&self, ready: bool) {
        log_dom_error(
            "status dot class",
            self.status_dot.class_list().toggle_with_force("ready", ready),
        );
    }

    fn set_tempo_label(&self, label: &str) {
        self.tempo_display.set_text_content(Some(label));
    }

    fn set_pitch_label(&self, label: &str) {
        self.pitch_display.set_text_content(Some(label));
    }

    fn alert(&self, message: &str) {
        log_dom_error("alert", self.window.alert_with_message(message));
    }
}
