//! Browser host
//!
//! Mounts a [`PlayerSession`] on the player page and wires DOM events to it.
//!
//! Build with: `wasm-pack build --target web -- --features web`
//! then call `start()` (optionally with a JSON config) from the page.

mod host;
mod view;

use std::rc::Rc;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, EventTarget, HtmlAudioElement, HtmlButtonElement, HtmlInputElement};

pub use host::{HtmlAudio, WebAudioContext, WebAudioHost, WorkletNode};
pub use view::{DomView, ElementIds};

use crate::config::PlayerConfig;
use crate::engine::ControlKind;
use crate::error::PlayerError;
use crate::player::{PlayerCommand, PlayerSession};
use view::by_id;

type WebSession = PlayerSession<WebAudioHost, DomView>;

fn to_js(error: PlayerError) -> JsValue {
    JsValue::from_str(&error.to_string())
}

/// Report a failed command on the console, where the page's developer sees it
fn report(result: crate::Result<()>) {
    if let Err(e) = result {
        web_sys::console::error_1(&JsValue::from_str(&format!(
            "[{}] {}",
            e.error_code(),
            e
        )));
    }
}

fn listen(
    target: &EventTarget,
    event: &str,
    handler: impl FnMut(Event) + 'static,
) -> Result<(), JsValue> {
    let callback = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
    target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
    callback.forget();
    Ok(())
}

/// Mount the player on the current page.
///
/// Panics and `tracing` events go to the browser console.
///
/// `config_json` overrides the default configuration (module URL, labels,
/// ranges). Missing sections keep their defaults.
#[wasm_bindgen]
pub fn start(config_json: Option<String>) -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    // A page calling start() twice keeps the first subscriber.
    let _ = tracing_wasm::try_set_as_global_default();

    let config = match config_json {
        Some(json) => PlayerConfig::from_json_str(&json).map_err(to_js)?,
        None => PlayerConfig::default(),
    };

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let ids = ElementIds::default();

    let audio: HtmlAudioElement = by_id(&document, &ids.audio)?;
    let file_input: HtmlInputElement = by_id(&document, &ids.file_input)?;
    let play_button: HtmlButtonElement = by_id(&document, &ids.play_pause)?;
    let tempo_slider: HtmlInputElement = by_id(&document, &ids.tempo_slider)?;
    let pitch_slider: HtmlInputElement = by_id(&document, &ids.pitch_slider)?;

    let view = DomView::from_document(&window, &document, &ids)?;
    let session: Rc<WebSession> = Rc::new(
        PlayerSession::new(config, WebAudioHost, HtmlAudio::new(audio.clone()), view)
            .map_err(to_js)?,
    );

    // Sliders may carry values restored by the browser; adopt them.
    report(session.set_control(ControlKind::Tempo, &tempo_slider.value()).map(|_| ()));
    report(session.set_control(ControlKind::Pitch, &pitch_slider.value()).map(|_| ()));

    {
        let session = Rc::clone(&session);
        let input = file_input.clone();
        listen(&file_input, "change", move |_event| {
            let file = input.files().and_then(|files| files.get(0));
            if let Some(file) = file {
                report(session.select_file(&file));
            }
        })?;
    }

    {
        let session = Rc::clone(&session);
        listen(&play_button, "click", move |_event| {
            let session = Rc::clone(&session);
            wasm_bindgen_futures::spawn_local(async move {
                report(session.dispatch(PlayerCommand::TogglePlay).await);
            });
        })?;
    }

    for (slider, kind) in [
        (tempo_slider, ControlKind::Tempo),
        (pitch_slider, ControlKind::Pitch),
    ] {
        let session = Rc::clone(&session);
        let input = slider.clone();
        listen(&slider, "input", move |_event| {
            report(session.set_control(kind, &input.value()).map(|_| ()));
        })?;
    }

    for event in ["timeupdate", "loadedmetadata"] {
        let session = Rc::clone(&session);
        listen(&audio, event, move |_event| {
            session.refresh_position();
        })?;
    }

    {
        let session = Rc::clone(&session);
        listen(&audio, "ended", move |_event| session.on_ended())?;
    }

    {
        let session = Rc::clone(&session);
        let doc = document.clone();
        listen(&document, "visibilitychange", move |_event| {
            session.on_visibility_change(doc.hidden());
        })?;
    }

    Ok(())
}
