//! HTML5 media element surface

use kino_vast::{MediaErrorCode, MediaEventKind, MediaSurface};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use tracing::{debug, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Event, HtmlMediaElement, HtmlVideoElement};

/// Schedules delivery of queued events and timers to the player
pub type Waker = Rc<dyn Fn()>;

/// A watched `<video>` element
///
/// DOM listeners only queue the event and wake the player, which drains the
/// queue once it is free.
pub struct WebVideo {
    element: HtmlMediaElement,
    click_event: String,
    queue: Rc<RefCell<VecDeque<MediaEventKind>>>,
    listeners: HashMap<MediaEventKind, Closure<dyn FnMut(Event)>>,
    wake: Waker,
}

impl WebVideo {
    pub fn new(element: HtmlMediaElement, click_event: &str, wake: Waker) -> Self {
        Self {
            element,
            click_event: click_event.to_string(),
            queue: Rc::new(RefCell::new(VecDeque::new())),
            listeners: HashMap::new(),
            wake,
        }
    }

    pub fn element(&self) -> &HtmlMediaElement {
        &self.element
    }

    fn event_name(&self, kind: MediaEventKind) -> &str {
        match kind {
            MediaEventKind::Click => &self.click_event,
            other => other.as_str(),
        }
    }
}

impl MediaSurface for WebVideo {
    fn is_video(&self) -> bool {
        self.element.dyn_ref::<HtmlVideoElement>().is_some()
    }

    fn paused(&self) -> bool {
        self.element.paused()
    }

    fn ended(&self) -> bool {
        self.element.ended()
    }

    fn current_time(&self) -> f64 {
        self.element.current_time()
    }

    fn set_current_time(&mut self, time: f64) {
        self.element.set_current_time(time);
    }

    fn duration(&self) -> Option<f64> {
        Some(self.element.duration()).filter(|d| d.is_finite())
    }

    fn current_src(&self) -> Option<String> {
        Some(self.element.current_src()).filter(|src| !src.is_empty())
    }

    fn set_src(&mut self, src: &str) {
        self.element.set_src(src);
    }

    fn load(&mut self) {
        self.element.load();
    }

    fn play(&mut self) {
        match self.element.play() {
            Ok(promise) => wasm_bindgen_futures::spawn_local(async move {
                if let Err(err) = JsFuture::from(promise).await {
                    debug!(error = ?err, "Play request rejected");
                }
            }),
            Err(err) => warn!(error = ?err, "Play failed"),
        }
    }

    fn pause(&mut self) {
        if let Err(err) = self.element.pause() {
            warn!(error = ?err, "Pause failed");
        }
    }

    fn controls(&self) -> bool {
        self.element.controls()
    }

    fn set_controls(&mut self, visible: bool) {
        self.element.set_controls(visible);
    }

    fn set_autoplay(&mut self, autoplay: bool) {
        self.element.set_autoplay(autoplay);
    }

    fn seekable_end(&self) -> Option<f64> {
        let ranges = self.element.seekable();
        if ranges.length() == 0 {
            return None;
        }
        ranges.end(0).ok()
    }

    fn error(&self) -> Option<MediaErrorCode> {
        self.element
            .error()
            .map(|err| MediaErrorCode::from_code(err.code()))
    }

    fn dispatch(&mut self, kind: MediaEventKind) {
        let dispatched = Event::new(self.event_name(kind))
            .and_then(|event| self.element.dispatch_event(&event));
        if let Err(err) = dispatched {
            warn!(event = %kind, error = ?err, "Could not dispatch event");
        }
    }

    fn subscribe(&mut self, kind: MediaEventKind) {
        if self.listeners.contains_key(&kind) {
            return;
        }
        let queue = self.queue.clone();
        let wake = self.wake.clone();
        let listener = Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
            queue.borrow_mut().push_back(kind);
            wake();
        });

        let name = self.event_name(kind).to_string();
        match self
            .element
            .add_event_listener_with_callback(&name, listener.as_ref().unchecked_ref())
        {
            Ok(()) => {
                self.listeners.insert(kind, listener);
            }
            Err(err) => warn!(event = %name, error = ?err, "Could not listen to element"),
        }
    }

    fn unsubscribe(&mut self, kind: MediaEventKind) {
        let Some(listener) = self.listeners.remove(&kind) else {
            return;
        };
        let name = self.event_name(kind).to_string();
        let _ = self
            .element
            .remove_event_listener_with_callback(&name, listener.as_ref().unchecked_ref());
        self.queue.borrow_mut().retain(|queued| *queued != kind);
    }

    fn take_pending_event(&mut self) -> Option<MediaEventKind> {
        self.queue.borrow_mut().pop_front()
    }
}

impl Drop for WebVideo {
    fn drop(&mut self) {
        let kinds: Vec<_> = self.listeners.keys().copied().collect();
        for kind in kinds {
            self.unsubscribe(kind);
        }
    }
}

/// Hand a JS value to callbacks expecting the element
pub fn element_value(video: &WebVideo) -> JsValue {
    video.element().clone().into()
}
