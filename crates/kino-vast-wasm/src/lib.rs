//! Kino VAST WASM - VAST ad player for HTML5 video
//!
//! Drives a page's `<video>` element through pre-roll, mid-roll and
//! post-roll breaks using ads from a JavaScript VAST library.
//!
//! ## Integration
//!
//! ```javascript
//! import init, { KinoVastPlayer } from '@kino/vast-wasm';
//!
//! await init();
//! const ads = new KinoVastPlayer({ clickEvent: 'click' });
//! ads.setSkipHandler(showSkipButton, hideSkipButton);
//! ads.scheduleBreak('start', vastResponse.getAd());
//! ads.watchPlayer(document.querySelector('video'));
//! ```

use js_sys::Function;
use kino_vast::{
    AdEndedCallback, AdPlayer, AdPlayerConfig, AdStartedCallback, Companion, CompanionRenderer,
    ElementCallback,
};
use serde::Deserialize;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{error, warn};
use wasm_bindgen::prelude::*;
use web_sys::HtmlMediaElement;

mod ads;
mod host;
mod video;

pub use ads::{JsCompanion, JsLinear, JsVastAd};
pub use host::WebHost;
pub use video::{Waker, WebVideo};

type WebPlayer = AdPlayer<WebVideo, WebHost>;
type SharedPlayer = Rc<RefCell<WebPlayer>>;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    web_sys::console::log_1(&"[Kino VAST] Initialized".into());
}

/// Library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Options accepted by the `KinoVastPlayer` constructor
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerOptions {
    pub config: AdPlayerConfig,
    /// DOM event treated as a click on the video (`touchstart` on some tablets)
    pub click_event: String,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            config: AdPlayerConfig::default(),
            click_event: "click".to_string(),
        }
    }
}

/// Drain queued element events and fired timers into the player
fn deliver(player: &SharedPlayer) {
    // Busy means a call is on the stack; it drains the queues itself
    let Ok(mut player) = player.try_borrow_mut() else {
        return;
    };
    loop {
        player.pump();
        let Some((id, reason)) = player.host_mut().take_fired() else {
            break;
        };
        player.handle_timer(id, reason);
    }
}

fn waker(weak: Weak<RefCell<WebPlayer>>) -> Waker {
    Rc::new(move || {
        let weak = weak.clone();
        wasm_bindgen_futures::spawn_local(async move {
            if let Some(player) = weak.upgrade() {
                deliver(&player);
            }
        });
    })
}

fn invoke(callback: &Function, arg: &JsValue) -> Option<JsValue> {
    match callback.call1(&JsValue::NULL, arg) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(error = ?err, "Callback threw");
            None
        }
    }
}

/// VAST ad player for one `<video>` element at a time
#[wasm_bindgen]
pub struct KinoVastPlayer {
    inner: SharedPlayer,
    click_event: String,
}

#[wasm_bindgen]
impl KinoVastPlayer {
    /// Create a player; `options` may be omitted
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<KinoVastPlayer, JsValue> {
        let options: PlayerOptions = if options.is_undefined() || options.is_null() {
            PlayerOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options)?
        };
        options
            .config
            .validate()
            .map_err(|err| JsValue::from_str(&err.to_string()))?;

        let config = options.config;
        let inner = Rc::new_cyclic(|weak: &Weak<RefCell<WebPlayer>>| {
            RefCell::new(AdPlayer::with_config(config, WebHost::new(waker(weak.clone()))))
        });
        Ok(Self {
            inner,
            click_event: options.click_event,
        })
    }

    /// Describe the video frame offered to ad media selection
    #[wasm_bindgen(js_name = setVideoProperties)]
    pub fn set_video_properties(&self, width: u32, height: u32, bitrate: Option<u32>) {
        self.update(move |player| player.set_video_properties(width, height, bitrate));
    }

    #[wasm_bindgen(js_name = setAdsEnabled)]
    pub fn set_ads_enabled(&self, enabled: bool) {
        self.update(move |player| player.set_ads_enabled(enabled));
    }

    /// Callbacks driving a skip button: `onAdStarted(duration)` and `onAdEnded()`
    #[wasm_bindgen(js_name = setSkipHandler)]
    pub fn set_skip_handler(&self, on_ad_started: Option<Function>, on_ad_ended: Option<Function>) {
        let on_ad_started = on_ad_started.map(|f| {
            Box::new(move |duration: f64| {
                invoke(&f, &JsValue::from_f64(duration));
            }) as AdStartedCallback
        });
        let on_ad_ended = on_ad_ended.map(|f| {
            Box::new(move || {
                invoke(&f, &JsValue::UNDEFINED);
            }) as AdEndedCallback
        });
        self.update(move |player| player.set_skip_handler(on_ad_started, on_ad_ended));
    }

    /// Companion renderer, called with the library's companion object and returning whether it was shown
    #[wasm_bindgen(js_name = setCompanionHandler)]
    pub fn set_companion_handler(&self, handler: Option<Function>) {
        let renderer = handler.map(|f| {
            Box::new(move |companion: &dyn Companion| {
                let raw = companion
                    .as_any()
                    .and_then(|any| any.downcast_ref::<JsCompanion>())
                    .map(|c| c.raw().clone())
                    .unwrap_or(JsValue::NULL);
                invoke(&f, &raw).is_some_and(|shown| shown.is_truthy())
            }) as CompanionRenderer
        });
        self.update(move |player| player.set_companion_handler(renderer));
    }

    /// Callbacks receiving the video element when ads take it over and release it
    #[wasm_bindgen(js_name = setTakeoverCallbacks)]
    pub fn set_takeover_callbacks(&self, on_takeover: Option<Function>, on_release: Option<Function>) {
        let wrap = |f: Function| {
            Box::new(move |video: &mut WebVideo| {
                invoke(&f, &video::element_value(video));
            }) as ElementCallback<WebVideo>
        };
        let on_takeover = on_takeover.map(wrap);
        let on_release = on_release.map(wrap);
        self.update(move |player| player.set_takeover_callbacks(on_takeover, on_release));
    }

    /// Watch `element`; returns false if it cannot play video
    #[wasm_bindgen(js_name = watchPlayer)]
    pub fn watch_player(&self, element: JsValue) -> bool {
        let Ok(element) = element.dyn_into::<HtmlMediaElement>() else {
            error!("Not watching player: not a media element");
            return false;
        };
        let watched = {
            let Ok(mut player) = self.inner.try_borrow_mut() else {
                warn!("watchPlayer called from a player callback");
                return false;
            };
            let video = WebVideo::new(element, &self.click_event, waker(Rc::downgrade(&self.inner)));
            player.watch_player(video).is_ok()
        };
        deliver(&self.inner);
        watched
    }

    /// Stop watching the current element
    #[wasm_bindgen(js_name = unwatchPlayer)]
    pub fn unwatch_player(&self) {
        self.update(|player| {
            player.unwatch_player();
        });
    }

    /// Schedule a VAST ad at `start`, `end`, `HH:MM:SS` or `NN%`
    #[wasm_bindgen(js_name = scheduleBreak)]
    pub fn schedule_break(&self, position: &str, ad: JsValue) -> bool {
        let Some(ad) = JsVastAd::handle(ad) else {
            error!(position, "Ad break without an ad");
            return false;
        };
        let Ok(mut player) = self.inner.try_borrow_mut() else {
            warn!("scheduleBreak called from a player callback");
            return false;
        };
        player.schedule_break(position, ad).is_ok()
    }

    /// Skip the ad currently playing
    #[wasm_bindgen(js_name = skipCurrentAd)]
    pub fn skip_current_ad(&self) {
        self.update(|player| player.skip_current_ad());
    }

    #[wasm_bindgen(getter, js_name = adPlaying)]
    pub fn ad_playing(&self) -> bool {
        self.inner.try_borrow().map(|p| p.ad_playing()).unwrap_or(true)
    }

    #[wasm_bindgen(getter, js_name = isWatching)]
    pub fn is_watching(&self) -> bool {
        self.inner.try_borrow().map(|p| p.is_watching()).unwrap_or(true)
    }

    /// Ad phase: `idle`, `taking_over`, `playing_ad`, `advancing_ad`, `releasing` or `resumed`
    #[wasm_bindgen(getter)]
    pub fn phase(&self) -> String {
        self.inner
            .try_borrow()
            .map(|p| p.phase().to_string())
            .unwrap_or_default()
    }

    /// Content state saved for the running break, or `null`
    #[wasm_bindgen(js_name = contentSnapshot)]
    pub fn content_snapshot(&self) -> Result<JsValue, JsValue> {
        let Ok(player) = self.inner.try_borrow() else {
            return Ok(JsValue::NULL);
        };
        match player.snapshot() {
            Some(snapshot) => Ok(serde_wasm_bindgen::to_value(snapshot)?),
            None => Ok(JsValue::NULL),
        }
    }
}

impl KinoVastPlayer {
    /// Apply `f` now, or once the player is free when called from one of its callbacks
    fn update(&self, f: impl FnOnce(&mut WebPlayer) + 'static) {
        match self.inner.try_borrow_mut() {
            Ok(mut player) => f(&mut player),
            Err(_) => {
                let weak = Rc::downgrade(&self.inner);
                wasm_bindgen_futures::spawn_local(async move {
                    let Some(inner) = weak.upgrade() else {
                        return;
                    };
                    match inner.try_borrow_mut() {
                        Ok(mut player) => f(&mut player),
                        Err(_) => warn!("Player still busy, call dropped"),
                    }
                    deliver(&inner);
                });
                return;
            }
        }
        deliver(&self.inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = PlayerOptions::default();
        assert_eq!(options.click_event, "click");
        assert_eq!(options.config, AdPlayerConfig::default());
    }

    #[test]
    fn test_options_json() {
        let options: PlayerOptions = serde_json::from_str(
            r#"{ "clickEvent": "touchstart", "config": { "ad_load_timeout_ms": null } }"#,
        )
        .unwrap();
        assert_eq!(options.click_event, "touchstart");
        assert_eq!(options.config.ad_load_timeout_ms, None);
        assert_eq!(options.config.buffer_poll_interval_ms, 200);
    }
}
