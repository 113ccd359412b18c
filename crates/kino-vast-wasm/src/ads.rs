//! JavaScript VAST objects
//!
//! Adapts the ad objects of a JavaScript VAST library (`hasData()`,
//! `getNextAd()`, `getCompanions()`, `linear.getBestMedia()`, ...) to the
//! player's ad traits.

use js_sys::{Array, Function, Object, Reflect};
use kino_vast::{
    AdHandle, AdMedia, Companion, LinearCreative, Offset, RequestSettings, TrackingEvent,
    TrackingPoint, VastAd,
};
use std::any::Any;
use std::rc::Rc;
use tracing::warn;
use wasm_bindgen::{JsCast, JsValue};

/// Property of `target`, `None` when missing or null
fn get(target: &JsValue, key: &str) -> Option<JsValue> {
    Reflect::get(target, &JsValue::from_str(key))
        .ok()
        .filter(|value| !value.is_undefined() && !value.is_null())
}

/// Call `target[method](...args)`, `None` when missing, null or throwing
fn call(target: &JsValue, method: &str, args: &[JsValue]) -> Option<JsValue> {
    let function = get(target, method)?.dyn_into::<Function>().ok()?;
    let args: Array = args.iter().collect();
    match Reflect::apply(&function, target, &args) {
        Ok(value) if !value.is_undefined() && !value.is_null() => Some(value),
        Ok(_) => None,
        Err(err) => {
            warn!(method, error = ?err, "VAST object call failed");
            None
        }
    }
}

fn optional_f64(value: Option<f64>) -> JsValue {
    value.map(JsValue::from_f64).unwrap_or(JsValue::UNDEFINED)
}

fn optional_u32(value: Option<u32>) -> JsValue {
    value.map(JsValue::from).unwrap_or(JsValue::NULL)
}

/// `requestSettings` object handed to `getBestMedia`
fn request_settings(settings: &RequestSettings) -> JsValue {
    let object = Object::new();
    let fields = [
        ("width", optional_u32(settings.width)),
        ("height", optional_u32(settings.height)),
        ("bitrate", optional_u32(settings.bitrate)),
        (
            "insertionPointType",
            settings
                .insertion_point
                .map(|point| JsValue::from_str(&point.to_string()))
                .unwrap_or(JsValue::NULL),
        ),
        (
            "playbackPosition",
            settings
                .playback_position
                .map(JsValue::from_f64)
                .unwrap_or(JsValue::NULL),
        ),
    ];
    for (key, value) in fields {
        let _ = Reflect::set(&object, &JsValue::from_str(key), &value);
    }
    object.into()
}

/// An ad of a JavaScript VAST response
pub struct JsVastAd {
    raw: JsValue,
}

impl JsVastAd {
    pub fn new(raw: JsValue) -> Self {
        Self { raw }
    }

    /// Wrap `raw` unless it is null or undefined
    pub fn handle(raw: JsValue) -> Option<AdHandle> {
        if raw.is_undefined() || raw.is_null() {
            return None;
        }
        Some(Rc::new(Self::new(raw)))
    }
}

impl VastAd for JsVastAd {
    fn has_data(&self) -> bool {
        call(&self.raw, "hasData", &[])
            .map(|value| value.is_truthy())
            .unwrap_or(false)
    }

    fn next_ad(&self) -> Option<AdHandle> {
        call(&self.raw, "getNextAd", &[]).and_then(JsVastAd::handle)
    }

    fn companions(&self) -> Vec<Rc<dyn Companion>> {
        let Some(list) = call(&self.raw, "getCompanions", &[]) else {
            return Vec::new();
        };
        Array::from(&list)
            .iter()
            .filter(|value| value.is_object())
            .map(|raw| Rc::new(JsCompanion { raw }) as Rc<dyn Companion>)
            .collect()
    }

    fn linear(&self) -> Option<Rc<dyn LinearCreative>> {
        get(&self.raw, "linear").map(|raw| Rc::new(JsLinear { raw }) as Rc<dyn LinearCreative>)
    }
}

/// Linear creative of a JavaScript ad
pub struct JsLinear {
    raw: JsValue,
}

impl LinearCreative for JsLinear {
    fn best_media(&self, settings: &RequestSettings) -> Option<AdMedia> {
        let media = call(&self.raw, "getBestMedia", &[request_settings(settings)])?;
        let src = get(&media, "src")?.as_string()?;
        let duration = get(&media, "duration")
            .and_then(|d| d.as_f64())
            .unwrap_or(0.0);
        Some(AdMedia { src, duration })
    }

    fn click_through(&self) -> Option<String> {
        call(&self.raw, "getClickThrough", &[]).and_then(|url| url.as_string())
    }

    fn tracking_points(&self) -> Vec<TrackingPoint> {
        let Some(list) = call(&self.raw, "getTrackingPoints", &[]) else {
            return Vec::new();
        };

        let mut points = Vec::new();
        for raw in Array::from(&list).iter() {
            let Some(event) = get(&raw, "event").and_then(|e| e.as_string()) else {
                continue;
            };
            let offset = get(&raw, "offset").and_then(|offset| match offset.as_f64() {
                Some(secs) => Some(Offset::Absolute(secs)),
                None => offset.as_string().and_then(|s| s.parse().ok()),
            });
            match offset {
                Some(offset) => points.push(TrackingPoint::new(event, offset)),
                None => warn!(event = %event, "Tracking point without a usable offset"),
            }
        }
        points
    }

    fn track(&self, event: &TrackingEvent, current_time: Option<f64>, media_url: Option<&str>) {
        let url = media_url.map(JsValue::from_str).unwrap_or(JsValue::UNDEFINED);
        call(
            &self.raw,
            "track",
            &[JsValue::from_str(event.as_str()), optional_f64(current_time), url],
        );
    }
}

/// Companion creative of a JavaScript ad
pub struct JsCompanion {
    raw: JsValue,
}

impl JsCompanion {
    /// The library's own companion object
    pub fn raw(&self) -> &JsValue {
        &self.raw
    }
}

impl Companion for JsCompanion {
    fn html(&self) -> String {
        get(&self.raw, "html")
            .or_else(|| get(&self.raw, "code"))
            .and_then(|html| html.as_string())
            .unwrap_or_default()
    }

    fn zone_id(&self) -> Option<String> {
        get(&self.raw, "zoneId").and_then(|zone| zone.as_string())
    }

    fn width(&self) -> Option<u32> {
        get(&self.raw, "width").and_then(|w| w.as_f64()).map(|w| w as u32)
    }

    fn height(&self) -> Option<u32> {
        get(&self.raw, "height").and_then(|h| h.as_f64()).map(|h| h as u32)
    }

    fn track(&self, event: &TrackingEvent) {
        call(&self.raw, "track", &[JsValue::from_str(event.as_str())]);
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }
}
