//! Parsed VAST ad contract
//!
//! VAST documents are fetched and parsed elsewhere; the player only walks the
//! resulting ad chain through these traits. Handles are reference counted and
//! single-threaded, matching the event loop that drives the player.

use crate::types::{AdMedia, Offset, RequestSettings};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Shared handle to an ad in a VAST chain
pub type AdHandle = Rc<dyn VastAd>;

/// One ad of a VAST response
pub trait VastAd {
    /// Whether the ad's data has been loaded and can be shown
    fn has_data(&self) -> bool;

    /// Successor in the ad chain
    fn next_ad(&self) -> Option<AdHandle>;

    /// Companion creatives to show alongside the ad
    fn companions(&self) -> Vec<Rc<dyn Companion>>;

    /// The linear (video) creative, if the ad has one
    fn linear(&self) -> Option<Rc<dyn LinearCreative>>;
}

/// A playable video creative
pub trait LinearCreative {
    /// Select the media file best matching the playback environment
    fn best_media(&self, settings: &RequestSettings) -> Option<AdMedia>;

    /// Click-through URL
    fn click_through(&self) -> Option<String>;

    /// Progress events to report during playback
    fn tracking_points(&self) -> Vec<TrackingPoint>;

    /// Send the tracking beacons registered for `event`
    fn track(&self, event: &TrackingEvent, current_time: Option<f64>, media_url: Option<&str>);
}

/// A non-video creative shown next to the player
pub trait Companion {
    /// Markup to render, usually an iframe
    fn html(&self) -> String;

    /// Ad zone identifier
    fn zone_id(&self) -> Option<String>;

    fn width(&self) -> Option<u32>;

    fn height(&self) -> Option<u32>;

    /// Send the tracking beacons registered for `event`
    fn track(&self, event: &TrackingEvent);

    /// Concrete companion, for renderers that need the host's own object
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }
}

/// Tracking event name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TrackingEvent {
    CreativeView,
    Start,
    FirstQuartile,
    Midpoint,
    ThirdQuartile,
    Complete,
    Resume,
    Pause,
    Click,
    Progress,
    Other(String),
}

impl TrackingEvent {
    pub fn as_str(&self) -> &str {
        match self {
            TrackingEvent::CreativeView => "creativeView",
            TrackingEvent::Start => "start",
            TrackingEvent::FirstQuartile => "firstQuartile",
            TrackingEvent::Midpoint => "midpoint",
            TrackingEvent::ThirdQuartile => "thirdQuartile",
            TrackingEvent::Complete => "complete",
            TrackingEvent::Resume => "resume",
            TrackingEvent::Pause => "pause",
            TrackingEvent::Click => "click",
            TrackingEvent::Progress => "progress",
            TrackingEvent::Other(name) => name,
        }
    }
}

impl From<&str> for TrackingEvent {
    fn from(name: &str) -> Self {
        match name {
            "creativeView" => TrackingEvent::CreativeView,
            "start" => TrackingEvent::Start,
            "firstQuartile" => TrackingEvent::FirstQuartile,
            "midpoint" => TrackingEvent::Midpoint,
            "thirdQuartile" => TrackingEvent::ThirdQuartile,
            "complete" => TrackingEvent::Complete,
            "resume" => TrackingEvent::Resume,
            "pause" => TrackingEvent::Pause,
            "click" => TrackingEvent::Click,
            "progress" => TrackingEvent::Progress,
            other => TrackingEvent::Other(other.to_string()),
        }
    }
}

impl From<String> for TrackingEvent {
    fn from(name: String) -> Self {
        TrackingEvent::from(name.as_str())
    }
}

impl From<TrackingEvent> for String {
    fn from(event: TrackingEvent) -> Self {
        event.as_str().to_string()
    }
}

impl fmt::Display for TrackingEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An analytics beacon to fire once playback reaches `offset`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingPoint {
    pub event: TrackingEvent,
    pub offset: Offset,
}

impl TrackingPoint {
    pub fn new(event: impl Into<TrackingEvent>, offset: Offset) -> Self {
        Self {
            event: event.into(),
            offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_event_names() {
        assert_eq!(TrackingEvent::from("firstQuartile"), TrackingEvent::FirstQuartile);
        assert_eq!(TrackingEvent::CreativeView.as_str(), "creativeView");
        assert_eq!(
            TrackingEvent::from("acceptInvitation"),
            TrackingEvent::Other("acceptInvitation".to_string())
        );
    }

    #[test]
    fn test_tracking_point_json() {
        let point: TrackingPoint =
            serde_json::from_str(r#"{"event":"midpoint","offset":"50%"}"#).unwrap();
        assert_eq!(point.event, TrackingEvent::Midpoint);
        assert_eq!(point.offset, Offset::Fraction(0.5));
    }
}
