//! Simulated playback environment
//!
//! In-memory stand-ins for a video element, a timer host and parsed VAST
//! ads, driven by a virtual clock. Used by the test suites and by the CLI to
//! replay scenarios without a browser.

use crate::{
    config::AdPlayerConfig,
    player::AdPlayer,
    surface::{HostEnv, MediaSurface},
    types::*,
    vast::{AdHandle, Companion, LinearCreative, TrackingEvent, TrackingPoint, VastAd},
    Result,
};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;
use tracing::debug;
use url::Url;

fn default_true() -> bool {
    true
}

fn default_buffer_rate() -> f64 {
    10.0
}

fn default_load_latency() -> f64 {
    0.25
}

// =============================================================================
// Simulated video element
// =============================================================================

/// Media known to the simulated element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimMedia {
    /// Duration in seconds
    pub duration: f64,
    /// Seconds seekable once the media can play, `None` for all of it
    #[serde(default)]
    pub seekable_at_ready: Option<f64>,
    /// Seconds of media buffered per second of elapsed time
    #[serde(default = "default_buffer_rate")]
    pub buffer_rate: f64,
    /// `MediaError` code raised instead of becoming playable
    #[serde(default)]
    pub fail_with: Option<u16>,
    /// Never becomes playable
    #[serde(default)]
    pub stall: bool,
}

impl SimMedia {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            seekable_at_ready: None,
            buffer_rate: default_buffer_rate(),
            fail_with: None,
            stall: false,
        }
    }

    /// Only `seekable` seconds are seekable when the media becomes playable
    pub fn buffering(mut self, seekable: f64, buffer_rate: f64) -> Self {
        self.seekable_at_ready = Some(seekable);
        self.buffer_rate = buffer_rate;
        self
    }

    pub fn failing(mut self, code: u16) -> Self {
        self.fail_with = Some(code);
        self
    }

    pub fn stalled(mut self) -> Self {
        self.stall = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LoadState {
    Empty,
    Loading { remaining: f64 },
    Ready,
}

/// A video element with a virtual clock
#[derive(Debug)]
pub struct SimulatedVideo {
    is_video: bool,
    catalog: HashMap<String, SimMedia>,
    src: Option<String>,
    current_src: Option<String>,
    current: Option<SimMedia>,
    load_state: LoadState,
    load_latency: f64,
    current_time: f64,
    paused: bool,
    ended: bool,
    controls: bool,
    autoplay: bool,
    seekable_end: Option<f64>,
    error: Option<MediaErrorCode>,
    subscribed: HashSet<MediaEventKind>,
    pending: VecDeque<MediaEventKind>,
    assigned_sources: Vec<String>,
    dispatched: Vec<MediaEventKind>,
}

impl SimulatedVideo {
    pub fn new() -> Self {
        Self {
            is_video: true,
            catalog: HashMap::new(),
            src: None,
            current_src: None,
            current: None,
            load_state: LoadState::Empty,
            load_latency: default_load_latency(),
            current_time: 0.0,
            paused: true,
            ended: false,
            controls: true,
            autoplay: false,
            seekable_end: None,
            error: None,
            subscribed: HashSet::new(),
            pending: VecDeque::new(),
            assigned_sources: Vec::new(),
            dispatched: Vec::new(),
        }
    }

    /// An element that cannot play video (an `<audio>` or `<div>`)
    pub fn not_a_video() -> Self {
        Self {
            is_video: false,
            ..Self::new()
        }
    }

    /// Element with `src` already loaded and paused at the start
    pub fn with_content(src: &str, duration: f64) -> Self {
        let mut video = Self::new().with_media(src, SimMedia::new(duration));
        video.preload(src);
        video
    }

    pub fn with_media(mut self, src: &str, media: SimMedia) -> Self {
        self.add_media(src, media);
        self
    }

    pub fn add_media(&mut self, src: &str, media: SimMedia) {
        self.catalog.insert(src.to_string(), media);
    }

    /// Seconds between a load and `canplay`
    pub fn with_load_latency(mut self, secs: f64) -> Self {
        self.load_latency = secs;
        self
    }

    /// Content already playing
    pub fn playing(mut self) -> Self {
        self.paused = false;
        self
    }

    /// Load `src` synchronously, as if it had been preloaded
    fn preload(&mut self, src: &str) {
        self.src = Some(src.to_string());
        self.current_src = self.src.clone();
        self.current = self.catalog.get(src).cloned();
        if let Some(media) = &self.current {
            self.load_state = LoadState::Ready;
            self.seekable_end = Some(media.seekable_at_ready.unwrap_or(media.duration));
        }
    }

    /// Advance the clock by `dt` seconds, queueing the resulting events
    pub fn advance(&mut self, dt: f64) {
        match self.load_state {
            LoadState::Empty => return,
            LoadState::Loading { remaining } => {
                let left = remaining - dt;
                if left > 0.0 {
                    self.load_state = LoadState::Loading { remaining: left };
                } else {
                    self.finish_load();
                }
                return;
            }
            LoadState::Ready => {}
        }

        let Some(media) = self.current.clone() else {
            return;
        };
        let seekable = self.seekable_end.unwrap_or(0.0) + media.buffer_rate * dt;
        self.seekable_end = Some(seekable.min(media.duration));

        if !self.paused && !self.ended {
            self.current_time = (self.current_time + dt).min(media.duration);
            self.emit(MediaEventKind::TimeUpdate);
            if self.current_time >= media.duration {
                self.ended = true;
                self.paused = true;
                self.emit(MediaEventKind::Pause);
                self.emit(MediaEventKind::Ended);
            }
        }
    }

    fn finish_load(&mut self) {
        let failure = match &self.current {
            None => Some(MediaErrorCode::SrcNotSupported),
            Some(media) if media.stall => {
                self.load_state = LoadState::Loading {
                    remaining: f64::INFINITY,
                };
                return;
            }
            Some(media) => media.fail_with.map(MediaErrorCode::from_code),
        };

        if let Some(code) = failure {
            self.error = Some(code);
            self.load_state = LoadState::Empty;
            self.emit(MediaEventKind::Error);
            return;
        }

        if let Some(media) = &self.current {
            self.load_state = LoadState::Ready;
            self.seekable_end = Some(media.seekable_at_ready.unwrap_or(media.duration).min(media.duration));
            self.emit(MediaEventKind::CanPlay);
            if self.autoplay {
                self.play();
            }
        }
    }

    fn begin_load(&mut self) {
        self.current_src = self.src.clone();
        self.current = self.src.as_ref().and_then(|s| self.catalog.get(s)).cloned();
        self.current_time = 0.0;
        self.paused = true;
        self.ended = false;
        self.seekable_end = None;
        self.error = None;
        self.load_state = match self.src {
            Some(_) => LoadState::Loading {
                remaining: self.load_latency,
            },
            None => LoadState::Empty,
        };
    }

    fn emit(&mut self, kind: MediaEventKind) {
        if self.subscribed.contains(&kind) {
            self.pending.push_back(kind);
        }
    }

    /// Viewer clicks the element
    pub fn click(&mut self) {
        self.emit(MediaEventKind::Click);
    }

    /// The element reports a media error
    pub fn fail(&mut self, code: u16) {
        self.error = Some(MediaErrorCode::from_code(code));
        self.emit(MediaEventKind::Error);
    }

    pub fn is_subscribed(&self, kind: MediaEventKind) -> bool {
        self.subscribed.contains(&kind)
    }

    pub fn autoplay(&self) -> bool {
        self.autoplay
    }

    /// Every source assigned through `set_src`, in order
    pub fn assigned_sources(&self) -> &[String] {
        &self.assigned_sources
    }

    /// Synthetic events fired through `dispatch`
    pub fn dispatched(&self) -> &[MediaEventKind] {
        &self.dispatched
    }

    pub fn pending_events(&self) -> Vec<MediaEventKind> {
        self.pending.iter().copied().collect()
    }
}

impl Default for SimulatedVideo {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaSurface for SimulatedVideo {
    fn is_video(&self) -> bool {
        self.is_video
    }

    fn paused(&self) -> bool {
        self.paused
    }

    fn ended(&self) -> bool {
        self.ended
    }

    fn current_time(&self) -> f64 {
        self.current_time
    }

    fn set_current_time(&mut self, time: f64) {
        let limit = self.duration().unwrap_or(f64::INFINITY);
        self.current_time = time.clamp(0.0, limit);
        if self.current_time < limit {
            self.ended = false;
        }
        self.emit(MediaEventKind::TimeUpdate);
    }

    fn duration(&self) -> Option<f64> {
        match self.load_state {
            LoadState::Ready => self.current.as_ref().map(|m| m.duration),
            _ => None,
        }
    }

    fn current_src(&self) -> Option<String> {
        self.current_src.clone()
    }

    fn set_src(&mut self, src: &str) {
        self.src = Some(src.to_string());
        self.assigned_sources.push(src.to_string());
        self.begin_load();
    }

    fn load(&mut self) {
        self.begin_load();
    }

    fn play(&mut self) {
        if self.load_state == LoadState::Empty {
            return;
        }
        if self.ended {
            self.current_time = 0.0;
            self.ended = false;
        }
        if self.paused {
            self.paused = false;
            self.emit(MediaEventKind::Play);
        }
    }

    fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            self.emit(MediaEventKind::Pause);
        }
    }

    fn controls(&self) -> bool {
        self.controls
    }

    fn set_controls(&mut self, visible: bool) {
        self.controls = visible;
    }

    fn set_autoplay(&mut self, autoplay: bool) {
        self.autoplay = autoplay;
    }

    fn seekable_end(&self) -> Option<f64> {
        self.seekable_end
    }

    fn error(&self) -> Option<MediaErrorCode> {
        self.error
    }

    fn dispatch(&mut self, kind: MediaEventKind) {
        self.dispatched.push(kind);
        self.emit(kind);
    }

    fn subscribe(&mut self, kind: MediaEventKind) {
        self.subscribed.insert(kind);
    }

    fn unsubscribe(&mut self, kind: MediaEventKind) {
        self.subscribed.remove(&kind);
        self.pending.retain(|k| *k != kind);
    }

    fn take_pending_event(&mut self) -> Option<MediaEventKind> {
        self.pending.pop_front()
    }
}

// =============================================================================
// Virtual-time host
// =============================================================================

/// A timer waiting on the virtual clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledTimer {
    pub id: TimerId,
    pub reason: TimerReason,
    pub due: Duration,
}

/// Host whose timers run on a virtual clock
#[derive(Debug, Default)]
pub struct ManualHost {
    now: Duration,
    next_id: u32,
    timers: Vec<ScheduledTimer>,
    opened: Vec<Url>,
}

impl ManualHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn pending(&self) -> &[ScheduledTimer] {
        &self.timers
    }

    pub fn has_timer(&self, reason: TimerReason) -> bool {
        self.timers.iter().any(|t| t.reason == reason)
    }

    /// URLs opened by click-throughs
    pub fn opened_urls(&self) -> &[Url] {
        &self.opened
    }

    /// Move the clock forward, returning the timers that came due
    pub fn advance(&mut self, dt: Duration) -> Vec<(TimerId, TimerReason)> {
        self.now += dt;
        let now = self.now;
        let (mut due, pending): (Vec<_>, Vec<_>) =
            self.timers.drain(..).partition(|t| t.due <= now);
        self.timers = pending;
        due.sort_by_key(|t| t.due);
        due.into_iter().map(|t| (t.id, t.reason)).collect()
    }

    /// Jump to the earliest timer and return it
    pub fn fire_next(&mut self) -> Option<(TimerId, TimerReason)> {
        let index = self
            .timers
            .iter()
            .enumerate()
            .min_by_key(|(_, t)| t.due)
            .map(|(i, _)| i)?;
        let timer = self.timers.remove(index);
        self.now = self.now.max(timer.due);
        Some((timer.id, timer.reason))
    }
}

impl HostEnv for ManualHost {
    fn start_timer(&mut self, delay: Duration, reason: TimerReason) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.timers.push(ScheduledTimer {
            id,
            reason,
            due: self.now + delay,
        });
        id
    }

    fn clear_timer(&mut self, id: TimerId) {
        self.timers.retain(|t| t.id != id);
    }

    fn open_url(&mut self, url: &Url) {
        debug!(url = %url, "Opening click-through");
        self.opened.push(url.clone());
    }
}

/// Advance the simulated element and the host clock by `dt` seconds
pub fn step(player: &mut AdPlayer<SimulatedVideo, ManualHost>, dt: f64) {
    if let Some(video) = player.surface_mut() {
        video.advance(dt);
    }
    player.pump();

    let fired = player.host_mut().advance(Duration::from_secs_f64(dt));
    for (id, reason) in fired {
        player.handle_timer(id, reason);
        player.pump();
    }
}

/// Run the simulation for `secs` seconds in steps of `tick`
pub fn run_for(player: &mut AdPlayer<SimulatedVideo, ManualHost>, secs: f64, tick: f64) {
    let steps = (secs / tick).ceil() as usize;
    for _ in 0..steps {
        step(player, tick);
    }
}

// =============================================================================
// Scripted ads
// =============================================================================

/// A tracking beacon sent by a scripted creative
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Beacon {
    pub ad_id: String,
    /// `linear` or `companion`
    pub creative: &'static str,
    pub event: TrackingEvent,
    pub time: Option<f64>,
    pub media_url: Option<String>,
}

/// Shared record of every beacon sent
#[derive(Debug, Clone, Default)]
pub struct BeaconLog(Rc<RefCell<Vec<Beacon>>>);

impl BeaconLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, beacon: Beacon) {
        debug!(ad = %beacon.ad_id, event = %beacon.event, time = ?beacon.time, "Beacon");
        self.0.borrow_mut().push(beacon);
    }

    pub fn beacons(&self) -> Vec<Beacon> {
        self.0.borrow().clone()
    }

    /// Events sent for `ad_id`, in order
    pub fn events_for(&self, ad_id: &str) -> Vec<TrackingEvent> {
        self.0
            .borrow()
            .iter()
            .filter(|b| b.ad_id == ad_id)
            .map(|b| b.event.clone())
            .collect()
    }

    pub fn count(&self, ad_id: &str, event: &TrackingEvent) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|b| b.ad_id == ad_id && &b.event == event)
            .count()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

/// A media file of a scripted linear creative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSpec {
    pub src: String,
    pub duration: f64,
    /// Kbps
    #[serde(default)]
    pub bitrate: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    /// Simulated element raises this error code instead of playing
    #[serde(default)]
    pub fail_with: Option<u16>,
    /// Simulated element never gets ready
    #[serde(default)]
    pub stall: bool,
}

impl MediaSpec {
    pub fn new(src: &str, duration: f64) -> Self {
        Self {
            src: src.to_string(),
            duration,
            bitrate: None,
            width: None,
            height: None,
            fail_with: None,
            stall: false,
        }
    }

    fn fits(&self, settings: &RequestSettings) -> bool {
        let bitrate_ok = match (settings.bitrate, self.bitrate) {
            (Some(max), Some(bitrate)) => bitrate <= max,
            _ => true,
        };
        let width_ok = match (settings.width, self.width) {
            (Some(max), Some(width)) => width <= max,
            _ => true,
        };
        bitrate_ok && width_ok
    }

    fn sim_media(&self) -> SimMedia {
        SimMedia {
            fail_with: self.fail_with,
            stall: self.stall,
            ..SimMedia::new(self.duration)
        }
    }
}

/// Linear creative of a scripted ad
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearSpec {
    #[serde(default)]
    pub media: Vec<MediaSpec>,
    #[serde(default)]
    pub click_through: Option<String>,
    #[serde(default)]
    pub tracking: Vec<TrackingPoint>,
}

impl LinearSpec {
    /// Highest bitrate media that fits, else the lightest one
    pub fn select(&self, settings: &RequestSettings) -> Option<&MediaSpec> {
        self.media
            .iter()
            .filter(|m| m.fits(settings))
            .max_by_key(|m| m.bitrate.unwrap_or(0))
            .or_else(|| self.media.iter().min_by_key(|m| m.bitrate.unwrap_or(u32::MAX)))
    }
}

/// Companion creative of a scripted ad
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanionSpec {
    pub html: String,
    #[serde(default)]
    pub zone_id: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Description of an ad
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdSpec {
    pub id: String,
    #[serde(default = "default_true")]
    pub has_data: bool,
    #[serde(default)]
    pub linear: Option<LinearSpec>,
    #[serde(default)]
    pub companions: Vec<CompanionSpec>,
}

impl AdSpec {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            has_data: true,
            linear: None,
            companions: Vec::new(),
        }
    }

    pub fn with_media(mut self, media: MediaSpec) -> Self {
        self.linear.get_or_insert_with(LinearSpec::default).media.push(media);
        self
    }

    pub fn with_tracking(mut self, event: &str, offset: Offset) -> Self {
        self.linear
            .get_or_insert_with(LinearSpec::default)
            .tracking
            .push(TrackingPoint::new(event, offset));
        self
    }

    pub fn with_click_through(mut self, url: &str) -> Self {
        self.linear.get_or_insert_with(LinearSpec::default).click_through = Some(url.to_string());
        self
    }

    pub fn with_companion(mut self, companion: CompanionSpec) -> Self {
        self.companions.push(companion);
        self
    }

    pub fn without_data(mut self) -> Self {
        self.has_data = false;
        self
    }
}

/// A scripted ad recording its beacons
pub struct ScriptedAd {
    has_data: bool,
    linear: Option<Rc<ScriptedLinear>>,
    companions: Vec<Rc<ScriptedCompanion>>,
    next: Option<AdHandle>,
}

impl ScriptedAd {
    pub fn new(spec: &AdSpec, log: &BeaconLog, next: Option<AdHandle>) -> Self {
        Self {
            has_data: spec.has_data,
            linear: spec.linear.as_ref().map(|linear| {
                Rc::new(ScriptedLinear {
                    ad_id: spec.id.clone(),
                    spec: linear.clone(),
                    log: log.clone(),
                })
            }),
            companions: spec
                .companions
                .iter()
                .map(|companion| {
                    Rc::new(ScriptedCompanion {
                        ad_id: spec.id.clone(),
                        spec: companion.clone(),
                        log: log.clone(),
                    })
                })
                .collect(),
            next,
        }
    }

    /// Link `specs` into a chain, returning its first ad
    pub fn chain(specs: &[AdSpec], log: &BeaconLog) -> Option<AdHandle> {
        specs.iter().rev().fold(None, |next, spec| {
            Some(Rc::new(ScriptedAd::new(spec, log, next)) as AdHandle)
        })
    }
}

impl VastAd for ScriptedAd {
    fn has_data(&self) -> bool {
        self.has_data
    }

    fn next_ad(&self) -> Option<AdHandle> {
        self.next.clone()
    }

    fn companions(&self) -> Vec<Rc<dyn Companion>> {
        self.companions
            .iter()
            .map(|c| c.clone() as Rc<dyn Companion>)
            .collect()
    }

    fn linear(&self) -> Option<Rc<dyn LinearCreative>> {
        self.linear.clone().map(|l| l as Rc<dyn LinearCreative>)
    }
}

/// Linear creative recording its beacons
pub struct ScriptedLinear {
    ad_id: String,
    spec: LinearSpec,
    log: BeaconLog,
}

impl LinearCreative for ScriptedLinear {
    fn best_media(&self, settings: &RequestSettings) -> Option<AdMedia> {
        self.spec.select(settings).map(|m| AdMedia {
            src: m.src.clone(),
            duration: m.duration,
        })
    }

    fn click_through(&self) -> Option<String> {
        self.spec.click_through.clone()
    }

    fn tracking_points(&self) -> Vec<TrackingPoint> {
        self.spec.tracking.clone()
    }

    fn track(&self, event: &TrackingEvent, current_time: Option<f64>, media_url: Option<&str>) {
        self.log.record(Beacon {
            ad_id: self.ad_id.clone(),
            creative: "linear",
            event: event.clone(),
            time: current_time,
            media_url: media_url.map(str::to_string),
        });
    }
}

/// Companion creative recording its beacons
pub struct ScriptedCompanion {
    ad_id: String,
    spec: CompanionSpec,
    log: BeaconLog,
}

impl Companion for ScriptedCompanion {
    fn html(&self) -> String {
        self.spec.html.clone()
    }

    fn zone_id(&self) -> Option<String> {
        self.spec.zone_id.clone()
    }

    fn width(&self) -> Option<u32> {
        self.spec.width
    }

    fn height(&self) -> Option<u32> {
        self.spec.height
    }

    fn track(&self, event: &TrackingEvent) {
        self.log.record(Beacon {
            ad_id: self.ad_id.clone(),
            creative: "companion",
            event: event.clone(),
            time: None,
            media_url: None,
        });
    }
}

// =============================================================================
// Scenarios
// =============================================================================

/// Content of a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSpec {
    pub src: String,
    pub duration: f64,
    /// Content is already playing when watched
    #[serde(default)]
    pub playing: bool,
    /// Seconds seekable when the content becomes playable again
    #[serde(default)]
    pub seekable_at_ready: Option<f64>,
    #[serde(default = "default_buffer_rate")]
    pub buffer_rate: f64,
}

/// Frame offered to media selection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoProperties {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub bitrate: Option<u32>,
}

/// An ad break of a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakSpec {
    pub position: BreakPosition,
    pub ads: Vec<AdSpec>,
}

/// Viewer or element action
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Viewer presses play
    Play,
    /// Viewer presses the skip button
    Skip,
    /// Viewer clicks the video
    Click,
    /// Viewer seeks
    Seek { to: f64 },
    /// Element reports a media error
    MediaError { code: u16 },
}

impl Action {
    pub fn apply<H: HostEnv>(&self, player: &mut AdPlayer<SimulatedVideo, H>) {
        debug!(action = ?self, "Applying action");
        match *self {
            Action::Skip => player.skip_current_ad(),
            Action::Play => {
                if let Some(video) = player.surface_mut() {
                    video.play();
                }
            }
            Action::Click => {
                if let Some(video) = player.surface_mut() {
                    video.click();
                }
            }
            Action::Seek { to } => {
                if let Some(video) = player.surface_mut() {
                    video.set_current_time(to);
                }
            }
            Action::MediaError { code } => {
                if let Some(video) = player.surface_mut() {
                    video.fail(code);
                }
            }
        }
        player.pump();
    }
}

/// Action at a simulation time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduledAction {
    /// Seconds since the simulation started
    pub at: f64,
    #[serde(flatten)]
    pub action: Action,
}

/// A complete playback scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub content: ContentSpec,
    #[serde(default)]
    pub video: Option<VideoProperties>,
    #[serde(default)]
    pub config: AdPlayerConfig,
    #[serde(default = "default_true")]
    pub ads_enabled: bool,
    /// Seconds between a load and `canplay`
    #[serde(default = "default_load_latency")]
    pub load_latency: f64,
    #[serde(default)]
    pub breaks: Vec<BreakSpec>,
    #[serde(default)]
    pub actions: Vec<ScheduledAction>,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        let scenario: Self = serde_json::from_str(json)?;
        scenario.config.validate()?;
        Ok(scenario)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Simulated element holding the content and every ad media file
    pub fn video(&self) -> SimulatedVideo {
        let content = SimMedia {
            seekable_at_ready: self.content.seekable_at_ready,
            buffer_rate: self.content.buffer_rate,
            ..SimMedia::new(self.content.duration)
        };

        let mut video = SimulatedVideo::new()
            .with_load_latency(self.load_latency)
            .with_media(&self.content.src, content);
        for media in self
            .breaks
            .iter()
            .flat_map(|b| &b.ads)
            .filter_map(|ad| ad.linear.as_ref())
            .flat_map(|linear| &linear.media)
        {
            video.add_media(&media.src, media.sim_media());
        }

        video.preload(&self.content.src);
        if self.content.playing {
            video = video.playing();
        }
        video
    }

    /// Configure `player`, watch the scenario's element and schedule its breaks
    pub fn install<H: HostEnv>(
        &self,
        player: &mut AdPlayer<SimulatedVideo, H>,
        log: &BeaconLog,
    ) -> Result<()> {
        if let Some(video) = self.video {
            player.set_video_properties(video.width, video.height, video.bitrate);
        }
        player.set_ads_enabled(self.ads_enabled);

        let is_fraction = |b: &&BreakSpec| matches!(b.position, BreakPosition::At(Offset::Fraction(_)));

        // Pre-rolls must be known before an already playing element is watched
        for spec in self.breaks.iter().filter(|b| !is_fraction(b)) {
            if let Some(ad) = ScriptedAd::chain(&spec.ads, log) {
                player.add_break(spec.position, ad)?;
            }
        }
        player.watch_player(self.video())?;
        for spec in self.breaks.iter().filter(is_fraction) {
            if let Some(ad) = ScriptedAd::chain(&spec.ads, log) {
                player.add_break(spec.position, ad)?;
            }
        }
        Ok(())
    }

    /// Latest time any action happens
    pub fn last_action_at(&self) -> f64 {
        self.actions.iter().map(|a| a.at).fold(0.0, f64::max)
    }
}
