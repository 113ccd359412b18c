//! Ad Player - takes over the watched element for ad breaks
//!
//! Coordinates:
//! - Insertion checks on content events (pre-roll, mid-roll, post-roll)
//! - Takeover and release of the element's listeners
//! - Sequencing through the ads of a break
//! - Tracking beacons, click-through and media errors
//! - Restoring content playback at its saved position

use crate::{
    companion::{CompanionDispatcher, CompanionRenderer},
    config::AdPlayerConfig,
    schedule::{BreakSchedule, Insertion, WatchSession},
    snapshot::{PlayerStateSnapshot, RestoreAction, ResumeStep},
    surface::{HostEnv, Listener, ListenerTable, MediaSurface},
    tracking::TrackingQueue,
    types::*,
    vast::{AdHandle, LinearCreative, TrackingEvent},
    Error, Result,
};
use std::rc::Rc;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Called with the ad duration whenever a video ad starts
pub type AdStartedCallback = Box<dyn FnMut(f64)>;

/// Called once the ads of a break are over
pub type AdEndedCallback = Box<dyn FnMut()>;

/// Called with the watched element on takeover and release
pub type ElementCallback<S> = Box<dyn FnMut(&mut S)>;

/// VAST ad player bound to at most one watched element
pub struct AdPlayer<S: MediaSurface, H: HostEnv> {
    /// Player configuration
    config: AdPlayerConfig,
    /// Timers and navigation
    host: H,
    /// Watched element
    player: Option<S>,
    /// Insertion flags of the watched element
    session: Option<WatchSession>,
    /// Scheduled breaks
    schedule: BreakSchedule,
    /// Bound element listeners
    listeners: ListenerTable,
    /// Playback environment offered to media selection
    request_settings: RequestSettings,
    /// Controller phase
    phase: AdPhase,
    ads_enabled: bool,
    /// True between an ad's first play and its completion
    ad_playing: bool,
    /// Ad being shown
    active_ad: Option<AdHandle>,
    /// Linear creative of the active ad
    active_linear: Option<Rc<dyn LinearCreative>>,
    /// Media selected for the active ad
    ad_video: Option<AdMedia>,
    /// First `canplay` of the active ad seen
    ad_ready: bool,
    /// Unsent tracking points of the active ad
    tracking: TrackingQueue,
    /// Content state saved at takeover
    snapshot: Option<PlayerStateSnapshot>,
    companions: CompanionDispatcher,
    on_ad_started: Option<AdStartedCallback>,
    on_ad_ended: Option<AdEndedCallback>,
    on_takeover: Option<ElementCallback<S>>,
    on_release: Option<ElementCallback<S>>,
    /// Pending resume poll
    resume_timer: Option<TimerId>,
    /// Pending ad load timeout
    load_timer: Option<TimerId>,
}

impl<S: MediaSurface, H: HostEnv> AdPlayer<S, H> {
    /// Create an ad player with the default configuration
    pub fn new(host: H) -> Self {
        Self::with_config(AdPlayerConfig::default(), host)
    }

    /// Create an ad player
    pub fn with_config(config: AdPlayerConfig, host: H) -> Self {
        Self {
            config,
            host,
            player: None,
            session: None,
            schedule: BreakSchedule::new(),
            listeners: ListenerTable::new(),
            request_settings: RequestSettings::default(),
            phase: AdPhase::Idle,
            ads_enabled: true,
            ad_playing: false,
            active_ad: None,
            active_linear: None,
            ad_video: None,
            ad_ready: false,
            tracking: TrackingQueue::new(),
            snapshot: None,
            companions: CompanionDispatcher::new(),
            on_ad_started: None,
            on_ad_ended: None,
            on_takeover: None,
            on_release: None,
            resume_timer: None,
            load_timer: None,
        }
    }

    // =========================================================================
    // Public API
    // =========================================================================

    /// Describe the video frame offered to ad media selection
    ///
    /// `bitrate` is the maximum ad bitrate in Kbps.
    pub fn set_video_properties(&mut self, width: u32, height: u32, bitrate: Option<u32>) {
        self.request_settings.width = Some(width);
        self.request_settings.height = Some(height);
        self.request_settings.bitrate = bitrate;
    }

    /// Enable or disable ads; disabled ads end any break at the next advance
    pub fn set_ads_enabled(&mut self, enabled: bool) {
        self.ads_enabled = enabled;
    }

    pub fn ads_enabled(&self) -> bool {
        self.ads_enabled
    }

    /// Set the callbacks driving a skip button
    pub fn set_skip_handler(
        &mut self,
        on_ad_started: Option<AdStartedCallback>,
        on_ad_ended: Option<AdEndedCallback>,
    ) {
        self.on_ad_started = on_ad_started;
        self.on_ad_ended = on_ad_ended;
    }

    /// Set or clear the companion banner renderer
    pub fn set_companion_handler(&mut self, renderer: Option<CompanionRenderer>) {
        self.companions.set_renderer(renderer);
    }

    /// Set the callbacks run when the element is taken over and released
    pub fn set_takeover_callbacks(
        &mut self,
        on_takeover: Option<ElementCallback<S>>,
        on_release: Option<ElementCallback<S>>,
    ) {
        self.on_takeover = on_takeover;
        self.on_release = on_release;
    }

    /// Watch `surface` and inject ads when appropriate
    ///
    /// Content already playing cannot get a real pre-roll, so the pre-roll ad
    /// is shown right away as an `onBeforeContent` break.
    #[instrument(skip_all)]
    pub fn watch_player(&mut self, surface: S) -> Result<()> {
        debug!("Told to watch player");

        if !surface.is_video() {
            let err = Error::NotAVideoElement;
            error!(error = %err, "Not watching player");
            return Err(err);
        }

        self.unwatch_player();
        let already_playing = !surface.paused();
        self.player = Some(surface);
        let session = WatchSession::new();
        info!(session_id = %session.id, "Watching player");
        self.session = Some(session);

        self.listen(MediaEventKind::Play, Listener::CheckPreroll);
        self.listen(MediaEventKind::TimeUpdate, Listener::CheckMidroll);
        self.listen(MediaEventKind::Ended, Listener::CheckPostroll);

        if already_playing {
            if let Some(session) = self.session.as_mut() {
                session.has_shown_preroll = true;
            }
            self.run_ads(Insertion::new(InsertionPoint::BeforeContent));
        }

        Ok(())
    }

    /// Stop watching the current element, handing it back
    ///
    /// An element taken over by a break gets its content source and controls back.
    pub fn unwatch_player(&mut self) -> Option<S> {
        self.cancel_timer(TimerReason::ResumePoll);
        self.cancel_timer(TimerReason::AdLoadTimeout);

        let mut surface = self.player.take()?;
        for kind in self.listeners.drain_kinds() {
            surface.unsubscribe(kind);
        }
        if let Some(snapshot) = self.snapshot.take() {
            debug!(?snapshot, phase = %self.phase, "Handing back content state");
            if !self.phase.is_content() {
                surface.pause();
            }
            match snapshot.restore_action(surface.current_src().as_deref()) {
                RestoreAction::Reload(src) | RestoreAction::Ended { reset_src: Some(src) } => {
                    surface.set_src(&src);
                    surface.load();
                }
                RestoreAction::Play | RestoreAction::Ended { reset_src: None } => {}
            }
            surface.set_controls(snapshot.controls);
        }
        if let Some(session) = self.session.take() {
            info!(session_id = %session.id, "Stopped watching player");
        }

        self.phase = AdPhase::Idle;
        self.ad_playing = false;
        self.active_ad = None;
        self.active_linear = None;
        self.ad_video = None;
        self.tracking.clear();
        Some(surface)
    }

    /// Schedule an ad break at a VAST position (`start`, `end`, `HH:MM:SS` or `NN%`)
    pub fn schedule_break(&mut self, position: &str, ad: AdHandle) -> Result<()> {
        let position = position.parse::<BreakPosition>().inspect_err(|err| {
            error!(error = %err, "Ad break dropped");
        })?;
        self.add_break(position, ad)
    }

    /// Schedule an ad break
    ///
    /// Percentage positions are resolved against the watched content's
    /// duration, which must be known.
    pub fn add_break(&mut self, position: BreakPosition, ad: AdHandle) -> Result<()> {
        let duration = self.player.as_ref().and_then(|p| p.duration());
        let inserted = self.schedule.insert(position, ad, duration)?;
        if let (Some(index), Some(session)) = (inserted, self.session.as_mut()) {
            session.break_inserted(index);
        }
        Ok(())
    }

    /// Skip the ad currently playing
    pub fn skip_current_ad(&mut self) {
        if self.phase.is_content() {
            debug!("No ad to skip");
            return;
        }
        info!("Skipping current ad");
        self.show_next_ad();
    }

    /// Dispatch an element event to the bound listeners
    pub fn handle_event(&mut self, kind: MediaEventKind) {
        if self.player.is_none() {
            return;
        }

        for listener in self.listeners.listeners_for(kind) {
            // An earlier listener may have unbound this one
            if self.listeners.is_bound(kind, listener) {
                self.invoke(listener);
            }
        }
    }

    /// Handle a timer started through the host
    pub fn handle_timer(&mut self, id: TimerId, reason: TimerReason) {
        match reason {
            TimerReason::ResumePoll if self.resume_timer == Some(id) => {
                self.resume_timer = None;
                if self.phase == AdPhase::Resumed {
                    self.try_resume_content();
                }
            }
            TimerReason::AdLoadTimeout if self.load_timer == Some(id) => {
                self.load_timer = None;
                self.on_ad_load_timeout();
            }
            _ => debug!(id = id.0, ?reason, "Ignoring stale timer"),
        }
    }

    /// Dispatch events queued by the surface itself
    pub fn pump(&mut self) {
        while let Some(kind) = self.player.as_mut().and_then(|p| p.take_pending_event()) {
            self.handle_event(kind);
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn phase(&self) -> AdPhase {
        self.phase
    }

    pub fn ad_playing(&self) -> bool {
        self.ad_playing
    }

    pub fn is_watching(&self) -> bool {
        self.player.is_some()
    }

    /// Media of the ad being shown
    pub fn active_media(&self) -> Option<&AdMedia> {
        self.ad_video.as_ref()
    }

    pub fn request_settings(&self) -> &RequestSettings {
        &self.request_settings
    }

    pub fn schedule(&self) -> &BreakSchedule {
        &self.schedule
    }

    pub fn session(&self) -> Option<&WatchSession> {
        self.session.as_ref()
    }

    /// Content state saved for the running or pending restore
    pub fn snapshot(&self) -> Option<&PlayerStateSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn pending_tracking_points(&self) -> usize {
        self.tracking.len()
    }

    pub fn config(&self) -> &AdPlayerConfig {
        &self.config
    }

    pub fn surface(&self) -> Option<&S> {
        self.player.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.player.as_mut()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    // =========================================================================
    // Listener plumbing
    // =========================================================================

    fn invoke(&mut self, listener: Listener) {
        match listener {
            Listener::CheckPreroll => self.check_for_preroll(),
            Listener::CheckMidroll => self.check_for_midroll(),
            Listener::CheckPostroll => self.check_for_postroll(),
            Listener::ContentCanPlay => self.on_video_can_play(),
            Listener::AdPlay => self.on_ad_play(),
            Listener::AdClick => self.on_ad_click(),
            Listener::AdClickToResume => self.on_ad_click_to_resume(),
            Listener::AdCanPlay => self.on_ad_can_play(),
            Listener::AdTick => self.on_ad_tick(),
            Listener::AdEnded => {
                self.show_next_ad();
            }
            Listener::AdError => self.on_ad_error(),
        }
    }

    fn listen(&mut self, kind: MediaEventKind, listener: Listener) {
        if self.listeners.listen(kind, listener) {
            if let Some(player) = self.player.as_mut() {
                player.subscribe(kind);
            }
        }
    }

    fn unlisten(&mut self, kind: MediaEventKind, listener: Listener) {
        if self.listeners.unlisten(kind, listener) {
            if let Some(player) = self.player.as_mut() {
                player.unsubscribe(kind);
            }
        }
    }

    fn set_phase(&mut self, next: AdPhase) {
        let current = self.phase;
        if current == next {
            return;
        }
        if !current.can_transition_to(next) {
            warn!(from = %current, to = %next, "Unexpected ad phase transition");
        }
        self.phase = next;
        info!(from = %current, to = %next, "Ad phase transition");
    }

    fn cancel_timer(&mut self, reason: TimerReason) {
        let slot = match reason {
            TimerReason::ResumePoll => &mut self.resume_timer,
            TimerReason::AdLoadTimeout => &mut self.load_timer,
        };
        if let Some(id) = slot.take() {
            self.host.clear_timer(id);
        }
    }

    // =========================================================================
    // Insertion checks (content mode)
    // =========================================================================

    fn check_for_preroll(&mut self) {
        if let Some(insertion) = self.session.as_mut().and_then(|s| s.check_preroll()) {
            self.run_ads(insertion);
        }
    }

    fn check_for_midroll(&mut self) {
        if self.ad_playing || self.phase != AdPhase::Idle || self.schedule.is_empty() {
            return;
        }
        let Some(time) = self.player.as_ref().map(|p| p.current_time()) else {
            return;
        };
        if let Some(insertion) = self
            .session
            .as_mut()
            .and_then(|s| s.check_midroll(&self.schedule, time))
        {
            self.run_ads(insertion);
        }
    }

    fn check_for_postroll(&mut self) {
        if let Some(insertion) = self.session.as_mut().and_then(|s| s.check_postroll()) {
            self.run_ads(insertion);
        }
    }

    // =========================================================================
    // Break sequencing
    // =========================================================================

    /// Interrupt content and show the ads of a break
    #[instrument(skip(self, insertion), fields(point = %insertion.point))]
    fn run_ads(&mut self, insertion: Insertion) {
        let Some(player) = self.player.as_mut() else {
            return;
        };
        info!(break_index = ?insertion.break_index, "Starting ad break");

        let position = player.current_time();
        player.pause();
        if !self.prepare_ad_playback() {
            return;
        }
        self.request_settings.insertion_point = Some(insertion.point);
        self.request_settings.playback_position = Some(position);

        self.active_ad = None;
        let first = insertion.ad.or_else(|| self.schedule.first_ad(insertion.point));
        self.set_phase(AdPhase::AdvancingAd);
        self.show_ad_from(first);
    }

    /// Save content state and take over the element
    ///
    /// Returns false when the element is already taken over.
    fn prepare_ad_playback(&mut self) -> bool {
        debug!("Told to create ad player");
        if !self.phase.is_content() {
            debug!(phase = %self.phase, "Player already taken over");
            return false;
        }
        self.cancel_timer(TimerReason::ResumePoll);
        let Some(player) = self.player.as_ref() else {
            return false;
        };

        match self.snapshot.as_mut() {
            Some(pending) => {
                // Content never got back to its position, keep the original state
                debug!(original_src = ?pending.original_src, "Content restore still pending");
                pending.is_buffering = false;
            }
            None => {
                let snapshot = PlayerStateSnapshot::capture(player);
                debug!(?snapshot, "Saved content state");
                self.snapshot = Some(snapshot);
            }
        }

        self.set_phase(AdPhase::TakingOver);
        self.takeover();
        self.ad_playing = false;
        true
    }

    /// Show the successor of the active ad
    ///
    /// Returns whether another ad is being played.
    fn show_next_ad(&mut self) -> bool {
        let next = self.active_ad.as_ref().and_then(|ad| ad.next_ad());
        self.show_ad_from(next)
    }

    fn show_ad_from(&mut self, candidate: Option<AdHandle>) -> bool {
        self.finish_active_ad();
        if self.phase == AdPhase::PlayingAd {
            self.set_phase(AdPhase::AdvancingAd);
        }

        let mut candidate = candidate;
        loop {
            let next = candidate.take().filter(|_| self.ads_enabled);
            let Some(ad) = next else {
                debug!(ads_enabled = self.ads_enabled, "No more ads");
                self.active_ad = None;
                if let Some(on_ad_ended) = self.on_ad_ended.as_mut() {
                    on_ad_ended();
                }
                self.resume_original_video();
                return false;
            };
            self.active_ad = Some(ad.clone());

            if !ad.has_data() {
                debug!("Skipping ad without data");
                candidate = ad.next_ad();
                continue;
            }

            debug!("Showing next ad");
            let linear = ad.linear();
            self.ad_video = linear
                .as_ref()
                .and_then(|l| l.best_media(&self.request_settings));
            if let Some(media) = &self.ad_video {
                debug!(src = %media.src, duration = media.duration, "Found linear");
            }

            for companion in ad.companions() {
                if let Err(err) = self.companions.show(companion.as_ref()) {
                    error!(error = %err, zone = ?companion.zone_id(), "Companion not displayed");
                }
            }

            match (linear, self.ad_video.clone()) {
                (Some(linear), Some(media)) => {
                    self.active_linear = Some(linear);
                    self.play_video_ad(media);
                    return true;
                }
                _ => {
                    warn!("Got ad without playable linear");
                    self.ad_video = None;
                    candidate = ad.next_ad();
                }
            }
        }
    }

    /// Report completion of the ad that was playing and forget it
    fn finish_active_ad(&mut self) {
        if self.ad_playing {
            if let (Some(linear), Some(media), Some(player)) =
                (&self.active_linear, &self.ad_video, &self.player)
            {
                linear.track(
                    &TrackingEvent::Complete,
                    Some(player.current_time()),
                    Some(&media.src),
                );
            }
        }
        self.ad_playing = false;
        self.ad_ready = false;
        self.active_linear = None;
        self.ad_video = None;
        self.tracking.clear();
        self.cancel_timer(TimerReason::AdLoadTimeout);
    }

    /// Load the active ad's media into the element
    fn play_video_ad(&mut self, media: AdMedia) {
        debug!(src = %media.src, "Playing ad");
        if let Some(linear) = &self.active_linear {
            self.tracking.load(linear.tracking_points());
        }
        if let Some(on_ad_started) = self.on_ad_started.as_mut() {
            on_ad_started(media.duration);
        }

        if let Some(player) = self.player.as_mut() {
            player.set_src(&media.src);
            player.load();
        }
        self.ad_video = Some(media);
        self.ad_ready = false;

        if let Some(timeout) = self.config.ad_load_timeout() {
            self.load_timer = Some(self.host.start_timer(timeout, TimerReason::AdLoadTimeout));
        }
        self.set_phase(AdPhase::PlayingAd);
    }

    // =========================================================================
    // Takeover and release
    // =========================================================================

    fn takeover(&mut self) {
        debug!("Take over player");
        if let Some(player) = self.player.as_mut() {
            player.set_controls(false);
        }

        self.listen(MediaEventKind::Play, Listener::AdPlay);
        self.listen(MediaEventKind::Click, Listener::AdClick);
        self.listen(MediaEventKind::CanPlay, Listener::AdCanPlay);
        self.listen(MediaEventKind::TimeUpdate, Listener::AdTick);
        self.listen(MediaEventKind::Ended, Listener::AdEnded);
        self.listen(MediaEventKind::Error, Listener::AdError);

        self.unlisten(MediaEventKind::CanPlay, Listener::ContentCanPlay);
        self.unlisten(MediaEventKind::Play, Listener::CheckPreroll);
        self.unlisten(MediaEventKind::TimeUpdate, Listener::CheckMidroll);
        self.unlisten(MediaEventKind::Ended, Listener::CheckPostroll);

        if let (Some(on_takeover), Some(player)) = (self.on_takeover.as_mut(), self.player.as_mut()) {
            on_takeover(player);
        }
    }

    fn release(&mut self, controls: bool) {
        debug!("Release player");
        if let Some(player) = self.player.as_mut() {
            player.set_controls(controls);
        }

        self.listen(MediaEventKind::CanPlay, Listener::ContentCanPlay);
        self.listen(MediaEventKind::Play, Listener::CheckPreroll);
        self.listen(MediaEventKind::TimeUpdate, Listener::CheckMidroll);
        self.listen(MediaEventKind::Ended, Listener::CheckPostroll);

        self.unlisten(MediaEventKind::Play, Listener::AdPlay);
        self.unlisten(MediaEventKind::Click, Listener::AdClick);
        self.unlisten(MediaEventKind::Click, Listener::AdClickToResume);
        self.unlisten(MediaEventKind::CanPlay, Listener::AdCanPlay);
        self.unlisten(MediaEventKind::TimeUpdate, Listener::AdTick);
        self.unlisten(MediaEventKind::Ended, Listener::AdEnded);
        self.unlisten(MediaEventKind::Error, Listener::AdError);

        if let (Some(on_release), Some(player)) = (self.on_release.as_mut(), self.player.as_mut()) {
            on_release(player);
        }
    }

    /// Hand the element back to content playback
    fn resume_original_video(&mut self) {
        self.set_phase(AdPhase::Releasing);
        self.ad_playing = false;
        self.finish_active_ad();

        let controls = self
            .snapshot
            .as_ref()
            .map(|s| s.controls)
            .unwrap_or(self.config.restore_controls);
        let (Some(snapshot), Some(player)) = (self.snapshot.as_ref(), self.player.as_mut()) else {
            self.release(controls);
            self.set_phase(AdPhase::Idle);
            return;
        };
        debug!(?snapshot, "Resuming watched player");

        match snapshot.restore_action(player.current_src().as_deref()) {
            RestoreAction::Play => {
                player.play();
                self.snapshot = None;
                self.release(controls);
                self.set_phase(AdPhase::Idle);
            }
            RestoreAction::Reload(src) => {
                player.set_src(&src);
                player.load();
                self.release(controls);
                self.set_phase(AdPhase::Resumed);
            }
            RestoreAction::Ended { reset_src } => {
                self.snapshot = None;
                self.release(controls);
                if let Some(player) = self.player.as_mut() {
                    player.set_autoplay(false);
                    if let Some(src) = reset_src {
                        player.set_src(&src);
                    }
                    // A new source suppresses the element's own `ended`
                    player.dispatch(MediaEventKind::Ended);
                }
                self.set_phase(AdPhase::Idle);
            }
        }
    }

    /// Content became playable again after a break
    fn on_video_can_play(&mut self) {
        if self.phase != AdPhase::Resumed {
            return;
        }
        self.try_resume_content();
    }

    /// Seek back to the saved position once it is seekable
    fn try_resume_content(&mut self) {
        let (Some(snapshot), Some(player)) = (self.snapshot.as_mut(), self.player.as_mut()) else {
            return;
        };

        match snapshot.resume_step(player.seekable_end()) {
            ResumeStep::Play => {
                player.play();
            }
            ResumeStep::SeekAndPlay(at) => {
                debug!(position = at, "Seeking back into content");
                player.set_current_time(at);
                player.play();
            }
            ResumeStep::Wait => {
                if !snapshot.is_buffering {
                    debug!(
                        resume_at = ?snapshot.time_to_resume,
                        seekable_end = ?player.seekable_end(),
                        "Waiting for content to buffer"
                    );
                    player.pause();
                    snapshot.is_buffering = true;
                }
                if self.resume_timer.is_none() {
                    let interval = self.config.buffer_poll_interval();
                    self.resume_timer = Some(self.host.start_timer(interval, TimerReason::ResumePoll));
                }
                return;
            }
        }

        self.snapshot = None;
        self.cancel_timer(TimerReason::ResumePoll);
        self.set_phase(AdPhase::Idle);
    }

    // =========================================================================
    // Ad mode listeners
    // =========================================================================

    fn on_ad_play(&mut self) {
        let (Some(linear), Some(media), Some(player)) =
            (self.active_linear.clone(), self.ad_video.clone(), self.player.as_ref())
        else {
            return;
        };

        if !self.ad_playing {
            debug!("Ad started playing");
            linear.track(&TrackingEvent::Start, Some(0.0), Some(&media.src));
        } else {
            debug!("Ad resumed");
            linear.track(&TrackingEvent::Resume, Some(player.current_time()), Some(&media.src));

            if !self.listeners.is_bound(MediaEventKind::Click, Listener::AdClick) {
                self.listen(MediaEventKind::Click, Listener::AdClick);
                self.unlisten(MediaEventKind::Click, Listener::AdClickToResume);
                if let Some(player) = self.player.as_mut() {
                    player.set_controls(false);
                }
            }
        }

        self.ad_playing = true;
    }

    fn on_ad_click(&mut self) {
        let Some(linear) = self.active_linear.clone() else {
            return;
        };

        linear.track(&TrackingEvent::Click, None, None);
        if let Some(raw) = linear.click_through() {
            match Url::parse(&raw) {
                Ok(url) => {
                    debug!(url = %url, "Ad click through");
                    self.host.open_url(&url);
                }
                Err(err) => {
                    let err = Error::from(err);
                    warn!(error = %err, url = %raw, "Click through ignored");
                }
            }
        }

        if let Some(player) = self.player.as_mut() {
            player.set_controls(true);
            player.pause();
        }

        // Platforms that stop delivering clicks once controls are shown
        // resume through the native controls instead
        if self.config.click_after_controls {
            self.listen(MediaEventKind::Click, Listener::AdClickToResume);
        }
        self.unlisten(MediaEventKind::Click, Listener::AdClick);
    }

    fn on_ad_click_to_resume(&mut self) {
        debug!("Click to resume");
        if let Some(player) = self.player.as_mut() {
            player.play();
        }
    }

    fn on_ad_can_play(&mut self) {
        if self.ad_ready {
            return;
        }
        let (Some(linear), Some(media)) = (self.active_linear.clone(), self.ad_video.clone()) else {
            return;
        };

        self.ad_ready = true;
        self.cancel_timer(TimerReason::AdLoadTimeout);
        linear.track(&TrackingEvent::CreativeView, None, Some(&media.src));

        if let Some(player) = self.player.as_mut() {
            player.play();
            player.set_current_time(0.0);
        }
    }

    /// Fire the tracking points reached by the ad's progress
    fn on_ad_tick(&mut self) {
        if !self.ad_playing {
            debug!("Ad video not playing yet");
            return;
        }
        let (Some(linear), Some(media), Some(player)) =
            (&self.active_linear, &self.ad_video, &self.player)
        else {
            return;
        };

        let time = player.current_time();
        let duration = Some(media.duration)
            .filter(|d| *d > 0.0)
            .or_else(|| player.duration());

        for point in self.tracking.take_due(time, duration) {
            debug!(event = %point.event, time, "Tracking point reached");
            linear.track(&point.event, Some(time), Some(&media.src));
        }
    }

    fn on_ad_error(&mut self) {
        let code = self.player.as_ref().and_then(|p| p.error());
        match code {
            Some(code) => {
                let err = Error::MediaPlayback(code);
                error!(code = err.error_code(), src = ?self.ad_video.as_ref().map(|m| &m.src), "{}", code.message());
            }
            None => error!("Ad playback error without media error"),
        }

        self.show_next_ad();
    }

    fn on_ad_load_timeout(&mut self) {
        if self.phase != AdPhase::PlayingAd || self.ad_ready {
            return;
        }
        let src = self
            .ad_video
            .as_ref()
            .map(|m| m.src.clone())
            .unwrap_or_default();
        let err = Error::AdLoadTimeout { src };
        warn!(error = %err, "Skipping stalled ad");

        self.show_next_ad();
    }
}
