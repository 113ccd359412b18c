//! Tokio driver
//!
//! Runs an [`AdPlayer`] inside a tokio runtime. Element events, timer
//! expiries and caller commands arrive over channels and are handled one at
//! a time on the task awaiting [`run`].

use crate::{
    player::AdPlayer,
    surface::{HostEnv, MediaSurface},
    types::{MediaEventKind, TimerId, TimerReason},
};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use url::Url;

/// Work delivered to a running player
pub enum DriverMessage<S: MediaSurface, H: HostEnv> {
    /// An element event
    Media(MediaEventKind),
    /// A timer delivered by a host that does not use [`TokioHost`]
    Timer(TimerId, TimerReason),
    /// Run a closure against the player
    Command(Box<dyn FnOnce(&mut AdPlayer<S, H>) + Send>),
    /// Stop the driver loop
    Shutdown,
}

impl<S: MediaSurface, H: HostEnv> DriverMessage<S, H> {
    pub fn command(f: impl FnOnce(&mut AdPlayer<S, H>) + Send + 'static) -> Self {
        DriverMessage::Command(Box::new(f))
    }
}

/// Opens click-through pages
pub type UrlOpener = Box<dyn FnMut(&Url)>;

/// Host whose timers are tokio sleeps
///
/// Must be used from within a tokio runtime.
pub struct TokioHost {
    timers_tx: mpsc::UnboundedSender<(TimerId, TimerReason)>,
    tasks: HashMap<TimerId, JoinHandle<()>>,
    next_id: u32,
    time_scale: f64,
    opener: Option<UrlOpener>,
    opened: Vec<Url>,
}

impl TokioHost {
    /// Create a host and the receiver its timers report to
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(TimerId, TimerReason)>) {
        let (timers_tx, timers_rx) = mpsc::unbounded_channel();
        let host = Self {
            timers_tx,
            tasks: HashMap::new(),
            next_id: 0,
            time_scale: 1.0,
            opener: None,
            opened: Vec::new(),
        };
        (host, timers_rx)
    }

    /// Run timers `scale` times faster than requested
    pub fn with_time_scale(mut self, scale: f64) -> Self {
        if scale > 0.0 {
            self.time_scale = scale;
        }
        self
    }

    pub fn set_url_opener(&mut self, opener: Option<UrlOpener>) {
        self.opener = opener;
    }

    /// URLs opened by click-throughs
    pub fn opened_urls(&self) -> &[Url] {
        &self.opened
    }

    /// Timers started and not yet fired or cleared
    pub fn active_timers(&mut self) -> usize {
        self.purge_finished();
        self.tasks.len()
    }

    fn purge_finished(&mut self) {
        self.tasks.retain(|_, task| !task.is_finished());
    }
}

impl HostEnv for TokioHost {
    fn start_timer(&mut self, delay: Duration, reason: TimerReason) -> TimerId {
        self.purge_finished();
        self.next_id = self.next_id.wrapping_add(1);
        let id = TimerId(self.next_id);
        let delay = delay.div_f64(self.time_scale);
        let tx = self.timers_tx.clone();

        debug!(id = id.0, ?reason, ?delay, "Starting timer");
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the driver stopped
            let _ = tx.send((id, reason));
        });
        self.tasks.insert(id, task);
        id
    }

    fn clear_timer(&mut self, id: TimerId) {
        if let Some(task) = self.tasks.remove(&id) {
            task.abort();
        }
    }

    fn open_url(&mut self, url: &Url) {
        info!(url = %url, "Opening click-through");
        self.opened.push(url.clone());
        if let Some(opener) = self.opener.as_mut() {
            opener(url);
        }
    }
}

impl Drop for TokioHost {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

/// Drive `player` until a [`DriverMessage::Shutdown`] arrives or every sender is gone
///
/// Events queued by the surface are pumped after each message.
pub async fn run<S: MediaSurface, H: HostEnv>(
    player: &mut AdPlayer<S, H>,
    mut messages: mpsc::UnboundedReceiver<DriverMessage<S, H>>,
    mut timers: mpsc::UnboundedReceiver<(TimerId, TimerReason)>,
) {
    info!("Ad player driver started");

    loop {
        tokio::select! {
            message = messages.recv() => match message {
                Some(DriverMessage::Media(kind)) => player.handle_event(kind),
                Some(DriverMessage::Timer(id, reason)) => player.handle_timer(id, reason),
                Some(DriverMessage::Command(command)) => command(player),
                Some(DriverMessage::Shutdown) | None => break,
            },
            Some((id, reason)) = timers.recv() => player.handle_timer(id, reason),
        }
        player.pump();
    }

    info!(phase = %player.phase(), "Ad player driver stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{AdSpec, BeaconLog, MediaSpec, ScriptedAd, SimMedia, SimulatedVideo};
    use crate::types::{AdPhase, BreakPosition};
    use crate::vast::TrackingEvent;

    type SimPlayer = AdPlayer<SimulatedVideo, TokioHost>;

    fn advance(dt: f64) -> DriverMessage<SimulatedVideo, TokioHost> {
        DriverMessage::command(move |player: &mut SimPlayer| {
            if let Some(video) = player.surface_mut() {
                video.advance(dt);
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_reports_back() {
        let (mut host, mut timers) = TokioHost::new();
        let id = host.start_timer(Duration::from_millis(200), TimerReason::ResumePoll);

        assert_eq!(timers.recv().await, Some((id, TimerReason::ResumePoll)));
        assert_eq!(host.active_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleared_timer_never_fires() {
        let (mut host, mut timers) = TokioHost::new();
        let id = host.start_timer(Duration::from_millis(200), TimerReason::AdLoadTimeout);
        host.clear_timer(id);

        let waited = tokio::time::timeout(Duration::from_secs(1), timers.recv()).await;
        assert!(waited.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_scale() {
        let (host, mut timers) = TokioHost::new();
        let mut host = host.with_time_scale(10.0);
        let start = tokio::time::Instant::now();
        host.start_timer(Duration::from_secs(8), TimerReason::AdLoadTimeout);

        timers.recv().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_plays_preroll() {
        let (host, timers) = TokioHost::new();
        let mut player: SimPlayer = AdPlayer::new(host);
        let log = BeaconLog::new();
        let ad = ScriptedAd::chain(
            &[AdSpec::new("pre").with_media(MediaSpec::new("pre.mp4", 1.0))],
            &log,
        )
        .unwrap();
        player.add_break(BreakPosition::Start, ad).unwrap();
        let video = SimulatedVideo::with_content("content.mp4", 30.0)
            .with_media("pre.mp4", SimMedia::new(1.0));
        player.watch_player(video).unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(DriverMessage::command(|player: &mut SimPlayer| {
            if let Some(video) = player.surface_mut() {
                video.play();
            }
        }))
        .unwrap();
        for _ in 0..20 {
            tx.send(advance(0.1)).unwrap();
        }
        tx.send(DriverMessage::Shutdown).unwrap();

        run(&mut player, rx, timers).await;

        assert_eq!(
            log.events_for("pre"),
            vec![TrackingEvent::CreativeView, TrackingEvent::Start, TrackingEvent::Complete]
        );
        assert_eq!(player.phase(), AdPhase::Idle);
        assert!(!player.surface().unwrap().paused());
        assert_eq!(player.host_mut().active_timers(), 0);
    }

    #[tokio::test]
    async fn test_run_stops_when_senders_drop() {
        let (host, timers) = TokioHost::new();
        let mut player: SimPlayer = AdPlayer::new(host);
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(DriverMessage::Media(MediaEventKind::Play)).unwrap();
        drop(tx);

        run(&mut player, rx, timers).await;
        assert!(!player.is_watching());
    }
}
