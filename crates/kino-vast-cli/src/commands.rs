//! CLI command implementations

use crate::output::{self, BreakRow, SimulationReport};
use anyhow::Context;
use kino_vast::driver::{self, DriverMessage, TokioHost};
use kino_vast::sim::{BeaconLog, ManualHost, Scenario, ScheduledAction, SimulatedVideo};
use kino_vast::{AdPhase, AdPlayer, MediaEventKind, MediaSurface, RequestSettings};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

type SimPlayer = AdPlayer<SimulatedVideo, TokioHost>;
type Messages = mpsc::UnboundedSender<DriverMessage<SimulatedVideo, TokioHost>>;

/// Settings of the `simulate` command
pub struct SimulateOptions {
    pub speed: f64,
    pub tick_ms: u64,
    pub limit: Option<f64>,
}

fn load(path: &Path) -> anyhow::Result<Scenario> {
    Scenario::from_path(path).with_context(|| format!("Invalid scenario: {}", path.display()))
}

/// Play a scenario on the tokio driver
pub async fn simulate(path: &Path, options: SimulateOptions, format: &str) -> anyhow::Result<()> {
    anyhow::ensure!(options.speed > 0.0, "Speed must be positive");
    let scenario = load(path)?;

    let log = BeaconLog::new();
    let (host, timers) = TokioHost::new();
    let mut player: SimPlayer =
        AdPlayer::with_config(scenario.config.clone(), host.with_time_scale(options.speed));
    scenario
        .install(&mut player, &log)
        .context("Scenario could not be installed")?;

    let clock = Clock {
        tick: options.tick_ms.max(1) as f64 / 1000.0,
        speed: options.speed,
        limit: options.limit.unwrap_or_else(|| time_limit(&scenario)),
        settle_after: scenario.last_action_at(),
    };
    info!(scenario = %path.display(), speed = clock.speed, limit = clock.limit, "Simulating");

    let (tx, rx) = mpsc::unbounded_channel();
    let ticker = tokio::spawn(clock.run(tx, scenario.actions.clone()));
    driver::run(&mut player, rx, timers).await;
    ticker.abort();

    let report = SimulationReport::new(&player, &log);
    output::print_simulation(&report, format)
}

/// Validate a scenario and list its ad breaks
pub fn check(path: &Path, format: &str) -> anyhow::Result<()> {
    let scenario = load(path)?;

    let mut player = AdPlayer::with_config(scenario.config.clone(), ManualHost::new());
    scenario
        .install(&mut player, &BeaconLog::new())
        .context("Scenario could not be installed")?;
    debug!(midrolls = player.schedule().len(), "Scenario installed");

    let settings = RequestSettings {
        width: scenario.video.map(|v| v.width),
        height: scenario.video.map(|v| v.height),
        bitrate: scenario.video.and_then(|v| v.bitrate),
        ..Default::default()
    };
    let rows: Vec<BreakRow> = scenario
        .breaks
        .iter()
        .map(|spec| BreakRow::new(spec, scenario.content.duration, &settings))
        .collect();

    output::print_schedule(&scenario, &rows, format)
}

/// Simulated clock feeding the driver
struct Clock {
    /// Simulated seconds per tick
    tick: f64,
    speed: f64,
    /// Simulated seconds before giving up
    limit: f64,
    /// No completion check before the last scripted action
    settle_after: f64,
}

impl Clock {
    async fn run(self, tx: Messages, mut actions: Vec<ScheduledAction>) {
        actions.sort_by(|a, b| a.at.total_cmp(&b.at));
        let mut actions = actions.into_iter().peekable();
        let mut interval = tokio::time::interval(Duration::from_secs_f64(self.tick / self.speed));
        let mut elapsed = 0.0;

        while elapsed < self.limit {
            interval.tick().await;

            while let Some(scheduled) = actions.next_if(|a| a.at <= elapsed) {
                let action = scheduled.action;
                let message = DriverMessage::command(move |player: &mut SimPlayer| action.apply(player));
                if tx.send(message).is_err() {
                    return;
                }
            }

            let tick = self.tick;
            let advance = DriverMessage::command(move |player: &mut SimPlayer| {
                if let Some(video) = player.surface_mut() {
                    video.advance(tick);
                }
            });
            if tx.send(advance).is_err() {
                return;
            }
            elapsed += self.tick;

            if elapsed >= self.settle_after && actions.peek().is_none() {
                let done = tx.clone();
                let check = DriverMessage::command(move |player: &mut SimPlayer| {
                    if finished(player) {
                        debug!("Content finished");
                        let _ = done.send(DriverMessage::Shutdown);
                    }
                });
                if tx.send(check).is_err() {
                    return;
                }
            }
        }

        warn!(limit = self.limit, "Simulation time limit reached");
        let _ = tx.send(DriverMessage::Shutdown);
    }
}

/// Content played to its end with no break running
fn finished(player: &SimPlayer) -> bool {
    player.phase() == AdPhase::Idle
        && player.surface().is_some_and(|video| {
            video.ended() || video.dispatched().contains(&MediaEventKind::Ended)
        })
}

/// Generous bound on the simulated time a scenario needs
fn time_limit(scenario: &Scenario) -> f64 {
    let load_wait = scenario
        .config
        .ad_load_timeout()
        .map_or(10.0, |timeout| timeout.as_secs_f64());
    let ads: f64 = scenario
        .breaks
        .iter()
        .flat_map(|b| &b.ads)
        .map(|ad| {
            let longest = ad
                .linear
                .iter()
                .flat_map(|linear| &linear.media)
                .map(|media| media.duration)
                .fold(0.0, f64::max);
            longest + load_wait
        })
        .sum();
    scenario.content.duration.max(scenario.last_action_at()) + ads + 30.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEMO: &str = include_str!("../scenarios/demo.json");

    #[test]
    fn test_demo_scenario_is_valid() {
        let scenario = Scenario::from_json(DEMO).unwrap();
        assert_eq!(scenario.breaks.len(), 3);
        assert_eq!(scenario.config.ad_load_timeout_ms, Some(4_000));
    }

    #[test]
    fn test_time_limit_covers_ads() {
        let scenario = Scenario::from_json(DEMO).unwrap();
        // 60s content, four ads with 4s load waits, 30s slack
        assert_eq!(time_limit(&scenario), 60.0 + (6.0 + 4.0 + 5.0 + 3.0) + 4.0 * 4.0 + 30.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulation_finishes() {
        let scenario = Scenario::from_json(DEMO).unwrap();
        let log = BeaconLog::new();
        let (host, timers) = TokioHost::new();
        let mut player: SimPlayer = AdPlayer::with_config(scenario.config.clone(), host);
        scenario.install(&mut player, &log).unwrap();

        let clock = Clock {
            tick: 0.05,
            speed: 1.0,
            limit: time_limit(&scenario),
            settle_after: scenario.last_action_at(),
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let ticker = tokio::spawn(clock.run(tx, scenario.actions.clone()));
        driver::run(&mut player, rx, timers).await;
        ticker.abort();

        assert!(finished(&player));
        assert_eq!(log.count("midroll", &kino_vast::TrackingEvent::Start), 1);
        assert_eq!(log.count("postroll", &kino_vast::TrackingEvent::Complete), 1);
        assert_eq!(log.count("preroll-2", &kino_vast::TrackingEvent::Start), 0);
        assert_eq!(player.host().opened_urls().len(), 1);
    }
}
