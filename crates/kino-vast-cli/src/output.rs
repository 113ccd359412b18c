//! Output formatting for CLI

use kino_vast::sim::{Beacon, BeaconLog, BreakSpec, Scenario, SimulatedVideo};
use kino_vast::{AdPlayer, BreakPosition, HostEnv, MediaSurface, RequestSettings};
use serde::Serialize;

/// Output format options
pub enum OutputFormat {
    Text,
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Text,
        }
    }
}

/// One ad of a listed break
#[derive(Debug, Serialize)]
pub struct AdRow {
    pub id: String,
    pub media: Option<String>,
    pub duration: Option<f64>,
    pub tracking_points: usize,
    pub companions: usize,
    pub has_data: bool,
}

/// A scenario break resolved against the content
#[derive(Debug, Serialize)]
pub struct BreakRow {
    pub position: String,
    /// Content time in seconds, `None` if unresolvable
    pub at: Option<f64>,
    pub ads: Vec<AdRow>,
}

impl BreakRow {
    pub fn new(spec: &BreakSpec, content_duration: f64, settings: &RequestSettings) -> Self {
        let at = match spec.position {
            BreakPosition::Start => Some(0.0),
            BreakPosition::End => Some(content_duration),
            BreakPosition::At(offset) => offset.resolve(Some(content_duration)),
        };
        let ads = spec
            .ads
            .iter()
            .map(|ad| {
                let media = ad.linear.as_ref().and_then(|linear| linear.select(settings));
                AdRow {
                    id: ad.id.clone(),
                    media: media.map(|m| m.src.clone()),
                    duration: media.map(|m| m.duration),
                    tracking_points: ad.linear.as_ref().map_or(0, |l| l.tracking.len()),
                    companions: ad.companions.len(),
                    has_data: ad.has_data,
                }
            })
            .collect();

        Self {
            position: spec.position.to_string(),
            at,
            ads,
        }
    }
}

/// Outcome of a simulation
#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub session: Option<String>,
    pub phase: String,
    pub content_time: Option<f64>,
    pub beacons: Vec<Beacon>,
}

impl SimulationReport {
    pub fn new<H: HostEnv>(player: &AdPlayer<SimulatedVideo, H>, log: &BeaconLog) -> Self {
        Self {
            session: player.session().map(|s| s.id.to_string()),
            phase: player.phase().to_string(),
            content_time: player.surface().map(|video| video.current_time()),
            beacons: log.beacons(),
        }
    }
}

pub fn print_schedule(scenario: &Scenario, rows: &[BreakRow], format: &str) -> anyhow::Result<()> {
    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(rows)?),
        OutputFormat::Text => {
            println!("Content: {} ({:.1}s)", scenario.content.src, scenario.content.duration);
            println!("Ads enabled: {}", scenario.ads_enabled);
            println!("\nBreaks:");
            for row in rows {
                let at = row
                    .at
                    .map(|at| format!("{:.1}s", at))
                    .unwrap_or_else(|| "-".to_string());
                println!("  {} @ {}", row.position, at);
                for ad in &row.ads {
                    if !ad.has_data {
                        println!("    - {} (no data)", ad.id);
                        continue;
                    }
                    match (&ad.media, ad.duration) {
                        (Some(media), Some(duration)) => println!(
                            "    - {} {} ({:.1}s, {} tracking, {} companions)",
                            ad.id, media, duration, ad.tracking_points, ad.companions
                        ),
                        _ => println!("    - {} (companions only: {})", ad.id, ad.companions),
                    }
                }
            }
            println!("\nActions: {}", scenario.actions.len());
        }
    }
    Ok(())
}

pub fn print_simulation(report: &SimulationReport, format: &str) -> anyhow::Result<()> {
    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            println!("\nSimulation:");
            if let Some(session) = &report.session {
                println!("  Session: {}", session);
            }
            println!("  Phase: {}", report.phase);
            if let Some(time) = report.content_time {
                println!("  Content time: {:.2}s", time);
            }

            println!("\nBeacons ({}):", report.beacons.len());
            for beacon in &report.beacons {
                let time = beacon
                    .time
                    .map(|t| format!("{:6.2}s", t))
                    .unwrap_or_else(|| "      -".to_string());
                println!(
                    "  {} {:<12} {:<9} {:<14} {}",
                    time,
                    beacon.ad_id,
                    beacon.creative,
                    beacon.event.as_str(),
                    beacon.media_url.as_deref().unwrap_or("")
                );
            }
        }
    }
    Ok(())
}
