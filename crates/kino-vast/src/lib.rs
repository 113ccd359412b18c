//! Kino VAST - Ad insertion for Kino video players
//!
//! This crate interleaves already-parsed VAST ads with a host video
//! element's content:
//! - Pre-roll, mid-roll and post-roll insertion
//! - Sequencing through the ads of a break
//! - Tracking beacons fired once at their playback offsets
//! - Click-through and media error handling
//! - Restoring content at its saved position, waiting for it to buffer
//! - Companion banner dispatch to a caller supplied renderer
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Kino VAST                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │   Insertion  │  │   Tracking   │  │  Companion   │           │
//! │  │   Scheduler  │  │    Queue     │  │  Dispatcher  │           │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘           │
//! │         │                 │                 │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │     Ad      │                              │
//! │                    │   Player    │                              │
//! │                    └──────┬──────┘                              │
//! │                           │                                     │
//! │  ┌──────────────┐  ┌──────┴──────┐  ┌──────────────┐            │
//! │  │   Playback   │  │    Media    │  │   Host env   │            │
//! │  │   Snapshot   │  │   Surface   │  │   (timers)   │            │
//! │  └──────────────┘  └─────────────┘  └──────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod vast;
pub mod surface;
pub mod tracking;
pub mod schedule;
pub mod snapshot;
pub mod companion;
pub mod player;
pub mod sim;
#[cfg(feature = "driver")]
pub mod driver;

pub use error::{Error, Result};
pub use types::*;
pub use config::AdPlayerConfig;
pub use vast::{AdHandle, Companion, LinearCreative, TrackingEvent, TrackingPoint, VastAd};
pub use surface::{HostEnv, MediaSurface};
pub use tracking::TrackingQueue;
pub use schedule::{AdBreak, BreakSchedule, Insertion, WatchSession};
pub use snapshot::PlayerStateSnapshot;
pub use companion::{CompanionDispatcher, CompanionRenderer};
pub use player::{AdEndedCallback, AdPlayer, AdStartedCallback, ElementCallback};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library initialization
pub fn init() {
    tracing::info!(version = VERSION, "Kino VAST initialized");
}
