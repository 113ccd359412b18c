//! Core types for Kino VAST

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a watch session (one per watched element)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Playback offset, either absolute or relative to the media duration
///
/// Parsed once from the VAST notation (`HH:MM:SS[.mmm]`, plain seconds, or
/// `NN%`) and compared in its typed form afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Offset {
    /// Seconds from the start of the media
    Absolute(f64),
    /// Fraction of the media duration, in `0.0..=1.0`
    Fraction(f64),
}

impl Offset {
    /// Resolve to absolute seconds. Fractions need a known, non-zero duration.
    pub fn resolve(&self, duration: Option<f64>) -> Option<f64> {
        match *self {
            Offset::Absolute(secs) => Some(secs),
            Offset::Fraction(fraction) => duration
                .filter(|d| d.is_finite() && *d > 0.0)
                .map(|d| fraction * d),
        }
    }

    /// Whether playback at `time` of a media lasting `duration` has reached this offset
    pub fn is_reached(&self, time: f64, duration: Option<f64>) -> bool {
        self.resolve(duration).is_some_and(|at| time >= at)
    }
}

/// Parse a VAST timecode (`HH:MM:SS` or `HH:MM:SS.mmm`) or plain seconds
pub fn parse_timecode(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let mut total = 0.0;
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() > 3 {
        return None;
    }
    for part in &parts {
        let value: f64 = part.parse().ok()?;
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        total = total * 60.0 + value;
    }
    Some(total)
}

impl FromStr for Offset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Some(percent) = trimmed.strip_suffix('%') {
            let value: f64 = percent
                .trim()
                .parse()
                .map_err(|_| Error::InvalidOffset(s.to_string()))?;
            if !(0.0..=100.0).contains(&value) {
                return Err(Error::InvalidOffset(s.to_string()));
            }
            return Ok(Offset::Fraction(value / 100.0));
        }

        parse_timecode(trimmed)
            .map(Offset::Absolute)
            .ok_or_else(|| Error::InvalidOffset(s.to_string()))
    }
}

impl TryFrom<String> for Offset {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Offset> for String {
    fn from(offset: Offset) -> Self {
        offset.to_string()
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Offset::Absolute(secs) => {
                let total_ms = (secs * 1000.0).round() as u64;
                let (whole, millis) = (total_ms / 1000, total_ms % 1000);
                write!(f, "{:02}:{:02}:{:02}", whole / 3600, (whole / 60) % 60, whole % 60)?;
                if millis > 0 {
                    write!(f, ".{:03}", millis)?;
                }
                Ok(())
            }
            Offset::Fraction(fraction) => write!(f, "{}%", fraction * 100.0),
        }
    }
}

/// Where an ad break is scheduled in the content
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BreakPosition {
    /// Pre-roll
    Start,
    /// Post-roll
    End,
    /// Mid-roll at an offset into the content
    At(Offset),
}

impl FromStr for BreakPosition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(BreakPosition::Start),
            "end" => Ok(BreakPosition::End),
            _ => s
                .parse()
                .map(BreakPosition::At)
                .map_err(|_| Error::InvalidPosition(s.to_string())),
        }
    }
}

impl TryFrom<String> for BreakPosition {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<BreakPosition> for String {
    fn from(position: BreakPosition) -> Self {
        position.to_string()
    }
}

impl fmt::Display for BreakPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakPosition::Start => write!(f, "start"),
            BreakPosition::End => write!(f, "end"),
            BreakPosition::At(offset) => write!(f, "{}", offset),
        }
    }
}

/// Insertion point type offered to ad selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InsertionPoint {
    #[serde(rename = "start")]
    Start,
    #[serde(rename = "position")]
    Position,
    #[serde(rename = "end")]
    End,
    /// Content was already playing when the element was watched
    #[serde(rename = "onBeforeContent")]
    BeforeContent,
}

impl fmt::Display for InsertionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertionPoint::Start => write!(f, "start"),
            InsertionPoint::Position => write!(f, "position"),
            InsertionPoint::End => write!(f, "end"),
            InsertionPoint::BeforeContent => write!(f, "onBeforeContent"),
        }
    }
}

/// Playback environment offered to ad media selection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestSettings {
    /// Width of the video frame
    pub width: Option<u32>,
    /// Height of the video frame
    pub height: Option<u32>,
    /// Maximum ad bitrate in Kbps
    pub bitrate: Option<u32>,
    /// Insertion point of the running break
    pub insertion_point: Option<InsertionPoint>,
    /// Content position when the running break began
    pub playback_position: Option<f64>,
}

/// Media file selected for a linear creative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdMedia {
    /// Media URL
    pub src: String,
    /// Duration in seconds
    pub duration: f64,
}

/// Error reported by the media element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaErrorCode {
    Aborted,
    Network,
    Decode,
    SrcNotSupported,
    Unknown(u16),
}

impl MediaErrorCode {
    /// Map an `HTMLMediaElement.error.code` value
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => MediaErrorCode::Aborted,
            2 => MediaErrorCode::Network,
            3 => MediaErrorCode::Decode,
            4 => MediaErrorCode::SrcNotSupported,
            other => MediaErrorCode::Unknown(other),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            MediaErrorCode::Aborted => 1,
            MediaErrorCode::Network => 2,
            MediaErrorCode::Decode => 3,
            MediaErrorCode::SrcNotSupported => 4,
            MediaErrorCode::Unknown(code) => *code,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            MediaErrorCode::Aborted => "MEDIA_ERR_ABORTED",
            MediaErrorCode::Network => "MEDIA_ERR_NETWORK",
            MediaErrorCode::Decode => "MEDIA_ERR_DECODE",
            MediaErrorCode::SrcNotSupported => "MEDIA_ERR_SRC_NOT_SUPPORTED",
            MediaErrorCode::Unknown(_) => "MEDIA_ERR_UNKNOWN",
        }
    }

    /// Human readable description for logs
    pub fn message(&self) -> &'static str {
        match self {
            MediaErrorCode::Aborted => "Ad playback aborted",
            MediaErrorCode::Network => {
                "A network error caused the video download to fail part-way"
            }
            MediaErrorCode::Decode => {
                "The video playback was aborted due to a corruption problem or because the video used unsupported features"
            }
            MediaErrorCode::SrcNotSupported => {
                "The video could not be loaded, either because the server or network failed or because the format is not supported"
            }
            MediaErrorCode::Unknown(_) => "An unknown error occurred",
        }
    }
}

impl fmt::Display for MediaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.code())
    }
}

/// Media element events the player listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaEventKind {
    Play,
    Pause,
    CanPlay,
    TimeUpdate,
    Ended,
    Error,
    /// Pointer activation (`click`, or `touchstart` on platforms that need it)
    Click,
}

impl MediaEventKind {
    pub const ALL: [MediaEventKind; 7] = [
        MediaEventKind::Play,
        MediaEventKind::Pause,
        MediaEventKind::CanPlay,
        MediaEventKind::TimeUpdate,
        MediaEventKind::Ended,
        MediaEventKind::Error,
        MediaEventKind::Click,
    ];

    /// DOM event name
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaEventKind::Play => "play",
            MediaEventKind::Pause => "pause",
            MediaEventKind::CanPlay => "canplay",
            MediaEventKind::TimeUpdate => "timeupdate",
            MediaEventKind::Ended => "ended",
            MediaEventKind::Error => "error",
            MediaEventKind::Click => "click",
        }
    }
}

impl fmt::Display for MediaEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a timer started through the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerId(pub u32);

/// Why a timer was started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerReason {
    /// Re-check whether the content can be seeked to its resume point
    ResumePoll,
    /// The active ad's media took too long to become playable
    AdLoadTimeout,
}

/// Ad playback phase of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdPhase {
    /// Content playing normally
    Idle,
    /// Element being taken over for a break
    TakingOver,
    /// One ad's media loaded or playing
    PlayingAd,
    /// Between two ads
    AdvancingAd,
    /// Handing the element back to content
    Releasing,
    /// Content restored, waiting to reach its resume point
    Resumed,
}

impl AdPhase {
    /// Whether content playback is live in this phase
    pub fn is_content(&self) -> bool {
        matches!(self, AdPhase::Idle | AdPhase::Resumed)
    }

    /// Check if transition to new phase is valid
    pub fn can_transition_to(&self, next: AdPhase) -> bool {
        use AdPhase::*;
        matches!(
            (self, next),
            (Idle, TakingOver)
                | (Resumed, TakingOver)
                | (Resumed, Idle)
                | (TakingOver, AdvancingAd)
                | (AdvancingAd, PlayingAd)
                | (AdvancingAd, Releasing)
                | (PlayingAd, AdvancingAd)
                | (Releasing, Idle)
                | (Releasing, Resumed)
        )
    }
}

impl fmt::Display for AdPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdPhase::Idle => write!(f, "idle"),
            AdPhase::TakingOver => write!(f, "taking_over"),
            AdPhase::PlayingAd => write!(f, "playing_ad"),
            AdPhase::AdvancingAd => write!(f, "advancing_ad"),
            AdPhase::Releasing => write!(f, "releasing"),
            AdPhase::Resumed => write!(f, "resumed"),
        }
    }
}
