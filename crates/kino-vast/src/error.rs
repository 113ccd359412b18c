//! Error types for Kino VAST

use crate::types::MediaErrorCode;
use thiserror::Error;

/// Result type alias for ad player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ad player error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Not watching player: element is not a video element")]
    NotAVideoElement,

    #[error("Fractional break position {percent}% given, but video does not have a duration")]
    UnresolvableBreakPosition { percent: f64 },

    #[error("Invalid break position: {0}")]
    InvalidPosition(String),

    #[error("Invalid tracking offset: {0}")]
    InvalidOffset(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Companion errors
    #[error("No way of displaying companion ad")]
    NoCompanionRenderer,

    #[error("Companion renderer refused companion for zone {zone:?}")]
    CompanionRejected { zone: Option<String> },

    // Ad playback errors
    #[error("Ad media error: {0}")]
    MediaPlayback(MediaErrorCode),

    #[error("Ad media did not become playable in time: {src}")]
    AdLoadTimeout { src: String },

    #[error("Invalid click-through URL: {0}")]
    InvalidClickThrough(#[from] url::ParseError),

    // Internal errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns true if the error is resolved by moving on to the next ad
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::NoCompanionRenderer
                | Error::CompanionRejected { .. }
                | Error::MediaPlayback(_)
                | Error::AdLoadTimeout { .. }
                | Error::InvalidClickThrough(_)
        )
    }

    /// Returns the error code for analytics
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::NotAVideoElement => "NOT_VIDEO",
            Error::UnresolvableBreakPosition { .. } => "UNRESOLVABLE_BREAK",
            Error::InvalidPosition(_) => "INVALID_POSITION",
            Error::InvalidOffset(_) => "INVALID_OFFSET",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::NoCompanionRenderer => "NO_COMPANION_RENDERER",
            Error::CompanionRejected { .. } => "COMPANION_REJECTED",
            Error::MediaPlayback(code) => code.error_code(),
            Error::AdLoadTimeout { .. } => "AD_LOAD_TIMEOUT",
            Error::InvalidClickThrough(_) => "INVALID_CLICK_THROUGH",
            Error::Io(_) => "IO",
            Error::Json(_) => "JSON",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_errors_are_recoverable() {
        let err = Error::MediaPlayback(MediaErrorCode::Network);
        assert!(err.is_recoverable());
        assert_eq!(err.error_code(), "MEDIA_ERR_NETWORK");
    }

    #[test]
    fn test_configuration_errors_are_not_recoverable() {
        assert!(!Error::NotAVideoElement.is_recoverable());
        assert!(!Error::UnresolvableBreakPosition { percent: 50.0 }.is_recoverable());
        assert_eq!(Error::NotAVideoElement.error_code(), "NOT_VIDEO");
    }
}
