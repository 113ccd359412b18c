//! Content playback state saved across an ad break

use crate::surface::MediaSurface;
use serde::{Deserialize, Serialize};

/// State of the watched element before it was taken over
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStateSnapshot {
    /// Content source
    pub original_src: Option<String>,
    /// Content position to seek back to, `None` to resume from wherever the element is
    pub time_to_resume: Option<f64>,
    /// Content had already ended when the break began
    pub ended: bool,
    /// Waiting for the seekable range to cover `time_to_resume`
    pub is_buffering: bool,
    /// Native controls were shown
    pub controls: bool,
}

/// How to hand the element back to content
#[derive(Debug, Clone, PartialEq)]
pub enum RestoreAction {
    /// Content source is still loaded, just play
    Play,
    /// Put the content source back and wait for it to become playable
    Reload(String),
    /// Content was over: restore its source if needed and re-announce the end
    Ended { reset_src: Option<String> },
}

/// Next step of the buffering-aware resume
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResumeStep {
    /// Nothing to seek to
    Play,
    /// Resume point not seekable yet, poll again later
    Wait,
    /// Seek to the resume point and play
    SeekAndPlay(f64),
}

impl PlayerStateSnapshot {
    /// Capture the element's content state
    pub fn capture<S: MediaSurface + ?Sized>(surface: &S) -> Self {
        let time = surface.current_time();
        Self {
            original_src: surface.current_src(),
            time_to_resume: (time > 0.0).then_some(time),
            ended: surface.ended(),
            is_buffering: false,
            controls: surface.controls(),
        }
    }

    /// Decide how to restore content given the element's current source
    pub fn restore_action(&self, current_src: Option<&str>) -> RestoreAction {
        let Some(original) = self.original_src.as_deref() else {
            return if self.ended {
                RestoreAction::Ended { reset_src: None }
            } else {
                RestoreAction::Play
            };
        };
        let src_changed = current_src != Some(original);

        if self.ended {
            return RestoreAction::Ended {
                reset_src: src_changed.then(|| original.to_string()),
            };
        }
        if src_changed {
            RestoreAction::Reload(original.to_string())
        } else {
            RestoreAction::Play
        }
    }

    /// Decide whether the resume point can be reached yet
    pub fn resume_step(&self, seekable_end: Option<f64>) -> ResumeStep {
        match self.time_to_resume {
            None => ResumeStep::Play,
            Some(at) => match seekable_end {
                Some(end) if end >= at => ResumeStep::SeekAndPlay(at),
                _ => ResumeStep::Wait,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(src: Option<&str>, time: Option<f64>, ended: bool) -> PlayerStateSnapshot {
        PlayerStateSnapshot {
            original_src: src.map(str::to_string),
            time_to_resume: time,
            ended,
            is_buffering: false,
            controls: true,
        }
    }

    #[test]
    fn test_restore_unchanged_source_plays() {
        let snap = snapshot(Some("content.mp4"), Some(12.0), false);
        assert_eq!(snap.restore_action(Some("content.mp4")), RestoreAction::Play);
    }

    #[test]
    fn test_restore_changed_source_reloads() {
        let snap = snapshot(Some("content.mp4"), Some(12.0), false);
        assert_eq!(
            snap.restore_action(Some("ad.mp4")),
            RestoreAction::Reload("content.mp4".to_string())
        );
    }

    #[test]
    fn test_restore_without_original_source_plays() {
        let snap = snapshot(None, None, false);
        assert_eq!(snap.restore_action(Some("ad.mp4")), RestoreAction::Play);
    }

    #[test]
    fn test_restore_after_content_end() {
        let snap = snapshot(Some("content.mp4"), Some(60.0), true);
        assert_eq!(
            snap.restore_action(Some("ad.mp4")),
            RestoreAction::Ended {
                reset_src: Some("content.mp4".to_string())
            }
        );
        assert_eq!(
            snap.restore_action(Some("content.mp4")),
            RestoreAction::Ended { reset_src: None }
        );
    }

    #[test]
    fn test_resume_waits_for_seekable_range() {
        let snap = snapshot(Some("content.mp4"), Some(42.0), false);
        assert_eq!(snap.resume_step(None), ResumeStep::Wait);
        assert_eq!(snap.resume_step(Some(30.0)), ResumeStep::Wait);
        assert_eq!(snap.resume_step(Some(42.0)), ResumeStep::SeekAndPlay(42.0));

        let from_start = snapshot(Some("content.mp4"), None, false);
        assert_eq!(from_start.resume_step(None), ResumeStep::Play);
    }
}
