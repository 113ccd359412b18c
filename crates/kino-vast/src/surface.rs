//! Host capabilities the player drives
//!
//! The player never touches a DOM directly. A [`MediaSurface`] wraps the
//! watched video element and a [`HostEnv`] provides timers and navigation.
//! Hosts forward element events for subscribed kinds to
//! [`AdPlayer::handle_event`](crate::AdPlayer::handle_event) and finished
//! timers to [`AdPlayer::handle_timer`](crate::AdPlayer::handle_timer).

use crate::types::{MediaErrorCode, MediaEventKind, TimerId, TimerReason};
use std::time::Duration;
use url::Url;

/// A video element as seen by the ad player
pub trait MediaSurface {
    /// Whether the element can play video
    fn is_video(&self) -> bool;

    fn paused(&self) -> bool;

    fn ended(&self) -> bool;

    fn current_time(&self) -> f64;

    fn set_current_time(&mut self, time: f64);

    /// Media duration, `None` while unknown
    fn duration(&self) -> Option<f64>;

    /// Source currently loaded
    fn current_src(&self) -> Option<String>;

    /// Set the `src` attribute
    fn set_src(&mut self, src: &str);

    fn load(&mut self);

    fn play(&mut self);

    fn pause(&mut self);

    /// Whether native controls are shown
    fn controls(&self) -> bool;

    fn set_controls(&mut self, visible: bool);

    fn set_autoplay(&mut self, autoplay: bool);

    /// End of the first seekable range, `None` when nothing is seekable
    fn seekable_end(&self) -> Option<f64>;

    /// Last media error reported by the element
    fn error(&self) -> Option<MediaErrorCode>;

    /// Fire a synthetic event at the element
    fn dispatch(&mut self, kind: MediaEventKind);

    /// Start forwarding events of `kind` to the player
    fn subscribe(&mut self, kind: MediaEventKind);

    /// Stop forwarding events of `kind`
    fn unsubscribe(&mut self, kind: MediaEventKind);

    /// Next event queued by surfaces that buffer events internally
    fn take_pending_event(&mut self) -> Option<MediaEventKind> {
        None
    }
}

/// Environment services around the element
pub trait HostEnv {
    /// Start a one-shot timer; the host reports it back through `handle_timer`
    fn start_timer(&mut self, delay: Duration, reason: TimerReason) -> TimerId;

    fn clear_timer(&mut self, id: TimerId);

    /// Open a click-through page in a new browsing context
    fn open_url(&mut self, url: &Url);
}

/// Player handlers that can be bound to element events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Listener {
    // Content mode
    CheckPreroll,
    CheckMidroll,
    CheckPostroll,
    ContentCanPlay,
    // Ad mode
    AdPlay,
    AdClick,
    AdClickToResume,
    AdCanPlay,
    AdTick,
    AdEnded,
    AdError,
}

/// Bound (event, listener) pairs, in registration order
#[derive(Debug, Default, Clone)]
pub struct ListenerTable {
    bindings: Vec<(MediaEventKind, Listener)>,
}

impl ListenerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `listener` to `kind`; returns true when `kind` had no listener yet
    pub fn listen(&mut self, kind: MediaEventKind, listener: Listener) -> bool {
        if self.is_bound(kind, listener) {
            return false;
        }
        let first = !self.has_kind(kind);
        self.bindings.push((kind, listener));
        first
    }

    /// Unbind `listener` from `kind`; returns true when `kind` has no listener left
    pub fn unlisten(&mut self, kind: MediaEventKind, listener: Listener) -> bool {
        let before = self.bindings.len();
        self.bindings.retain(|&(k, l)| !(k == kind && l == listener));
        before != self.bindings.len() && !self.has_kind(kind)
    }

    pub fn is_bound(&self, kind: MediaEventKind, listener: Listener) -> bool {
        self.bindings.contains(&(kind, listener))
    }

    pub fn has_kind(&self, kind: MediaEventKind) -> bool {
        self.bindings.iter().any(|&(k, _)| k == kind)
    }

    /// Listeners bound to `kind` at dispatch time
    pub fn listeners_for(&self, kind: MediaEventKind) -> Vec<Listener> {
        self.bindings
            .iter()
            .filter(|&&(k, _)| k == kind)
            .map(|&(_, l)| l)
            .collect()
    }

    /// Remove every binding, returning the kinds that were bound
    pub fn drain_kinds(&mut self) -> Vec<MediaEventKind> {
        let mut kinds: Vec<MediaEventKind> = Vec::new();
        for (kind, _) in self.bindings.drain(..) {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listen_reports_first_binding() {
        let mut table = ListenerTable::new();
        assert!(table.listen(MediaEventKind::Play, Listener::CheckPreroll));
        assert!(!table.listen(MediaEventKind::Play, Listener::AdPlay));
        assert!(!table.listen(MediaEventKind::Play, Listener::AdPlay));

        assert_eq!(
            table.listeners_for(MediaEventKind::Play),
            vec![Listener::CheckPreroll, Listener::AdPlay]
        );
    }

    #[test]
    fn test_unlisten_reports_last_binding() {
        let mut table = ListenerTable::new();
        table.listen(MediaEventKind::Click, Listener::AdClick);
        table.listen(MediaEventKind::Ended, Listener::AdEnded);

        assert!(!table.unlisten(MediaEventKind::Click, Listener::AdClickToResume));
        assert!(table.unlisten(MediaEventKind::Click, Listener::AdClick));
        assert!(!table.has_kind(MediaEventKind::Click));
        assert!(table.has_kind(MediaEventKind::Ended));

        assert_eq!(table.drain_kinds(), vec![MediaEventKind::Ended]);
        assert!(!table.has_kind(MediaEventKind::Ended));
    }
}
