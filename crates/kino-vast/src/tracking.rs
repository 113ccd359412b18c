//! Tracking points of the active linear creative
//!
//! Each point fires at most once per ad: it is removed from the queue the
//! first time playback reaches its offset.

use crate::vast::TrackingPoint;
use tracing::debug;

/// Unsent tracking points of the active ad
#[derive(Debug, Default, Clone)]
pub struct TrackingQueue {
    unsent: Vec<TrackingPoint>,
}

impl TrackingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the queue with the points of a newly started ad
    pub fn load(&mut self, points: Vec<TrackingPoint>) {
        debug!(points = points.len(), "Tracking points loaded");
        self.unsent = points;
    }

    pub fn clear(&mut self) {
        self.unsent.clear();
    }

    pub fn len(&self) -> usize {
        self.unsent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unsent.is_empty()
    }

    /// Take every point whose offset has been reached at `time`
    ///
    /// Fraction offsets are measured against `duration`; they stay queued
    /// while the duration is unknown.
    pub fn take_due(&mut self, time: f64, duration: Option<f64>) -> Vec<TrackingPoint> {
        let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.unsent)
            .into_iter()
            .partition(|point| point.offset.is_reached(time, duration));
        self.unsent = pending;
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Offset;
    use crate::vast::TrackingEvent;

    fn quartiles() -> Vec<TrackingPoint> {
        vec![
            TrackingPoint::new("firstQuartile", Offset::Fraction(0.25)),
            TrackingPoint::new("midpoint", Offset::Fraction(0.5)),
            TrackingPoint::new("thirdQuartile", Offset::Fraction(0.75)),
            TrackingPoint::new("progress", Offset::Absolute(5.0)),
        ]
    }

    #[test]
    fn test_points_fire_once() {
        let mut queue = TrackingQueue::new();
        queue.load(quartiles());

        let due = queue.take_due(8.0, Some(30.0));
        let events: Vec<_> = due.iter().map(|p| p.event.clone()).collect();
        assert_eq!(events, vec![TrackingEvent::FirstQuartile, TrackingEvent::Progress]);

        // Same position on the next tick: nothing fires again
        assert!(queue.take_due(8.0, Some(30.0)).is_empty());
        assert_eq!(queue.len(), 2);

        let due = queue.take_due(30.0, Some(30.0));
        assert_eq!(due.len(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_fraction_waits_for_duration() {
        let mut queue = TrackingQueue::new();
        queue.load(vec![TrackingPoint::new("midpoint", Offset::Fraction(0.5))]);

        assert!(queue.take_due(100.0, None).is_empty());
        assert_eq!(queue.take_due(100.0, Some(20.0)).len(), 1);
    }

    #[test]
    fn test_not_reached_before_offset() {
        let mut queue = TrackingQueue::new();
        queue.load(vec![TrackingPoint::new("progress", Offset::Absolute(10.0))]);

        assert!(queue.take_due(0.0, Some(30.0)).is_empty());
        assert!(queue.take_due(9.99, Some(30.0)).is_empty());
        assert_eq!(queue.take_due(10.0, Some(30.0)).len(), 1);
    }
}
