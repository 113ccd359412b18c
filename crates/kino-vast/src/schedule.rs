//! Insertion scheduling
//!
//! Decides from content playback events whether a pre-roll, mid-roll or
//! post-roll is due. Mid-roll breaks are kept sorted by resolved position so
//! the most recent due break is found with a single binary search.

use crate::{
    types::{BreakPosition, InsertionPoint, Offset, SessionId},
    vast::AdHandle,
    Error, Result,
};
use std::fmt;
use tracing::{debug, error};

/// A mid-roll break resolved to absolute content time
#[derive(Clone)]
pub struct AdBreak {
    /// Position in seconds
    pub position: f64,
    /// First ad of the break
    pub ad: AdHandle,
}

impl fmt::Debug for AdBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdBreak")
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

/// Scheduled breaks of the watched content
#[derive(Default, Clone)]
pub struct BreakSchedule {
    breaks: Vec<AdBreak>,
    preroll: Option<AdHandle>,
    postroll: Option<AdHandle>,
}

impl BreakSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `ad` at `position`
    ///
    /// Fractional positions are resolved against the content `duration`; a
    /// fraction without a known duration is rejected. Returns the index a
    /// mid-roll was placed at.
    pub fn insert(
        &mut self,
        position: BreakPosition,
        ad: AdHandle,
        duration: Option<f64>,
    ) -> Result<Option<usize>> {
        match position {
            BreakPosition::Start => {
                debug!("Pre-roll scheduled");
                self.preroll = Some(ad);
            }
            BreakPosition::End => {
                debug!("Post-roll scheduled");
                self.postroll = Some(ad);
            }
            BreakPosition::At(offset) => {
                let Some(at) = offset.resolve(duration) else {
                    let percent = match offset {
                        Offset::Fraction(fraction) => fraction * 100.0,
                        Offset::Absolute(secs) => secs,
                    };
                    let err = Error::UnresolvableBreakPosition { percent };
                    error!(error = %err, "Ad break dropped");
                    return Err(err);
                };
                // Equal positions keep their insertion order
                let index = self.breaks.partition_point(|b| b.position <= at);
                self.breaks.insert(index, AdBreak { position: at, ad });
                debug!(position = at, index, "Mid-roll scheduled");
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Index of the last break whose position has been passed at `time`
    pub fn due_index(&self, time: f64) -> Option<usize> {
        self.breaks
            .partition_point(|b| b.position <= time)
            .checked_sub(1)
    }

    pub fn get(&self, index: usize) -> Option<&AdBreak> {
        self.breaks.get(index)
    }

    pub fn breaks(&self) -> &[AdBreak] {
        &self.breaks
    }

    pub fn len(&self) -> usize {
        self.breaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breaks.is_empty()
    }

    pub fn has_preroll(&self) -> bool {
        self.preroll.is_some()
    }

    pub fn has_postroll(&self) -> bool {
        self.postroll.is_some()
    }

    /// First ad to show for a break that was not given an explicit ad
    pub fn first_ad(&self, point: InsertionPoint) -> Option<AdHandle> {
        match point {
            InsertionPoint::Start | InsertionPoint::BeforeContent => self.preroll.clone(),
            InsertionPoint::End => self.postroll.clone(),
            InsertionPoint::Position => None,
        }
    }
}

/// A break the scheduler decided to run
#[derive(Clone)]
pub struct Insertion {
    pub point: InsertionPoint,
    /// Explicit first ad, if the break carries one
    pub ad: Option<AdHandle>,
    /// Index into the mid-roll schedule
    pub break_index: Option<usize>,
}

impl Insertion {
    pub fn new(point: InsertionPoint) -> Self {
        Self {
            point,
            ad: None,
            break_index: None,
        }
    }
}

impl fmt::Debug for Insertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Insertion")
            .field("point", &self.point)
            .field("has_ad", &self.ad.is_some())
            .field("break_index", &self.break_index)
            .finish()
    }
}

/// Insertion flags of one watched element
#[derive(Debug, Clone)]
pub struct WatchSession {
    pub id: SessionId,
    pub has_shown_preroll: bool,
    pub has_shown_postroll: bool,
    pub last_played_midroll: Option<usize>,
}

impl WatchSession {
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            has_shown_preroll: false,
            has_shown_postroll: false,
            last_played_midroll: None,
        }
    }

    /// Content started playing
    pub fn check_preroll(&mut self) -> Option<Insertion> {
        if self.has_shown_preroll {
            return None;
        }
        self.has_shown_preroll = true;
        Some(Insertion::new(InsertionPoint::Start))
    }

    /// Content reached `time`
    ///
    /// Fires the most recent break passed at `time` unless it is the one
    /// played last.
    pub fn check_midroll(&mut self, schedule: &BreakSchedule, time: f64) -> Option<Insertion> {
        let index = schedule.due_index(time)?;
        if self.last_played_midroll == Some(index) {
            return None;
        }

        let due = schedule.get(index)?;
        debug!(index, position = due.position, time, "Playing overdue mid-roll");
        self.last_played_midroll = Some(index);

        Some(Insertion {
            point: InsertionPoint::Position,
            ad: Some(due.ad.clone()),
            break_index: Some(index),
        })
    }

    /// A mid-roll was inserted at `index`, shifting the breaks after it
    pub fn break_inserted(&mut self, index: usize) {
        if let Some(last) = self.last_played_midroll.as_mut() {
            if index <= *last {
                *last += 1;
            }
        }
    }

    /// Content ended
    pub fn check_postroll(&mut self) -> Option<Insertion> {
        if self.has_shown_postroll {
            return None;
        }
        self.has_shown_postroll = true;
        Some(Insertion::new(InsertionPoint::End))
    }
}

impl Default for WatchSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vast::{Companion, LinearCreative, VastAd};
    use std::rc::Rc;

    struct EmptyAd;

    impl VastAd for EmptyAd {
        fn has_data(&self) -> bool {
            true
        }
        fn next_ad(&self) -> Option<AdHandle> {
            None
        }
        fn companions(&self) -> Vec<Rc<dyn Companion>> {
            Vec::new()
        }
        fn linear(&self) -> Option<Rc<dyn LinearCreative>> {
            None
        }
    }

    fn ad() -> AdHandle {
        Rc::new(EmptyAd)
    }

    fn at(secs: f64) -> BreakPosition {
        BreakPosition::At(Offset::Absolute(secs))
    }

    #[test]
    fn test_breaks_stay_sorted() {
        let mut schedule = BreakSchedule::new();
        for secs in [30.0, 10.0, 50.0, 20.0, 10.0, 0.5] {
            schedule.insert(at(secs), ad(), None).unwrap();
        }
        schedule
            .insert(BreakPosition::At(Offset::Fraction(0.4)), ad(), Some(100.0))
            .unwrap();

        let positions: Vec<f64> = schedule.breaks().iter().map(|b| b.position).collect();
        assert_eq!(positions, vec![0.5, 10.0, 10.0, 20.0, 30.0, 40.0, 50.0]);
    }

    #[test]
    fn test_fraction_without_duration_is_rejected() {
        let mut schedule = BreakSchedule::new();
        let result = schedule.insert(BreakPosition::At(Offset::Fraction(0.5)), ad(), None);
        assert!(matches!(
            result,
            Err(Error::UnresolvableBreakPosition { percent }) if percent == 50.0
        ));
        assert!(schedule.is_empty());
    }

    #[test]
    fn test_due_index_prefers_later_ties() {
        let mut schedule = BreakSchedule::new();
        schedule.insert(at(10.0), ad(), None).unwrap();
        schedule.insert(at(10.0), ad(), None).unwrap();
        schedule.insert(at(30.0), ad(), None).unwrap();

        assert_eq!(schedule.due_index(5.0), None);
        assert_eq!(schedule.due_index(10.0), Some(1));
        assert_eq!(schedule.due_index(29.9), Some(1));
        assert_eq!(schedule.due_index(31.0), Some(2));
    }

    #[test]
    fn test_midroll_fires_each_break_once() {
        let mut schedule = BreakSchedule::new();
        schedule.insert(at(10.0), ad(), None).unwrap();
        schedule.insert(at(30.0), ad(), None).unwrap();

        let mut session = WatchSession::new();
        assert!(session.check_midroll(&schedule, 0.0).is_none());

        let first = session.check_midroll(&schedule, 15.0).unwrap();
        assert_eq!(first.break_index, Some(0));
        assert_eq!(first.point, InsertionPoint::Position);
        assert!(first.ad.is_some());
        assert!(session.check_midroll(&schedule, 15.0).is_none());
        assert!(session.check_midroll(&schedule, 20.0).is_none());

        let second = session.check_midroll(&schedule, 35.0).unwrap();
        assert_eq!(second.break_index, Some(1));
        assert!(session.check_midroll(&schedule, 35.0).is_none());
        assert!(session.check_midroll(&schedule, 60.0).is_none());
    }

    #[test]
    fn test_earlier_insert_keeps_played_midroll() {
        let mut schedule = BreakSchedule::new();
        schedule.insert(at(10.0), ad(), None).unwrap();
        schedule.insert(at(30.0), ad(), None).unwrap();

        let mut session = WatchSession::new();
        assert!(session.check_midroll(&schedule, 15.0).is_some());

        let index = schedule.insert(at(5.0), ad(), None).unwrap();
        assert_eq!(index, Some(0));
        session.break_inserted(0);
        assert_eq!(session.last_played_midroll, Some(1));
        assert!(session.check_midroll(&schedule, 16.0).is_none());

        // A break after the played one is still due once passed
        let index = schedule.insert(at(20.0), ad(), None).unwrap();
        assert_eq!(index, Some(2));
        session.break_inserted(2);
        assert!(session.check_midroll(&schedule, 19.0).is_none());
        assert_eq!(session.check_midroll(&schedule, 21.0).unwrap().break_index, Some(2));
        assert_eq!(schedule.insert(BreakPosition::End, ad(), None).unwrap(), None);
    }

    #[test]
    fn test_preroll_and_postroll_fire_once() {
        let mut session = WatchSession::new();
        assert_eq!(session.check_preroll().unwrap().point, InsertionPoint::Start);
        assert!(session.check_preroll().is_none());
        assert_eq!(session.check_postroll().unwrap().point, InsertionPoint::End);
        assert!(session.check_postroll().is_none());
    }

    #[test]
    fn test_first_ad_slots() {
        let mut schedule = BreakSchedule::new();
        assert!(schedule.first_ad(InsertionPoint::Start).is_none());

        schedule.insert(BreakPosition::Start, ad(), None).unwrap();
        assert!(schedule.has_preroll());
        assert!(schedule.first_ad(InsertionPoint::BeforeContent).is_some());
        assert!(schedule.first_ad(InsertionPoint::End).is_none());
        assert!(schedule.first_ad(InsertionPoint::Position).is_none());
    }
}
