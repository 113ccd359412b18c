//! Companion banner dispatch

use crate::{
    vast::{Companion, TrackingEvent},
    Error, Result,
};
use tracing::debug;

/// Caller supplied renderer; returns true iff the companion was shown
pub type CompanionRenderer = Box<dyn FnMut(&dyn Companion) -> bool>;

/// Forwards companion creatives to the registered renderer
#[derive(Default)]
pub struct CompanionDispatcher {
    renderer: Option<CompanionRenderer>,
}

impl CompanionDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear the renderer
    pub fn set_renderer(&mut self, renderer: Option<CompanionRenderer>) {
        self.renderer = renderer;
    }

    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }

    /// Show `companion`, tracking `creativeView` once it is displayed
    pub fn show(&mut self, companion: &dyn Companion) -> Result<()> {
        let zone = companion.zone_id();
        debug!(zone = ?zone, width = ?companion.width(), height = ?companion.height(), "Show companion banner");

        let Some(renderer) = self.renderer.as_mut() else {
            return Err(Error::NoCompanionRenderer);
        };

        if renderer(companion) {
            companion.track(&TrackingEvent::CreativeView);
            Ok(())
        } else {
            Err(Error::CompanionRejected { zone })
        }
    }
}
