//! Per-monitor overlay lifecycle: configure/ack handshake, redraw pacing and
//! render slot selection.
//!
//! Protocol-free so the pacing rules can be tested without a compositor. The
//! backend asks it what to do and reports what happened:
//!
//! ```text
//! Unconfigured -> AwaitingAck -> Ready <-> Dirty -> Rendering -> Ready
//! ```

use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayPhase {
    Unconfigured,
    /// Configured, ack held back until the frozen image exists.
    AwaitingAck,
    Ready,
    Dirty,
    Rendering,
    TornDown,
}

/// What the backend must do to acknowledge a configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckPlan {
    pub serial: u32,
    pub pixel_size: (u32, u32),
    /// Render buffers are missing or have the wrong size.
    pub reallocate: bool,
}

#[derive(Debug)]
pub struct OverlayLifecycle {
    phase: OverlayPhase,
    pending_serial: Option<u32>,
    logical_size: (u32, u32),
    scale: f64,
    /// Size the render buffers were last allocated with.
    allocated: Option<(u32, u32)>,
    frozen: bool,
    frame_pending: bool,
    redraw_deferred: bool,
    next_slot: usize,
}

/// Pixel size of a logical extent at `scale`, rounded.
pub fn pixel_size(logical: (u32, u32), scale: f64) -> (u32, u32) {
    (
        (logical.0 as f64 * scale).round() as u32,
        (logical.1 as f64 * scale).round() as u32,
    )
}

impl Default for OverlayLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayLifecycle {
    pub fn new() -> Self {
        Self {
            phase: OverlayPhase::Unconfigured,
            pending_serial: None,
            logical_size: (0, 0),
            scale: 1.0,
            allocated: None,
            frozen: false,
            frame_pending: false,
            redraw_deferred: false,
            next_slot: 0,
        }
    }

    pub fn phase(&self) -> OverlayPhase {
        self.phase
    }

    pub fn logical_size(&self) -> (u32, u32) {
        self.logical_size
    }

    pub fn frame_pending(&self) -> bool {
        self.frame_pending
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Size the render buffers should have right now.
    pub fn target_size(&self) -> (u32, u32) {
        pixel_size(self.logical_size, self.scale)
    }

    /// Handles a configure event. The ack is not sent here; see
    /// [`take_ack`](Self::take_ack).
    pub fn on_configure(&mut self, serial: u32, logical_size: (u32, u32), scale: f64) {
        if self.phase == OverlayPhase::TornDown {
            return;
        }
        self.pending_serial = Some(serial);
        // A zero size leaves the choice to us; keep what we had.
        if logical_size.0 > 0 && logical_size.1 > 0 {
            self.logical_size = logical_size;
        }
        self.scale = scale;
        self.phase = OverlayPhase::AwaitingAck;
        debug!(
            "Overlay configured: serial {}, {}x{} logical at scale {}",
            serial, self.logical_size.0, self.logical_size.1, scale
        );
    }

    /// The screen copy for this monitor has landed.
    pub fn mark_frozen(&mut self) {
        self.frozen = true;
    }

    /// Returns the ack to send once both a configure and the frozen image are
    /// present, and moves on to a first redraw.
    pub fn take_ack(&mut self) -> Option<AckPlan> {
        if self.phase != OverlayPhase::AwaitingAck || !self.frozen {
            return None;
        }
        let serial = self.pending_serial.take()?;
        let target = self.target_size();
        let reallocate = self.allocated != Some(target);
        self.allocated = Some(target);
        self.phase = OverlayPhase::Ready;
        self.request_redraw();
        Some(AckPlan {
            serial,
            pixel_size: target,
            reallocate,
        })
    }

    /// Scale changed after the ack; returns the new buffer size when the
    /// buffers have to be replaced.
    pub fn rescale(&mut self, scale: f64) -> Option<(u32, u32)> {
        self.scale = scale;
        let target = self.target_size();
        if self.allocated.is_none() || self.allocated == Some(target) {
            return None;
        }
        self.allocated = Some(target);
        self.request_redraw();
        Some(target)
    }

    /// Something visible changed.
    ///
    /// Becomes `Dirty` right away when no frame callback is outstanding,
    /// otherwise the request waits for [`on_frame_done`](Self::on_frame_done).
    pub fn request_redraw(&mut self) {
        match self.phase {
            OverlayPhase::Ready if !self.frame_pending => self.phase = OverlayPhase::Dirty,
            OverlayPhase::Ready | OverlayPhase::Rendering => self.redraw_deferred = true,
            _ => {}
        }
    }

    pub fn on_frame_done(&mut self) {
        self.frame_pending = false;
        if self.redraw_deferred && self.phase == OverlayPhase::Ready {
            self.redraw_deferred = false;
            self.phase = OverlayPhase::Dirty;
        }
    }

    pub fn wants_render(&self) -> bool {
        self.phase == OverlayPhase::Dirty && !self.frame_pending
    }

    /// Picks the slot to render into, given which slots the compositor still
    /// holds.
    ///
    /// Prefers the slot after the last one used and falls back to the other
    /// one. Returns `None` and stays dirty only while both are busy; the next
    /// release event retries.
    pub fn begin_render(&mut self, busy: [bool; 2]) -> Option<usize> {
        if !self.wants_render() {
            return None;
        }
        let preferred = self.next_slot;
        let slot = if !busy[preferred] {
            preferred
        } else if !busy[1 - preferred] {
            1 - preferred
        } else {
            debug!("Render skipped: both buffers held by compositor");
            return None;
        };
        self.next_slot = 1 - slot;
        self.phase = OverlayPhase::Rendering;
        Some(slot)
    }

    /// The frame was committed together with a frame callback request.
    pub fn finish_render(&mut self) {
        if self.phase == OverlayPhase::Rendering {
            self.phase = OverlayPhase::Ready;
            self.frame_pending = true;
        }
    }

    /// Painting failed before anything was committed.
    pub fn abort_render(&mut self) {
        if self.phase == OverlayPhase::Rendering {
            self.phase = OverlayPhase::Ready;
        }
    }

    pub fn tear_down(&mut self) {
        self.phase = OverlayPhase::TornDown;
        self.frame_pending = false;
        self.redraw_deferred = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready() -> OverlayLifecycle {
        let mut overlay = OverlayLifecycle::new();
        overlay.on_configure(5, (1920, 1080), 1.0);
        overlay.mark_frozen();
        overlay.take_ack().unwrap();
        overlay
    }

    #[test]
    fn ack_waits_for_frozen_image() {
        let mut overlay = OverlayLifecycle::new();
        overlay.on_configure(10, (1920, 1080), 1.25);
        assert_eq!(overlay.phase(), OverlayPhase::AwaitingAck);
        assert_eq!(overlay.take_ack(), None);

        overlay.mark_frozen();
        let plan = overlay.take_ack().unwrap();
        assert_eq!(
            plan,
            AckPlan {
                serial: 10,
                pixel_size: (2400, 1350),
                reallocate: true
            }
        );
        assert_eq!(overlay.phase(), OverlayPhase::Dirty);
        assert_eq!(overlay.take_ack(), None);
    }

    #[test]
    fn frozen_before_configure_acks_on_configure() {
        let mut overlay = OverlayLifecycle::new();
        overlay.mark_frozen();
        assert_eq!(overlay.take_ack(), None);
        overlay.on_configure(3, (800, 600), 2.0);
        assert_eq!(overlay.take_ack().unwrap().pixel_size, (1600, 1200));
    }

    #[test]
    fn reconfigure_with_same_size_keeps_buffers() {
        let mut overlay = ready();
        overlay.on_configure(6, (1920, 1080), 1.0);
        let plan = overlay.take_ack().unwrap();
        assert_eq!(plan.serial, 6);
        assert!(!plan.reallocate);

        overlay.on_configure(7, (1280, 720), 1.0);
        assert!(overlay.take_ack().unwrap().reallocate);
    }

    #[test]
    fn redraw_is_deferred_while_frame_pending() {
        let mut overlay = ready();
        let slot = overlay.begin_render([false, false]).unwrap();
        assert_eq!(slot, 0);
        overlay.finish_render();
        assert!(overlay.frame_pending());

        overlay.request_redraw();
        overlay.request_redraw();
        assert!(!overlay.wants_render());
        assert_eq!(overlay.phase(), OverlayPhase::Ready);

        overlay.on_frame_done();
        assert!(overlay.wants_render());
        // Deferred once, rendered once.
        assert_eq!(overlay.begin_render([false, false]), Some(1));
        overlay.finish_render();
        overlay.on_frame_done();
        assert!(!overlay.wants_render());
    }

    #[test]
    fn busy_slot_renders_into_the_free_one() {
        let mut overlay = ready();
        assert_eq!(overlay.begin_render([true, false]), Some(1));
        overlay.finish_render();
        overlay.on_frame_done();

        // Compositor keeps slot 1 until slot 0 replaces it.
        overlay.request_redraw();
        assert_eq!(overlay.begin_render([false, true]), Some(0));
    }

    #[test]
    fn both_slots_busy_skips_render_until_release() {
        let mut overlay = ready();
        assert_eq!(overlay.begin_render([true, true]), None);
        assert_eq!(overlay.phase(), OverlayPhase::Dirty);
        assert_eq!(overlay.begin_render([false, true]), Some(0));
    }

    #[test]
    fn slots_alternate() {
        let mut overlay = ready();
        let mut slots = Vec::new();
        for _ in 0..4 {
            slots.push(overlay.begin_render([false, false]).unwrap());
            overlay.finish_render();
            overlay.on_frame_done();
            overlay.request_redraw();
        }
        assert_eq!(slots, vec![0, 1, 0, 1]);
    }

    #[test]
    fn redraw_during_render_is_not_lost() {
        let mut overlay = ready();
        overlay.begin_render([false, false]).unwrap();
        overlay.request_redraw();
        overlay.finish_render();
        overlay.on_frame_done();
        assert!(overlay.wants_render());
    }

    #[test]
    fn abort_returns_to_ready() {
        let mut overlay = ready();
        overlay.begin_render([false, false]).unwrap();
        overlay.abort_render();
        assert_eq!(overlay.phase(), OverlayPhase::Ready);
        assert!(!overlay.frame_pending());
    }

    #[test]
    fn rescale_reports_new_size_only_after_allocation() {
        let mut overlay = OverlayLifecycle::new();
        overlay.on_configure(1, (1000, 500), 1.0);
        assert_eq!(overlay.rescale(1.5), None);

        overlay.mark_frozen();
        assert_eq!(overlay.take_ack().unwrap().pixel_size, (1500, 750));
        assert_eq!(overlay.rescale(1.5), None);
        assert_eq!(overlay.rescale(2.0), Some((2000, 1000)));
    }

    #[test]
    fn torn_down_ignores_everything() {
        let mut overlay = ready();
        overlay.tear_down();
        overlay.on_configure(9, (10, 10), 1.0);
        overlay.request_redraw();
        assert_eq!(overlay.phase(), OverlayPhase::TornDown);
        assert_eq!(overlay.take_ack(), None);
    }
}
