use crate::input::events::MouseButton;
use crate::input::selection::PressOutcome;
use crate::util::Point;

use super::{ActiveMonitor, InputState, PendingAction};

impl InputState {
    /// Pointer entered the overlay of `monitor`.
    pub fn on_pointer_enter(&mut self, monitor: ActiveMonitor, pos: Point) {
        self.active = Some(monitor);
        self.pointer = pos;
        self.needs_redraw = true;
    }

    /// Pointer left the overlay of `monitor`.
    pub fn on_pointer_leave(&mut self, monitor: u32) {
        if self.active.is_some_and(|active| active.id == monitor) {
            self.active = None;
            self.needs_redraw = true;
        }
    }

    pub fn on_pointer_motion(&mut self, pos: Point) {
        self.pointer = pos;
        if self.selection.motion(pos) {
            self.needs_redraw = true;
        }
    }

    /// Processes a button press at the last known pointer position.
    ///
    /// The menu gets the first look when the pointer is on the monitor it
    /// was opened on; a click outside its buttons hides it and goes on to
    /// the selection.
    pub fn on_button_press(&mut self, button: MouseButton) {
        if button != MouseButton::Left {
            return;
        }
        let pos = self.pointer;

        if self.menu.is_visible() {
            if self.pointer_on_menu_monitor() {
                if let Some(action) = self.menu.hit(pos) {
                    self.run_menu_action(action);
                    self.needs_redraw = true;
                    return;
                }
            }
            self.menu.hide();
            self.needs_redraw = true;
        }

        // A fresh gesture only clears the listed results; the captured
        // region and its text survive until a rectangle is committed.
        if self.selection.press(pos) == PressOutcome::Started {
            self.results.clear();
        }
        self.needs_redraw = true;
    }

    fn pointer_on_menu_monitor(&self) -> bool {
        match (self.active, &self.captured) {
            (Some(active), Some(captured)) => active.id == captured.monitor,
            _ => false,
        }
    }

    /// Finishes the gesture; a valid rectangle is queued for cropping.
    pub fn on_button_release(&mut self, button: MouseButton) {
        if button != MouseButton::Left || !self.selection.is_dragging() {
            return;
        }
        let committed = self.selection.release();
        self.needs_redraw = true;

        let (Some(rect), Some(active)) = (committed, self.active) else {
            return;
        };
        log::debug!(
            "Selection committed on monitor {}: {:.0}x{:.0} at ({:.0}, {:.0})",
            active.id,
            rect.width,
            rect.height,
            rect.x,
            rect.y
        );
        self.pending.push(PendingAction::Commit {
            monitor: active.id,
            rect,
        });
    }
}
