use crate::input::events::Key;
use crate::input::menu::MenuAction;
use crate::util::Point;

use super::{COPIED_MESSAGE, InputState, PendingAction, SessionExit};

impl InputState {
    pub(super) fn run_menu_action(&mut self, action: MenuAction) {
        match action {
            MenuAction::Recognize(kind) => self.start_recognition(kind),
            MenuAction::Copy => {
                // Nothing recognized yet: the ready or failure message stays.
                let Some(text) = self.recognized_text.clone() else {
                    return;
                };
                self.pending.push(PendingAction::CopyText(text));
                self.result_text = COPIED_MESSAGE.to_string();
            }
            MenuAction::Close => self.request_exit(SessionExit::Closed),
        }
    }

    /// Processes a key press.
    ///
    /// Arrows move the pointer by one logical unit inside the active overlay
    /// (dragging along when a gesture is in progress). Escape cancels.
    pub fn on_key_press(&mut self, key: Key) {
        let (dx, dy) = match key {
            Key::Escape => {
                self.request_exit(SessionExit::Cancelled);
                return;
            }
            Key::Left => (-1.0, 0.0),
            Key::Right => (1.0, 0.0),
            Key::Up => (0.0, -1.0),
            Key::Down => (0.0, 1.0),
            Key::Unknown => return,
        };
        let Some(active) = self.active else {
            return;
        };

        let (w, h) = (active.size.0 as f64, active.size.1 as f64);
        let mut next = self.pointer;
        if (0.0..w).contains(&(next.x + dx)) {
            next.x += dx;
        }
        if (0.0..h).contains(&(next.y + dy)) {
            next.y += dy;
        }
        if next == self.pointer {
            return;
        }
        self.on_pointer_motion(Point::new(next.x, next.y));
        self.needs_redraw = true;
    }
}
