//! Selection rectangle and drag state machine.
//!
//! A gesture starts with [`Selection::press`], is updated by
//! [`Selection::motion`] and ends with [`Selection::release`]. During a drag
//! the two endpoints may cross; they are only normalized on release.

use crate::util::{Point, Rect};

/// Pointer distance within which a corner handle is grabbed.
pub const HANDLE_RADIUS: f64 = 20.0;

/// Smallest committed width/height; smaller gestures are plain clicks.
pub const MIN_SELECTION: f64 = 5.0;

/// Interpretation of pointer motion for the current gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragMode {
    #[default]
    None,
    Creating,
    Moving,
    ResizingTopLeft,
    ResizingTopRight,
    ResizingBottomLeft,
    ResizingBottomRight,
}

/// What a button press turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    /// A new rectangle was started; earlier results are obsolete.
    Started,
    /// An existing rectangle is being moved or resized.
    Adjusting,
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    mode: DragMode,
    start: Point,
    end: Point,
    drag_offset: Point,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> DragMode {
        self.mode
    }

    pub fn is_dragging(&self) -> bool {
        self.mode != DragMode::None
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn end(&self) -> Point {
        self.end
    }

    /// The normalized rectangle between the endpoints.
    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.start, self.end)
    }

    /// Whether there is anything to draw.
    pub fn is_visible(&self) -> bool {
        self.is_dragging() || self.start != self.end
    }

    /// Starts a gesture at `pos`.
    ///
    /// Corner handles win over the interior, which wins over starting afresh.
    /// Corners are tested top-left, top-right, bottom-left, bottom-right.
    pub fn press(&mut self, pos: Point) -> PressOutcome {
        let rect = self.rect();
        let min = rect.min();
        let max = rect.max();

        let handles = [
            (min, DragMode::ResizingTopLeft),
            (Point::new(max.x, min.y), DragMode::ResizingTopRight),
            (Point::new(min.x, max.y), DragMode::ResizingBottomLeft),
            (max, DragMode::ResizingBottomRight),
        ];

        if let Some((_, mode)) = handles
            .iter()
            .find(|(corner, _)| pos.distance(*corner) < HANDLE_RADIUS)
        {
            // Resizing drags the stored endpoints, so they must match the
            // corners they stand for.
            self.start = min;
            self.end = max;
            self.mode = *mode;
            return PressOutcome::Adjusting;
        }

        if rect.contains_strict(pos) {
            self.start = min;
            self.end = max;
            self.mode = DragMode::Moving;
            self.drag_offset = pos - min;
            return PressOutcome::Adjusting;
        }

        self.mode = DragMode::Creating;
        self.start = pos;
        self.end = pos;
        PressOutcome::Started
    }

    /// Updates the active gesture. Returns `true` when the rectangle changed.
    pub fn motion(&mut self, pos: Point) -> bool {
        match self.mode {
            DragMode::None => return false,
            DragMode::Creating | DragMode::ResizingBottomRight => self.end = pos,
            DragMode::ResizingTopLeft => self.start = pos,
            DragMode::Moving => {
                let rect = self.rect();
                self.start = pos - self.drag_offset;
                self.end = Point::new(self.start.x + rect.width, self.start.y + rect.height);
            }
            DragMode::ResizingTopRight => {
                self.start.y = pos.y;
                self.end.x = pos.x;
            }
            DragMode::ResizingBottomLeft => {
                self.start.x = pos.x;
                self.end.y = pos.y;
            }
        }
        true
    }

    /// Ends the gesture, normalizing the endpoints.
    ///
    /// Returns the committed rectangle, or `None` when no gesture was active
    /// or the result is below [`MIN_SELECTION`] on either axis.
    pub fn release(&mut self) -> Option<Rect> {
        if self.mode == DragMode::None {
            return None;
        }
        self.mode = DragMode::None;
        let rect = self.rect();
        self.start = rect.min();
        self.end = rect.max();

        if rect.width < MIN_SELECTION || rect.height < MIN_SELECTION {
            log::debug!(
                "Selection {:.1}x{:.1} below threshold, ignoring",
                rect.width,
                rect.height
            );
            return None;
        }
        Some(rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drag(selection: &mut Selection, from: (f64, f64), to: (f64, f64)) -> Option<Rect> {
        selection.press(Point::new(from.0, from.1));
        selection.motion(Point::new(to.0, to.1));
        selection.release()
    }

    #[test]
    fn creating_commits_normalized_rect() {
        let mut selection = Selection::new();
        let rect = drag(&mut selection, (400.0, 300.0), (100.0, 100.0));
        assert_eq!(rect, Some(Rect::new(100.0, 100.0, 300.0, 200.0)));
        assert_eq!(selection.start(), Point::new(100.0, 100.0));
        assert_eq!(selection.end(), Point::new(400.0, 300.0));
        assert_eq!(selection.mode(), DragMode::None);
    }

    #[test]
    fn tiny_gesture_is_discarded() {
        let mut selection = Selection::new();
        assert_eq!(drag(&mut selection, (10.0, 10.0), (13.0, 13.0)), None);
        assert_eq!(drag(&mut selection, (50.0, 50.0), (150.0, 54.9)), None);
    }

    #[test]
    fn corner_press_enters_resize_mode() {
        let mut selection = Selection::new();
        drag(&mut selection, (100.0, 100.0), (400.0, 300.0));

        selection.press(Point::new(105.0, 95.0));
        assert_eq!(selection.mode(), DragMode::ResizingTopLeft);
        selection.release();

        selection.press(Point::new(398.0, 102.0));
        assert_eq!(selection.mode(), DragMode::ResizingTopRight);
        selection.release();

        selection.press(Point::new(101.0, 301.0));
        assert_eq!(selection.mode(), DragMode::ResizingBottomLeft);
        selection.release();

        selection.press(Point::new(410.0, 310.0));
        assert_eq!(selection.mode(), DragMode::ResizingBottomRight);
    }

    #[test]
    fn handle_wins_over_interior_on_small_rects() {
        let mut selection = Selection::new();
        drag(&mut selection, (0.0, 0.0), (10.0, 10.0));
        assert_eq!(selection.press(Point::new(5.0, 5.0)), PressOutcome::Adjusting);
        assert_eq!(selection.mode(), DragMode::ResizingTopLeft);
    }

    #[test]
    fn top_right_resize_moves_two_coordinates() {
        let mut selection = Selection::new();
        drag(&mut selection, (100.0, 100.0), (400.0, 300.0));
        selection.press(Point::new(400.0, 100.0));
        selection.motion(Point::new(450.0, 80.0));
        let rect = selection.release().unwrap();
        assert_eq!(rect, Rect::new(100.0, 80.0, 350.0, 220.0));
    }

    #[test]
    fn bottom_left_resize_can_invert() {
        let mut selection = Selection::new();
        drag(&mut selection, (100.0, 100.0), (400.0, 300.0));
        selection.press(Point::new(100.0, 300.0));
        selection.motion(Point::new(500.0, 50.0));
        let rect = selection.release().unwrap();
        assert_eq!(rect, Rect::new(400.0, 50.0, 100.0, 50.0));
    }

    #[test]
    fn moving_preserves_size_and_allows_overshoot() {
        let mut selection = Selection::new();
        drag(&mut selection, (100.0, 100.0), (400.0, 300.0));
        assert_eq!(selection.press(Point::new(200.0, 200.0)), PressOutcome::Adjusting);
        assert_eq!(selection.mode(), DragMode::Moving);
        selection.motion(Point::new(50.0, 120.0));
        let rect = selection.release().unwrap();
        assert_eq!(rect, Rect::new(-50.0, 20.0, 300.0, 200.0));
    }

    #[test]
    fn press_outside_starts_fresh() {
        let mut selection = Selection::new();
        drag(&mut selection, (100.0, 100.0), (400.0, 300.0));
        assert_eq!(selection.press(Point::new(700.0, 700.0)), PressOutcome::Started);
        assert_eq!(selection.mode(), DragMode::Creating);
        assert_eq!(selection.start(), selection.end());
    }

    #[test]
    fn motion_without_gesture_is_ignored() {
        let mut selection = Selection::new();
        assert!(!selection.motion(Point::new(5.0, 5.0)));
        assert_eq!(selection.release(), None);
        assert!(!selection.is_visible());
    }
}
