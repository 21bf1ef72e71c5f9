//! Action menu model: button layout, placement and hit testing.
//!
//! The renderer draws from [`Menu::buttons`] and [`Menu::result_area`], and
//! pointer presses are tested against the same boxes, so what is drawn is
//! exactly what is clickable.

use crate::recognition::ProviderKind;
use crate::util::{Point, Rect};

pub const MENU_WIDTH: f64 = 340.0;
pub const BUTTON_HEIGHT: f64 = 36.0;
pub const PADDING: f64 = 15.0;
pub const GAP: f64 = 8.0;
pub const CORNER_RADIUS: f64 = 12.0;
pub const COLUMNS: usize = 2;
pub const RESULT_AREA_HEIGHT: f64 = 130.0;
/// Space below the button grid: result area plus margins.
const FOOTER_HEIGHT: f64 = 150.0;
const RESULT_AREA_OFFSET: f64 = 10.0;

/// What a menu button does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Recognize(ProviderKind),
    Copy,
    Close,
}

impl MenuAction {
    pub fn label(self) -> &'static str {
        match self {
            MenuAction::Recognize(kind) => kind.label(),
            MenuAction::Copy => "Copy",
            MenuAction::Close => "Close",
        }
    }
}

/// A laid-out button.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuButton {
    pub action: MenuAction,
    pub bounds: Rect,
    pub pressed: bool,
}

#[derive(Debug, Clone)]
pub struct Menu {
    actions: Vec<MenuAction>,
    origin: Point,
    visible: bool,
    pressed: Option<usize>,
}

impl Menu {
    /// One button per provider, then Copy and Close.
    pub fn new(providers: &[ProviderKind]) -> Self {
        let mut actions: Vec<MenuAction> =
            providers.iter().copied().map(MenuAction::Recognize).collect();
        actions.push(MenuAction::Copy);
        actions.push(MenuAction::Close);
        Self {
            actions,
            origin: Point::default(),
            visible: false,
            pressed: None,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn actions(&self) -> &[MenuAction] {
        &self.actions
    }

    fn column_width() -> f64 {
        ((MENU_WIDTH - PADDING * 2.0 - GAP) / COLUMNS as f64).floor()
    }

    fn rows(&self) -> usize {
        self.actions.len().div_ceil(COLUMNS)
    }

    /// Offset of the first pixel below the button grid.
    fn buttons_end(&self) -> f64 {
        PADDING + self.rows() as f64 * (BUTTON_HEIGHT + GAP)
    }

    /// Full menu size in logical units.
    pub fn size(&self) -> (f64, f64) {
        (MENU_WIDTH, self.buttons_end() + FOOTER_HEIGHT)
    }

    pub fn bounds(&self) -> Rect {
        let (w, h) = self.size();
        Rect::new(self.origin.x, self.origin.y, w, h)
    }

    /// Box holding the result text.
    pub fn result_area(&self) -> Rect {
        Rect::new(
            self.origin.x + PADDING,
            self.origin.y + self.buttons_end() + RESULT_AREA_OFFSET,
            MENU_WIDTH - PADDING * 2.0,
            RESULT_AREA_HEIGHT,
        )
    }

    /// Buttons in grid order, row-major.
    pub fn buttons(&self) -> Vec<MenuButton> {
        let col_width = Self::column_width();
        self.actions
            .iter()
            .enumerate()
            .map(|(i, action)| {
                let row = (i / COLUMNS) as f64;
                let col = (i % COLUMNS) as f64;
                MenuButton {
                    action: *action,
                    bounds: Rect::new(
                        self.origin.x + PADDING + col * (col_width + GAP),
                        self.origin.y + PADDING + row * (BUTTON_HEIGHT + GAP),
                        col_width,
                        BUTTON_HEIGHT,
                    ),
                    pressed: self.pressed == Some(i),
                }
            })
            .collect()
    }

    /// Shows the menu at `pos`, shifted left/up by its own size where it
    /// would overflow a monitor of `bounds` logical size.
    pub fn open_at(&mut self, pos: Point, bounds: (u32, u32)) {
        let (w, h) = self.size();
        let mut origin = pos;
        if origin.x + w > bounds.0 as f64 {
            origin.x -= w;
        }
        if origin.y + h > bounds.1 as f64 {
            origin.y -= h;
        }
        self.origin = origin;
        self.visible = true;
        self.pressed = None;
    }

    pub fn hide(&mut self) {
        self.visible = false;
        self.pressed = None;
    }

    /// Tests a press against the buttons, recording the hit as pressed.
    pub fn hit(&mut self, pos: Point) -> Option<MenuAction> {
        if !self.visible {
            return None;
        }
        let hit = self
            .buttons()
            .iter()
            .position(|button| button.bounds.contains(pos));
        self.pressed = hit;
        hit.map(|i| self.actions[i])
    }

    /// Clears the pressed highlight after it has been drawn once.
    /// Drops the pressed highlight; `true` if one was shown.
    pub fn clear_pressed(&mut self) -> bool {
        self.pressed.take().is_some()
    }
}
