//! RGBA colors and the overlay palette.

/// An RGBA color with components in 0.0..=1.0.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub const fn gray(v: f64, a: f64) -> Self {
        Self::new(v, v, v, a)
    }

    pub fn apply(self, ctx: &cairo::Context) {
        ctx.set_source_rgba(self.r, self.g, self.b, self.a);
    }
}

// ============================================================================
// Selection
// ============================================================================

/// Dim layer painted outside the selection.
pub const DIM: Color = Color::new(0.0, 0.0, 0.0, 0.3);
pub const SELECTION_BORDER: Color = Color::gray(1.0, 1.0);
pub const HANDLE: Color = Color::gray(1.0, 0.8);
pub const HIGHLIGHT_FILL: Color = Color::gray(1.0, 0.2);
pub const HIGHLIGHT_STROKE: Color = Color::gray(1.0, 0.5);

// ============================================================================
// Menu
// ============================================================================

pub const MENU_SHADOW: Color = Color::new(0.0, 0.0, 0.0, 0.4);
pub const MENU_PANEL: Color = Color::new(0.1, 0.1, 0.12, 0.98);
pub const MENU_BORDER: Color = Color::new(0.4, 0.4, 0.45, 0.6);
pub const BUTTON: Color = Color::new(0.22, 0.22, 0.26, 1.0);
pub const BUTTON_PRESSED: Color = Color::new(0.4, 0.4, 0.5, 1.0);
pub const BUTTON_BORDER: Color = Color::new(0.5, 0.5, 0.6, 0.3);
pub const BUTTON_BORDER_PRESSED: Color = Color::new(0.7, 0.7, 0.9, 0.8);
pub const BUTTON_TEXT: Color = Color::gray(0.95, 1.0);
pub const RESULT_AREA: Color = Color::new(0.05, 0.05, 0.07, 1.0);
pub const RESULT_AREA_BORDER: Color = Color::new(0.4, 0.4, 0.5, 0.25);
pub const RESULT_TEXT: Color = Color::new(0.8, 0.8, 0.85, 1.0);
