//! Geometry helpers shared by the selection state machine, the crop path and
//! the renderer.
//!
//! Everything here works in one of two spaces:
//! - logical coordinates ([`Point`], [`Rect`]), as delivered by pointer events
//! - frozen-image pixel coordinates ([`PixelRect`]), used for cropping

use std::ops::{Add, Sub};

// ============================================================================
// Logical Space
// ============================================================================

/// A point in overlay-local logical coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Axis-aligned rectangle in logical coordinates with non-negative size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds the normalized rectangle spanned by two arbitrary corners.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let min_x = a.x.min(b.x);
        let min_y = a.y.min(b.y);
        let max_x = a.x.max(b.x);
        let max_y = a.y.max(b.y);
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    pub fn min(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn max(&self) -> Point {
        Point::new(self.x + self.width, self.y + self.height)
    }

    /// Inclusive containment, used for hit-testing buttons.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    /// Exclusive containment: points on the border are outside.
    pub fn contains_strict(&self, point: Point) -> bool {
        point.x > self.x
            && point.x < self.x + self.width
            && point.y > self.y
            && point.y < self.y + self.height
    }
}

// ============================================================================
// Pixel Space
// ============================================================================

/// Rectangle in frozen-image pixel coordinates.
///
/// The origin may be negative: a moved selection is allowed to overshoot the
/// monitor edge, and the crop fills the uncovered part with transparency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    /// Creates a rectangle; `None` when either dimension is zero.
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            None
        } else {
            Some(Self {
                x,
                y,
                width,
                height,
            })
        }
    }
}

/// Ratio between a pixel extent and a logical extent on each axis.
///
/// Returns `None` when the logical size is degenerate.
pub fn scale_between(pixel: (u32, u32), logical: (u32, u32)) -> Option<(f64, f64)> {
    if logical.0 == 0 || logical.1 == 0 {
        return None;
    }
    Some((
        pixel.0 as f64 / logical.0 as f64,
        pixel.1 as f64 / logical.1 as f64,
    ))
}

/// Projects a logical rectangle into pixel space, truncating each component.
pub fn logical_to_pixels(rect: Rect, scale: (f64, f64)) -> Option<PixelRect> {
    PixelRect::new(
        (rect.x * scale.0) as i32,
        (rect.y * scale.1) as i32,
        (rect.width * scale.0) as u32,
        (rect.height * scale.1) as u32,
    )
}
