//! Overlay rendering (Cairo + Pango).
//!
//! - [`Scene`]: what a monitor shows, derived from the input state
//! - [`render_scene`]: paints a scene into a buffer-backed Cairo context

pub mod color;
pub mod render;
pub mod scene;

pub use color::Color;
pub use render::render_scene;
pub use scene::{MenuScene, MonitorView, Scene};
