//! Declarative description of one overlay frame.
//!
//! [`Scene::build`] decides *what* a monitor shows from the input state; the
//! painter in [`super::render`] only turns it into pixels.

use crate::input::{InputState, MenuButton};
use crate::util::{Rect, scale_between};

/// Per-monitor facts the scene depends on.
#[derive(Debug, Clone, Copy)]
pub struct MonitorView {
    pub id: u32,
    pub logical_size: (u32, u32),
    /// Pixel size of the frozen image, when captured.
    pub frozen_size: Option<(u32, u32)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuScene {
    pub bounds: Rect,
    pub buttons: Vec<MenuButton>,
    pub result_area: Rect,
    pub text: String,
}

/// Everything drawn on one overlay, in logical coordinates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    pub show_frozen: bool,
    pub selection: Option<Rect>,
    pub highlights: Vec<Rect>,
    pub menu: Option<MenuScene>,
}

impl Scene {
    pub fn build(input: &InputState, monitor: &MonitorView, render_inactive: bool) -> Self {
        let active = input
            .active_monitor()
            .is_some_and(|active| active.id == monitor.id);

        let mut scene = Scene {
            show_frozen: monitor.frozen_size.is_some() && (active || render_inactive),
            ..Scene::default()
        };
        if !scene.show_frozen {
            return scene;
        }

        if active && input.selection().is_visible() {
            scene.selection = Some(input.selection().rect());
        }

        let owns_menu = input
            .captured()
            .is_some_and(|captured| captured.monitor == monitor.id);
        if !owns_menu || !input.menu().is_visible() {
            return scene;
        }

        // Result boxes are in frozen-image pixels; the ratio is recomputed
        // for every frame.
        let scale = monitor
            .frozen_size
            .and_then(|frozen| scale_between(frozen, monitor.logical_size));
        if let (Some(captured), Some(scale)) = (input.captured(), scale) {
            scene.highlights = input
                .results()
                .iter()
                .filter_map(|result| result.project(captured.anchor, scale))
                .collect();
        }

        let menu = input.menu();
        scene.menu = Some(MenuScene {
            bounds: menu.bounds(),
            buttons: menu.buttons(),
            result_area: menu.result_area(),
            text: input.result_text().to_string(),
        });
        scene
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::input::{ActiveMonitor, CapturedRegion, InputOptions, MouseButton};
    use crate::recognition::{ProviderKind, RecognitionResult};
    use crate::util::Point;

    fn view(id: u32) -> MonitorView {
        MonitorView {
            id,
            logical_size: (1920, 1080),
            frozen_size: Some((2400, 1350)),
        }
    }

    fn state_with_results() -> InputState {
        let mut input = InputState::new(InputOptions::default());
        input.on_pointer_enter(
            ActiveMonitor {
                id: 1,
                size: (1920, 1080),
            },
            Point::new(100.0, 100.0),
        );
        input.on_button_press(MouseButton::Left);
        input.on_pointer_motion(Point::new(400.0, 300.0));
        input.on_button_release(MouseButton::Left);
        input.take_pending();
        input.open_menu(
            CapturedRegion {
                monitor: 1,
                png: Arc::new(Vec::new()),
                anchor: Point::new(100.0, 100.0),
            },
            (1920, 1080),
        );
        let generation = input.generation();
        input.on_recognition_complete(
            ProviderKind::Tesseract,
            generation,
            Ok(vec![
                RecognitionResult::new("word", 25.0, 50.0, 125.0, 25.0),
                RecognitionResult::text_only("answer"),
            ]),
        );
        input
    }

    #[test]
    fn active_monitor_shows_selection_menu_and_projected_boxes() {
        let scene = Scene::build(&state_with_results(), &view(1), false);
        assert!(scene.show_frozen);
        assert_eq!(scene.selection, Some(Rect::new(100.0, 100.0, 300.0, 200.0)));
        // 1.25 px per logical unit
        assert_eq!(scene.highlights, vec![Rect::new(120.0, 140.0, 100.0, 20.0)]);
        let menu = scene.menu.unwrap();
        assert_eq!(menu.text, "word answer");
        assert_eq!(menu.buttons.len(), 6);
    }

    #[test]
    fn inactive_monitor_is_transparent_by_default() {
        let scene = Scene::build(&state_with_results(), &view(2), false);
        assert_eq!(scene, Scene::default());
    }

    #[test]
    fn inactive_monitor_shows_frozen_image_only_when_requested() {
        let scene = Scene::build(&state_with_results(), &view(2), true);
        assert!(scene.show_frozen);
        assert!(scene.selection.is_none());
        assert!(scene.menu.is_none());
    }

    #[test]
    fn nothing_is_drawn_before_capture() {
        let mut monitor = view(1);
        monitor.frozen_size = None;
        let scene = Scene::build(&state_with_results(), &monitor, true);
        assert!(!scene.show_frozen);
    }
}
