use std::sync::Arc;

use wayscan::input::{
    ActiveMonitor, CapturedRegion, InputOptions, InputState, Menu, MouseButton, PendingAction,
    READY_MESSAGE,
};
use wayscan::pixels::CanonicalImage;
use wayscan::recognition::ProviderKind;
use wayscan::util::{self, Point, Rect};

const MONITOR: ActiveMonitor = ActiveMonitor {
    id: 3,
    size: (200, 100),
};

fn drag(state: &mut InputState, from: (f64, f64), to: (f64, f64)) {
    state.on_pointer_motion(Point::new(from.0, from.1));
    state.on_button_press(MouseButton::Left);
    state.on_pointer_motion(Point::new(to.0, to.1));
    state.on_button_release(MouseButton::Left);
}

/// A 400x200 frame (scale 2) whose pixels encode their own coordinates.
fn frozen_frame() -> CanonicalImage {
    let (width, height) = (400u32, 200u32);
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[(x % 256) as u8, (y % 256) as u8, 0, 255]);
        }
    }
    CanonicalImage::new(width, height, data, false).unwrap()
}

#[test]
fn committed_selection_crops_scaled_frame_and_opens_menu() {
    let mut state = InputState::new(InputOptions::default());
    state.on_pointer_enter(MONITOR, Point::new(0.0, 0.0));
    drag(&mut state, (110.0, 60.0), (10.0, 10.0));

    let pending = state.take_pending();
    let [PendingAction::Commit { monitor, rect }] = pending.as_slice() else {
        panic!("expected one commit, got {:?}", pending);
    };
    assert_eq!(*monitor, MONITOR.id);
    assert_eq!(*rect, Rect::new(10.0, 10.0, 100.0, 50.0));

    let frame = frozen_frame();
    let scale = util::scale_between((frame.width(), frame.height()), MONITOR.size).unwrap();
    let pixel_rect = util::logical_to_pixels(*rect, scale).unwrap();
    let crop = frame.crop(pixel_rect).unwrap();
    assert_eq!((crop.width(), crop.height()), (200, 100));
    // Top-left pixel of the crop is frame pixel (20, 20).
    assert_eq!(&crop.data()[..2], &[20, 20]);

    let png = crop.encode_png().unwrap();
    assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));

    state.open_menu(
        CapturedRegion {
            monitor: MONITOR.id,
            png: Arc::new(png),
            anchor: rect.min(),
        },
        MONITOR.size,
    );
    assert!(state.menu().is_visible());
    assert_eq!(state.result_text(), READY_MESSAGE);
}

#[test]
fn menu_near_bottom_right_corner_shifts_inside_monitor() {
    let monitor = ActiveMonitor {
        id: 0,
        size: (1920, 1080),
    };
    let mut state = InputState::new(InputOptions::default());
    state.on_pointer_enter(monitor, Point::new(0.0, 0.0));
    drag(&mut state, (1700.0, 900.0), (1900.0, 1050.0));
    assert_eq!(state.take_pending().len(), 1);

    state.open_menu(
        CapturedRegion {
            monitor: monitor.id,
            png: Arc::new(Vec::new()),
            anchor: Point::new(1700.0, 900.0),
        },
        monitor.size,
    );
    let bounds = state.menu().bounds();
    assert!(bounds.max().x <= 1920.0);
    assert!(bounds.max().y <= 1080.0);
    assert!(bounds.x >= 0.0 && bounds.y >= 0.0);
}

#[test]
fn tiny_gesture_is_discarded() {
    let mut state = InputState::new(InputOptions::default());
    state.on_pointer_enter(MONITOR, Point::new(50.0, 50.0));
    drag(&mut state, (50.0, 50.0), (53.0, 53.0));
    assert!(state.take_pending().is_empty());
    assert!(!state.menu().is_visible());
}

#[test]
fn auto_provider_requests_recognition_on_commit() {
    let mut state = InputState::new(InputOptions {
        auto_provider: Some(ProviderKind::Tesseract),
        ..InputOptions::default()
    });
    state.on_pointer_enter(MONITOR, Point::new(0.0, 0.0));
    drag(&mut state, (10.0, 10.0), (60.0, 40.0));
    assert_eq!(state.take_pending().len(), 1);

    state.open_menu(
        CapturedRegion {
            monitor: MONITOR.id,
            png: Arc::new(vec![1, 2, 3]),
            anchor: Point::new(10.0, 10.0),
        },
        MONITOR.size,
    );
    match state.take_pending().as_slice() {
        [PendingAction::Recognize(request)] => {
            assert_eq!(request.kind, ProviderKind::Tesseract);
            assert_eq!(request.generation, state.generation());
        }
        other => panic!("unexpected actions: {:?}", other),
    }
}

#[test]
fn menu_lists_every_provider_then_copy_and_close() {
    let menu = Menu::new(&ProviderKind::ALL);
    let labels: Vec<_> = menu.actions().iter().map(|a| a.label()).collect();
    assert_eq!(
        labels,
        [
            "Tesseract",
            "PaddleOCR",
            "Ollama AI",
            "Gemini AI",
            "Copy",
            "Close"
        ]
    );
}
