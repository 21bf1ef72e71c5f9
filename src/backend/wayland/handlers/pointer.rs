// Feeds pointer events into `InputState`, tagging enter events with the monitor
// whose overlay the pointer is over.
use log::debug;
use smithay_client_toolkit::seat::pointer::{
    BTN_LEFT, BTN_MIDDLE, BTN_RIGHT, PointerEvent, PointerEventKind, PointerHandler,
};
use wayland_client::{Connection, QueueHandle, protocol::wl_pointer};
use wayland_protocols::wp::cursor_shape::v1::client::wp_cursor_shape_device_v1::Shape;

use crate::input::{ActiveMonitor, MouseButton};
use crate::util::Point;

use super::super::state::WaylandState;

fn map_button(button: u32) -> Option<MouseButton> {
    match button {
        BTN_LEFT => Some(MouseButton::Left),
        BTN_MIDDLE => Some(MouseButton::Middle),
        BTN_RIGHT => Some(MouseButton::Right),
        _ => None,
    }
}

impl PointerHandler for WaylandState {
    fn pointer_frame(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _pointer: &wl_pointer::WlPointer,
        events: &[PointerEvent],
    ) {
        for event in events {
            let pos = Point::new(event.position.0, event.position.1);
            match event.kind {
                PointerEventKind::Enter { serial } => {
                    let Some(index) = self.monitor_index_for_surface(&event.surface) else {
                        continue;
                    };
                    let monitor = &self.monitors[index];
                    debug!(
                        "Pointer entered {} at ({:.0}, {:.0})",
                        monitor.name, pos.x, pos.y
                    );
                    let active = ActiveMonitor {
                        id: monitor.id,
                        size: monitor.lifecycle.logical_size(),
                    };
                    self.input_state.on_pointer_enter(active, pos);
                    if let Some(device) = &self.cursor_device {
                        device.set_shape(serial, Shape::Crosshair);
                    }
                }
                PointerEventKind::Leave { .. } => {
                    if let Some(index) = self.monitor_index_for_surface(&event.surface) {
                        debug!("Pointer left {}", self.monitors[index].name);
                        let id = self.monitors[index].id;
                        self.input_state.on_pointer_leave(id);
                    }
                }
                PointerEventKind::Motion { .. } => {
                    self.input_state.on_pointer_motion(pos);
                }
                PointerEventKind::Press { button, .. } => {
                    debug!("Button {} pressed at ({:.0}, {:.0})", button, pos.x, pos.y);
                    if let Some(button) = map_button(button) {
                        self.input_state.on_pointer_motion(pos);
                        self.input_state.on_button_press(button);
                    }
                }
                PointerEventKind::Release { button, .. } => {
                    debug!("Button {} released", button);
                    if let Some(button) = map_button(button) {
                        self.input_state.on_pointer_motion(pos);
                        self.input_state.on_button_release(button);
                    }
                }
                PointerEventKind::Axis { .. } => {}
            }
        }
    }
}
