// Layer-shell configure/close events. The ack for a configure is held back until
// the monitor's screen copy has landed; see `WaylandState::try_ack`.
use log::info;
use wayland_client::{Connection, Dispatch, QueueHandle};
use wayland_protocols_wlr::layer_shell::v1::client::{
    zwlr_layer_shell_v1::{self, ZwlrLayerShellV1},
    zwlr_layer_surface_v1::{self, ZwlrLayerSurfaceV1},
};

use super::super::state::WaylandState;
use crate::input::SessionExit;

impl Dispatch<ZwlrLayerShellV1, ()> for WaylandState {
    fn event(
        _state: &mut Self,
        _proxy: &ZwlrLayerShellV1,
        _event: zwlr_layer_shell_v1::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<ZwlrLayerSurfaceV1, u32> for WaylandState {
    fn event(
        state: &mut Self,
        _proxy: &ZwlrLayerSurfaceV1,
        event: zwlr_layer_surface_v1::Event,
        monitor_id: &u32,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        let Some(index) = state.monitor_index(*monitor_id) else {
            return;
        };
        match event {
            zwlr_layer_surface_v1::Event::Configure {
                serial,
                width,
                height,
            } => {
                let fractional_enabled = state.fractional_enabled();
                let monitor = &mut state.monitors[index];
                info!(
                    "Layer surface for {} configured: {}x{}",
                    monitor.name, width, height
                );
                let scale = monitor.effective_scale(fractional_enabled);
                monitor.lifecycle.on_configure(serial, (width, height), scale);
                state.try_ack(index);
            }
            zwlr_layer_surface_v1::Event::Closed => {
                info!(
                    "Layer surface for {} closed by compositor",
                    state.monitors[index].name
                );
                state.input_state.request_exit(SessionExit::Closed);
            }
            _ => {}
        }
    }
}
