// Listens for wl_buffer release events so render buffers re-enter circulation.
use log::debug;
use wayland_client::{
    Connection, Dispatch, QueueHandle,
    protocol::{wl_buffer, wl_shm_pool},
};

use super::super::shm::{BufferSlot, BufferTag};
use super::super::state::WaylandState;

impl Dispatch<wl_buffer::WlBuffer, BufferTag> for WaylandState {
    fn event(
        state: &mut Self,
        proxy: &wl_buffer::WlBuffer,
        event: wl_buffer::Event,
        tag: &BufferTag,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        let wl_buffer::Event::Release = event else {
            return;
        };
        // The frozen copy buffer is reclaimed when the copy completes.
        let BufferSlot::Render(slot) = tag.slot else {
            return;
        };
        let Some(monitor) = state.monitors.iter_mut().find(|m| m.id == tag.monitor) else {
            return;
        };
        if monitor.release_buffer(proxy) {
            debug!("Monitor {}: buffer {} released", monitor.name, slot);
            // A render may have been skipped while this buffer was busy.
            monitor.lifecycle.request_redraw();
        }
    }
}

impl Dispatch<wl_shm_pool::WlShmPool, ()> for WaylandState {
    fn event(
        _state: &mut Self,
        _proxy: &wl_shm_pool::WlShmPool,
        _event: wl_shm_pool::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
    }
}
