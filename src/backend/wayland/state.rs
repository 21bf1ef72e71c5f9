// Holds the live Wayland protocol state shared by the backend loop and the handler
// submodules; owns the monitors and routes input, recognition and rendering between them.
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use smithay_client_toolkit::{
    compositor::CompositorState, output::OutputState, registry::RegistryState, seat::SeatState,
    shm::Shm,
};
use wayland_client::{
    Proxy, QueueHandle,
    protocol::{wl_keyboard, wl_output, wl_pointer, wl_shm, wl_surface},
};
use wayland_protocols::wp::{
    cursor_shape::v1::client::{
        wp_cursor_shape_device_v1::WpCursorShapeDeviceV1,
        wp_cursor_shape_manager_v1::WpCursorShapeManagerV1,
    },
    fractional_scale::v1::client::wp_fractional_scale_manager_v1::WpFractionalScaleManagerV1,
    viewporter::client::wp_viewporter::WpViewporter,
};
use wayland_protocols_wlr::{
    layer_shell::v1::client::{
        zwlr_layer_shell_v1::{Layer, ZwlrLayerShellV1},
        zwlr_layer_surface_v1::{Anchor, KeyboardInteractivity},
    },
    screencopy::v1::client::zwlr_screencopy_manager_v1::ZwlrScreencopyManagerV1,
};

use super::monitor::Monitor;
use super::overlay::OverlayLifecycle;
use super::screencopy::CaptureState;
use super::shm::{BufferSlot, BufferTag};
use crate::{
    backend::SessionError,
    clipboard,
    config::Config,
    draw::{MonitorView, Scene, render_scene},
    input::{CapturedRegion, InputState, PendingAction, SessionExit},
    notification,
    recognition::{RecognitionManager, RecognitionOutcome},
    util::{self, Rect},
};

const MAX_RENDER_FAILURES: u32 = 10;
const LAYER_NAMESPACE: &str = "wayscan";

/// Events delivered into the dispatch loop from other threads.
#[derive(Debug)]
pub(super) enum SessionEvent {
    Recognition(RecognitionOutcome),
    /// A termination signal arrived.
    Terminate(i32),
}

/// Globals bound directly through wayland-protocols.
pub(super) struct Globals {
    pub(super) layer_shell: ZwlrLayerShellV1,
    pub(super) screencopy: ZwlrScreencopyManagerV1,
    pub(super) fractional_scale: Option<WpFractionalScaleManagerV1>,
    pub(super) viewporter: Option<WpViewporter>,
    pub(super) cursor_shape: Option<WpCursorShapeManagerV1>,
}

/// Internal Wayland state shared across modules.
pub(super) struct WaylandState {
    // Wayland protocol objects
    pub(super) registry_state: RegistryState,
    pub(super) compositor_state: CompositorState,
    pub(super) shm: Shm,
    pub(super) output_state: OutputState,
    pub(super) seat_state: SeatState,
    pub(super) globals: Globals,

    // Input devices
    pub(super) pointer: Option<wl_pointer::WlPointer>,
    pub(super) cursor_device: Option<WpCursorShapeDeviceV1>,
    pub(super) keyboard: Option<wl_keyboard::WlKeyboard>,

    // One overlay per output, in discovery order
    pub(super) monitors: Vec<Monitor>,
    next_monitor_id: u32,

    pub(super) config: Config,
    pub(super) input_state: InputState,
    recognition: RecognitionManager,
    pub(super) tokio_handle: tokio::runtime::Handle,

    fatal: Option<SessionError>,
    consecutive_render_failures: u32,
}

impl WaylandState {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        registry_state: RegistryState,
        compositor_state: CompositorState,
        shm: Shm,
        output_state: OutputState,
        seat_state: SeatState,
        globals: Globals,
        config: Config,
        input_state: InputState,
        recognition: RecognitionManager,
        tokio_handle: tokio::runtime::Handle,
    ) -> Self {
        Self {
            registry_state,
            compositor_state,
            shm,
            output_state,
            seat_state,
            globals,
            pointer: None,
            cursor_device: None,
            keyboard: None,
            monitors: Vec::new(),
            next_monitor_id: 0,
            config,
            input_state,
            recognition,
            tokio_handle,
            fatal: None,
            consecutive_render_failures: 0,
        }
    }

    /// Records a fatal condition; the loop tears down and exits with status 1.
    pub(super) fn fail(&mut self, err: SessionError) {
        error!("{}", err);
        if self.fatal.is_none() {
            self.fatal = Some(err);
        }
    }

    pub(super) fn take_fatal(&mut self) -> Option<SessionError> {
        self.fatal.take()
    }

    pub(super) fn exit_requested(&self) -> Option<SessionExit> {
        self.input_state.exit_requested()
    }

    pub(super) fn should_stop(&self) -> bool {
        self.fatal.is_some() || self.exit_requested().is_some()
    }

    pub(super) fn fractional_enabled(&self) -> bool {
        self.config.capture.fractional_scaling
            && self.globals.fractional_scale.is_some()
            && self.globals.viewporter.is_some()
    }

    pub(super) fn monitor_index_for_surface(&self, surface: &wl_surface::WlSurface) -> Option<usize> {
        self.monitors.iter().position(|m| &m.surface == surface)
    }

    pub(super) fn monitor_index(&self, id: u32) -> Option<usize> {
        self.monitors.iter().position(|m| m.id == id)
    }

    fn output_name(&self, output: &wl_output::WlOutput, id: u32) -> String {
        let Some(info) = self.output_state.info(output) else {
            return format!("id{}", id);
        };
        info.name
            .filter(|name| !name.is_empty())
            .or_else(|| (!info.model.is_empty()).then(|| info.model.clone()))
            .unwrap_or_else(|| format!("id{}", info.id))
    }

    /// Creates the overlay for a newly discovered output and requests its
    /// one and only screen copy.
    pub(super) fn add_monitor(&mut self, output: wl_output::WlOutput, qh: &QueueHandle<Self>) {
        if self.monitors.iter().any(|m| m.output == output) {
            return;
        }
        let id = self.next_monitor_id;
        self.next_monitor_id += 1;

        let name = self.output_name(&output, id);
        let integer_scale = self
            .output_state
            .info(&output)
            .map(|info| info.scale_factor)
            .unwrap_or(1);

        let surface = self.compositor_state.create_surface(qh);
        let layer = self.globals.layer_shell.get_layer_surface(
            &surface,
            Some(&output),
            Layer::Overlay,
            LAYER_NAMESPACE.to_string(),
            qh,
            id,
        );
        layer.set_anchor(Anchor::Top | Anchor::Bottom | Anchor::Left | Anchor::Right);
        layer.set_exclusive_zone(-1);
        layer.set_keyboard_interactivity(KeyboardInteractivity::Exclusive);
        layer.set_size(0, 0);

        let (viewport, fractional) = if self.fractional_enabled() {
            match (&self.globals.viewporter, &self.globals.fractional_scale) {
                (Some(viewporter), Some(manager)) => (
                    Some(viewporter.get_viewport(&surface, qh, ())),
                    Some(manager.get_fractional_scale(&surface, qh, id)),
                ),
                _ => (None, None),
            }
        } else {
            (None, None)
        };
        surface.commit();

        let frame = self.globals.screencopy.capture_output(
            i32::from(self.config.capture.overlay_cursor),
            &output,
            qh,
            id,
        );

        info!(
            "Monitor {} ({}) discovered, scale {}",
            id, name, integer_scale
        );
        self.monitors.push(Monitor {
            id,
            name,
            output,
            integer_scale,
            fractional_scale: None,
            surface,
            layer,
            viewport,
            fractional,
            lifecycle: OverlayLifecycle::new(),
            buffers: [None, None],
            retired: Vec::new(),
            capture: CaptureState::new(frame),
            frozen: None,
            frozen_surface: None,
        });
    }

    pub(super) fn remove_monitor(&mut self, output: &wl_output::WlOutput) {
        if let Some(index) = self.monitors.iter().position(|m| &m.output == output) {
            let mut monitor = self.monitors.remove(index);
            info!("Monitor {} removed", monitor.name);
            self.input_state.on_pointer_leave(monitor.id);
            monitor.destroy();
        }
    }

    /// Sends the held-back configure ack once the monitor is frozen.
    pub(super) fn try_ack(&mut self, index: usize) {
        let fractional_enabled = self.fractional_enabled();
        let Some(monitor) = self.monitors.get_mut(index) else {
            return;
        };
        let Some(plan) = monitor.lifecycle.take_ack() else {
            return;
        };
        debug!(
            "Monitor {}: ack configure {} ({}x{} px)",
            monitor.name, plan.serial, plan.pixel_size.0, plan.pixel_size.1
        );
        monitor.layer.ack_configure(plan.serial);
        monitor.apply_buffer_scale(fractional_enabled);
        if !plan.reallocate {
            return;
        }
        if let Err(err) = monitor.replace_buffers(plan.pixel_size) {
            self.fail(SessionError::FatalInit(err.to_string()));
        }
    }

    /// Re-evaluates buffer size after a scale change.
    pub(super) fn rescale(&mut self, index: usize) {
        let fractional_enabled = self.fractional_enabled();
        let Some(monitor) = self.monitors.get_mut(index) else {
            return;
        };
        let scale = monitor.effective_scale(fractional_enabled);
        if let Some(size) = monitor.lifecycle.rescale(scale) {
            debug!("Monitor {}: rescaled to {}", monitor.name, scale);
            monitor.apply_buffer_scale(fractional_enabled);
            if let Err(err) = monitor.replace_buffers(size) {
                self.fail(SessionError::FatalInit(err.to_string()));
            }
        }
    }

    pub(super) fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Recognition(outcome) => {
                self.input_state.on_recognition_complete(
                    outcome.kind,
                    outcome.generation,
                    outcome.result,
                );
            }
            SessionEvent::Terminate(signal) => {
                info!("Received signal {}, closing", signal);
                self.input_state.request_exit(SessionExit::Closed);
            }
        }
    }

    /// Performs the work input handling queued, then turns the redraw flag
    /// into per-overlay redraw requests.
    pub(super) fn process_pending(&mut self) {
        loop {
            let pending = self.input_state.take_pending();
            if pending.is_empty() {
                break;
            }
            for action in pending {
                match action {
                    PendingAction::Commit { monitor, rect } => self.commit_selection(monitor, rect),
                    PendingAction::Recognize(request) => {
                        let (kind, generation) = (request.kind, request.generation);
                        if let Err(err) = self.recognition.submit(request) {
                            self.input_state.on_recognition_complete(
                                kind,
                                generation,
                                Err(err.to_string()),
                            );
                        }
                    }
                    PendingAction::CopyText(text) => {
                        clipboard::copy_text_async(&self.tokio_handle, text)
                    }
                    PendingAction::Notify(text) => {
                        notification::notify_text_async(&self.tokio_handle, text)
                    }
                }
            }
        }

        if self.input_state.needs_redraw {
            for monitor in &mut self.monitors {
                monitor.lifecycle.request_redraw();
            }
            self.input_state.needs_redraw = false;
        }
    }

    /// Crops the committed rectangle out of the monitor's frozen image and
    /// opens the action menu.
    fn commit_selection(&mut self, monitor_id: u32, rect: Rect) {
        let Some(monitor) = self.monitors.iter().find(|m| m.id == monitor_id) else {
            return;
        };
        let Some(frozen) = &monitor.frozen else {
            warn!("Monitor {}: selection before screen copy", monitor.name);
            return;
        };
        let logical = monitor.lifecycle.logical_size();
        let Some(scale) = util::scale_between((frozen.width(), frozen.height()), logical) else {
            return;
        };
        let Some(pixel_rect) = util::logical_to_pixels(rect, scale) else {
            return;
        };
        debug!(
            "Cropping {:?} from {}x{} frame (scale {:.3}x{:.3})",
            pixel_rect,
            frozen.width(),
            frozen.height(),
            scale.0,
            scale.1
        );

        let png = match frozen.crop(pixel_rect).and_then(|image| image.encode_png()) {
            Ok(png) => png,
            Err(err) => {
                warn!("Could not export selection: {}", err);
                return;
            }
        };
        self.input_state.open_menu(
            CapturedRegion {
                monitor: monitor_id,
                png: std::sync::Arc::new(png),
                anchor: rect.min(),
            },
            logical,
        );
    }

    /// Renders every overlay that is dirty and has a free buffer.
    pub(super) fn render_dirty(&mut self, qh: &QueueHandle<Self>) {
        let mut rendered = false;
        for index in 0..self.monitors.len() {
            if !self.monitors[index].lifecycle.wants_render() {
                continue;
            }
            match self.render(index, qh) {
                Ok(true) => {
                    rendered = true;
                    self.consecutive_render_failures = 0;
                }
                Ok(false) => {}
                Err(e) => {
                    self.monitors[index].lifecycle.abort_render();
                    self.consecutive_render_failures += 1;
                    warn!(
                        "Rendering error (attempt {}/{}): {:#}",
                        self.consecutive_render_failures, MAX_RENDER_FAILURES, e
                    );
                    if self.consecutive_render_failures >= MAX_RENDER_FAILURES {
                        self.fail(SessionError::FatalInit(format!(
                            "too many consecutive render failures: {:#}",
                            e
                        )));
                        return;
                    }
                }
            }
        }
        if rendered {
            self.input_state.frame_rendered();
        }
    }

    /// Paints one overlay into its free buffer and commits it. Returns
    /// `false` when the frame was skipped.
    fn render(&mut self, index: usize, qh: &QueueHandle<Self>) -> Result<bool> {
        let render_inactive = self.config.capture.render_inactive;
        let monitor = &mut self.monitors[index];
        let busy = monitor.busy_slots();
        let Some(slot) = monitor.lifecycle.begin_render(busy) else {
            return Ok(false);
        };

        let view = MonitorView {
            id: monitor.id,
            logical_size: monitor.lifecycle.logical_size(),
            frozen_size: monitor.frozen_size(),
        };
        let scene = Scene::build(&self.input_state, &view, render_inactive);
        paint_and_commit(monitor, slot, &scene, self.shm.wl_shm(), qh)?;
        monitor.lifecycle.finish_render();
        Ok(true)
    }

    /// Releases compositor-side resources, children before parents.
    pub(super) fn teardown(&mut self) {
        info!("Tearing down {} overlay(s)", self.monitors.len());
        for mut monitor in self.monitors.drain(..) {
            monitor.destroy();
        }
        if let Some(device) = self.cursor_device.take() {
            device.destroy();
        }
        if let Some(pointer) = self.pointer.take() {
            if pointer.version() >= 3 {
                pointer.release();
            }
        }
        if let Some(keyboard) = self.keyboard.take() {
            if keyboard.version() >= 3 {
                keyboard.release();
            }
        }
        if let Some(manager) = self.globals.cursor_shape.take() {
            manager.destroy();
        }
        if let Some(manager) = self.globals.fractional_scale.take() {
            manager.destroy();
        }
        if let Some(viewporter) = self.globals.viewporter.take() {
            viewporter.destroy();
        }
        self.globals.screencopy.destroy();
        self.globals.layer_shell.destroy();
    }
}

fn paint_and_commit(
    monitor: &mut Monitor,
    slot: usize,
    scene: &Scene,
    shm: &wl_shm::WlShm,
    qh: &QueueHandle<WaylandState>,
) -> Result<()> {
    let logical = monitor.lifecycle.logical_size();
    let buffer = monitor.buffers[slot]
        .as_mut()
        .context("Render buffer not allocated")?;
    let (width, height, stride) = (buffer.width(), buffer.height(), buffer.stride());

    {
        let pixels = buffer.pixels_mut().context("Render buffer still busy")?;
        // SAFETY: `pixels` is the mapped region of exactly `stride * height` bytes
        // in ARGB8888, matching the format/stride passed to Cairo. The surface and
        // context are dropped at the end of this block, before the buffer is
        // handed to the compositor, and nothing else touches the mapping meanwhile.
        let cairo_surface = unsafe {
            cairo::ImageSurface::create_for_data_unsafe(
                pixels.as_mut_ptr(),
                cairo::Format::ARgb32,
                width as i32,
                height as i32,
                stride as i32,
            )
            .context("Failed to create Cairo surface")?
        };
        let ctx = cairo::Context::new(&cairo_surface).context("Failed to create Cairo context")?;
        render_scene(
            &ctx,
            scene,
            monitor.frozen_surface.as_ref(),
            logical,
            (width, height),
        )
        .context("Failed to paint overlay")?;
        cairo_surface.flush();
    }

    let tag = BufferTag {
        monitor: monitor.id,
        slot: BufferSlot::Render(slot),
    };
    let wl_buffer = buffer.wl_buffer(shm, qh, tag)?.clone();
    monitor.surface.attach(Some(&wl_buffer), 0, 0);
    monitor
        .surface
        .damage_buffer(0, 0, width as i32, height as i32);
    monitor.surface.frame(qh, monitor.surface.clone());
    monitor.surface.commit();
    buffer.mark_busy();
    Ok(())
}
