// One overlay per output: its surface objects, render buffers and frozen image.
use log::{debug, warn};
use wayland_client::protocol::{wl_buffer, wl_output, wl_surface};
use wayland_protocols::wp::{fractional_scale::v1::client::wp_fractional_scale_v1, viewporter::client::wp_viewport};
use wayland_protocols_wlr::layer_shell::v1::client::zwlr_layer_surface_v1;

use super::overlay::OverlayLifecycle;
use super::screencopy::CaptureState;
use super::shm::{Buffer, ShmError};
use crate::pixels::{CanonicalImage, PixelFormat};

/// Denominator of `wp_fractional_scale_v1.preferred_scale`.
pub(super) const FRACTIONAL_SCALE_DENOMINATOR: f64 = 120.0;

pub(super) struct Monitor {
    pub(super) id: u32,
    pub(super) name: String,
    pub(super) output: wl_output::WlOutput,
    pub(super) integer_scale: i32,
    pub(super) fractional_scale: Option<f64>,
    pub(super) surface: wl_surface::WlSurface,
    pub(super) layer: zwlr_layer_surface_v1::ZwlrLayerSurfaceV1,
    pub(super) viewport: Option<wp_viewport::WpViewport>,
    pub(super) fractional: Option<wp_fractional_scale_v1::WpFractionalScaleV1>,
    pub(super) lifecycle: OverlayLifecycle,
    pub(super) buffers: [Option<Buffer>; 2],
    /// Replaced buffers the compositor has not released yet.
    pub(super) retired: Vec<Buffer>,
    pub(super) capture: CaptureState,
    pub(super) frozen: Option<CanonicalImage>,
    pub(super) frozen_surface: Option<cairo::ImageSurface>,
}

impl Monitor {
    /// Scale used for buffer sizing: fractional when the compositor sent one
    /// and fractional scaling is enabled, the integer output scale otherwise.
    pub(super) fn effective_scale(&self, fractional_enabled: bool) -> f64 {
        match self.fractional_scale {
            Some(scale) if fractional_enabled && self.viewport.is_some() => scale,
            _ => f64::from(self.integer_scale.max(1)),
        }
    }

    pub(super) fn frozen_size(&self) -> Option<(u32, u32)> {
        self.frozen
            .as_ref()
            .map(|image| (image.width(), image.height()))
    }

    pub(super) fn busy_slots(&self) -> [bool; 2] {
        [
            self.buffers[0].as_ref().is_some_and(Buffer::is_busy),
            self.buffers[1].as_ref().is_some_and(Buffer::is_busy),
        ]
    }

    /// Swaps in two fresh render buffers of `size` pixels. Old buffers still
    /// held by the compositor are kept until released.
    pub(super) fn replace_buffers(&mut self, size: (u32, u32)) -> Result<(), ShmError> {
        let fresh = [
            Buffer::allocate(size.0, size.1, PixelFormat::Argb8888)?,
            Buffer::allocate(size.0, size.1, PixelFormat::Argb8888)?,
        ];
        for old in std::mem::replace(&mut self.buffers, fresh.map(Some))
            .into_iter()
            .flatten()
        {
            if old.is_busy() {
                self.retired.push(old);
            }
        }
        debug!(
            "Monitor {}: render buffers now {}x{}",
            self.name, size.0, size.1
        );
        Ok(())
    }

    /// Marks the buffer behind `wl_buffer` free again. Retired buffers are
    /// dropped instead.
    pub(super) fn release_buffer(&mut self, wl_buffer: &wl_buffer::WlBuffer) -> bool {
        if let Some(pos) = self.retired.iter().position(|b| b.owns(wl_buffer)) {
            self.retired.swap_remove(pos);
            return false;
        }
        for buffer in self.buffers.iter_mut().flatten() {
            if buffer.owns(wl_buffer) {
                buffer.release();
                return true;
            }
        }
        false
    }

    /// Installs the normalized screen copy.
    pub(super) fn set_frozen(&mut self, image: CanonicalImage) {
        match image.to_surface() {
            Ok(surface) => self.frozen_surface = Some(surface),
            Err(err) => warn!("Monitor {}: frozen image not paintable: {}", self.name, err),
        }
        self.frozen = Some(image);
        self.lifecycle.mark_frozen();
    }

    /// Tells the compositor how buffer pixels map onto the logical surface.
    pub(super) fn apply_buffer_scale(&self, fractional_enabled: bool) {
        let (w, h) = self.lifecycle.logical_size();
        match &self.viewport {
            Some(viewport) if fractional_enabled => {
                self.surface.set_buffer_scale(1);
                viewport.set_destination(w as i32, h as i32);
            }
            _ => self.surface.set_buffer_scale(self.integer_scale.max(1)),
        }
    }

    /// Destroys protocol objects, children before the surface they belong to.
    pub(super) fn destroy(&mut self) {
        self.lifecycle.tear_down();
        self.capture.destroy();
        for buffer in self.buffers.iter_mut().flatten() {
            buffer.destroy();
        }
        self.retired.clear();
        if let Some(viewport) = self.viewport.take() {
            viewport.destroy();
        }
        if let Some(fractional) = self.fractional.take() {
            fractional.destroy();
        }
        self.layer.destroy();
        self.surface.destroy();
        debug!("Monitor {} torn down", self.name);
    }
}
