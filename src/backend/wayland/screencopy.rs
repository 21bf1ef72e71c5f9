// Per-monitor wlr-screencopy negotiation: collect buffer offers, copy once into
// shared memory, normalize into the frozen image.
use log::{debug, info, warn};
use wayland_client::{Connection, Dispatch, Proxy, QueueHandle, WEnum};
use wayland_protocols_wlr::screencopy::v1::client::{
    zwlr_screencopy_frame_v1::{self, ZwlrScreencopyFrameV1},
    zwlr_screencopy_manager_v1::ZwlrScreencopyManagerV1,
};

use super::shm::{Buffer, BufferSlot, BufferTag};
use super::state::WaylandState;
use crate::backend::SessionError;
use crate::pixels::{PixelError, PixelFormat, RawFrame, normalize};

/// A `buffer` event: one layout the compositor can copy into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct BufferOffer {
    pub(super) format: PixelFormat,
    pub(super) width: u32,
    pub(super) height: u32,
    pub(super) stride: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum CapturePhase {
    Negotiating,
    Copying,
    Done,
}

pub(super) struct CaptureState {
    frame: Option<ZwlrScreencopyFrameV1>,
    offers: Vec<BufferOffer>,
    buffer: Option<Buffer>,
    y_invert: bool,
    phase: CapturePhase,
}

impl CaptureState {
    pub(super) fn new(frame: ZwlrScreencopyFrameV1) -> Self {
        Self {
            frame: Some(frame),
            offers: Vec::new(),
            buffer: None,
            y_invert: false,
            phase: CapturePhase::Negotiating,
        }
    }

    pub(super) fn destroy(&mut self) {
        if let Some(frame) = self.frame.take() {
            frame.destroy();
        }
        self.buffer = None;
    }
}

/// First offer we know how to normalize and allocate.
pub(super) fn choose_offer(offers: &[BufferOffer]) -> Option<BufferOffer> {
    offers
        .iter()
        .copied()
        .find(|offer| offer.format.bytes_per_pixel().is_some() && offer.format.to_wl().is_some())
}

impl WaylandState {
    /// Allocates the frozen-image buffer for the negotiated layout and starts
    /// the copy.
    fn start_copy(&mut self, monitor_id: u32, qh: &QueueHandle<Self>) {
        let Some(monitor) = self.monitors.iter_mut().find(|m| m.id == monitor_id) else {
            return;
        };
        let capture = &mut monitor.capture;
        if capture.phase != CapturePhase::Negotiating {
            return;
        }

        let Some(offer) = choose_offer(&capture.offers) else {
            let format = capture
                .offers
                .first()
                .map(|o| o.format)
                .unwrap_or(PixelFormat::Other(0));
            let name = monitor.name.clone();
            self.fail(SessionError::UnsupportedFormat {
                monitor: name,
                source: PixelError::UnsupportedFormat(format),
            });
            return;
        };

        debug!(
            "Monitor {}: copying {}x{} {:?} (stride {})",
            monitor.name, offer.width, offer.height, offer.format, offer.stride
        );
        let mut buffer =
            match Buffer::with_stride(offer.width, offer.height, offer.stride, offer.format) {
                Ok(buffer) => buffer,
                Err(err) => {
                    self.fail(SessionError::FatalInit(err.to_string()));
                    return;
                }
            };
        let tag = BufferTag {
            monitor: monitor_id,
            slot: BufferSlot::Frozen,
        };
        let wl_buffer = match buffer.wl_buffer(self.shm.wl_shm(), qh, tag) {
            Ok(wl_buffer) => wl_buffer.clone(),
            Err(err) => {
                self.fail(SessionError::FatalInit(err.to_string()));
                return;
            }
        };

        // Re-borrow: `self.fail` above needs the whole state.
        let Some(monitor) = self.monitors.iter_mut().find(|m| m.id == monitor_id) else {
            return;
        };
        let capture = &mut monitor.capture;
        if let Some(frame) = &capture.frame {
            frame.copy(&wl_buffer);
        }
        buffer.mark_busy();
        capture.buffer = Some(buffer);
        capture.phase = CapturePhase::Copying;
    }

    /// The copy landed: normalize it and let the overlay ack its configure.
    fn finish_copy(&mut self, monitor_id: u32) {
        let Some(index) = self.monitors.iter().position(|m| m.id == monitor_id) else {
            return;
        };
        let monitor = &mut self.monitors[index];
        let capture = &mut monitor.capture;
        let Some(mut buffer) = capture.buffer.take() else {
            warn!("Monitor {}: ready without a buffer", monitor.name);
            return;
        };
        capture.phase = CapturePhase::Done;
        if let Some(frame) = capture.frame.take() {
            frame.destroy();
        }
        buffer.release();

        let (width, height, stride, format) =
            (buffer.width(), buffer.height(), buffer.stride(), buffer.format());
        let y_invert = capture.y_invert;
        let result = match buffer.pixels_mut() {
            Some(data) => normalize(RawFrame {
                width,
                height,
                stride,
                format,
                y_invert,
                data,
            }),
            None => Err(PixelError::InvalidLayout("frame buffer still busy".into())),
        };
        // The shared memory is no longer needed once normalized.
        drop(buffer);

        match result {
            Ok(image) => {
                info!(
                    "Monitor {}: froze {}x{} frame ({:?})",
                    monitor.name, width, height, format
                );
                monitor.set_frozen(image);
                self.try_ack(index);
            }
            Err(source) => {
                let name = monitor.name.clone();
                self.fail(SessionError::UnsupportedFormat {
                    monitor: name,
                    source,
                });
            }
        }
    }
}

impl Dispatch<ZwlrScreencopyManagerV1, ()> for WaylandState {
    fn event(
        _state: &mut Self,
        _proxy: &ZwlrScreencopyManagerV1,
        _event: <ZwlrScreencopyManagerV1 as Proxy>::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<ZwlrScreencopyFrameV1, u32> for WaylandState {
    fn event(
        state: &mut Self,
        proxy: &ZwlrScreencopyFrameV1,
        event: zwlr_screencopy_frame_v1::Event,
        monitor_id: &u32,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            zwlr_screencopy_frame_v1::Event::Buffer {
                format,
                width,
                height,
                stride,
            } => {
                let offer = BufferOffer {
                    format: PixelFormat::from_wl(format),
                    width,
                    height,
                    stride,
                };
                debug!("Monitor {}: buffer offer {:?}", monitor_id, offer);
                if let Some(monitor) = state.monitors.iter_mut().find(|m| m.id == *monitor_id) {
                    monitor.capture.offers.push(offer);
                }
                // Version 3 announces the end of the offer list; older ones
                // send a single offer.
                if proxy.version() < 3 {
                    state.start_copy(*monitor_id, qh);
                }
            }
            zwlr_screencopy_frame_v1::Event::BufferDone => state.start_copy(*monitor_id, qh),
            zwlr_screencopy_frame_v1::Event::Flags { flags } => {
                let y_invert = matches!(
                    flags,
                    WEnum::Value(flags) if flags.contains(zwlr_screencopy_frame_v1::Flags::YInvert)
                );
                if let Some(monitor) = state.monitors.iter_mut().find(|m| m.id == *monitor_id) {
                    monitor.capture.y_invert = y_invert;
                }
            }
            zwlr_screencopy_frame_v1::Event::Ready { .. } => state.finish_copy(*monitor_id),
            zwlr_screencopy_frame_v1::Event::Failed => {
                let name = state
                    .monitors
                    .iter()
                    .find(|m| m.id == *monitor_id)
                    .map(|m| m.name.clone())
                    .unwrap_or_else(|| monitor_id.to_string());
                state.fail(SessionError::CaptureFailed(name));
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(format: PixelFormat) -> BufferOffer {
        BufferOffer {
            format,
            width: 1920,
            height: 1080,
            stride: 1920 * 4,
        }
    }

    #[test]
    fn picks_first_convertible_offer() {
        let offers = [
            offer(PixelFormat::Other(0x3231_5659)),
            offer(PixelFormat::Xbgr2101010),
            offer(PixelFormat::Argb8888),
        ];
        assert_eq!(choose_offer(&offers), Some(offers[1]));
    }

    #[test]
    fn no_convertible_offer() {
        assert_eq!(choose_offer(&[offer(PixelFormat::Other(7))]), None);
        assert_eq!(choose_offer(&[]), None);
    }
}
