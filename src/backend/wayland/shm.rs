//! Shared-memory pixel buffers backing overlay rendering and screen copies.
//!
//! Each [`Buffer`] owns its own anonymous file and mapping. The file is created
//! with close-on-exec and never has a visible name: `memfd_create` where the
//! kernel supports it, otherwise a file in `$XDG_RUNTIME_DIR` that is unlinked
//! right after creation.

use std::{
    env,
    ffi::CString,
    fs::{self, File, OpenOptions},
    os::fd::{AsFd, FromRawFd},
    path::PathBuf,
    sync::atomic::{AtomicU32, Ordering},
};

use log::{debug, warn};
use memmap2::{MmapMut, MmapOptions};
use thiserror::Error;
use wayland_client::{
    QueueHandle,
    protocol::{wl_buffer, wl_shm, wl_shm_pool},
};

use crate::pixels::PixelFormat;

const PAGE_SIZE: usize = 4096;

static FALLBACK_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Errors raised by the buffer pool. All of them end the session.
#[derive(Debug, Error)]
pub enum ShmError {
    #[error("Cannot size shared memory to {size} bytes: {source}")]
    ResourceExhausted { size: usize, source: nix::Error },

    #[error("Failed to create shared memory file: {0}")]
    Create(#[source] std::io::Error),

    #[error("Failed to map shared memory: {0}")]
    Map(#[source] std::io::Error),

    #[error("Invalid buffer geometry: {0}")]
    Geometry(String),
}

/// Which buffer of an overlay a `wl_buffer` belongs to; used as the
/// `wl_buffer` user data so release events find their way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferTag {
    pub monitor: u32,
    pub slot: BufferSlot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferSlot {
    Render(usize),
    Frozen,
}

/// A fixed-size pixel buffer in shared memory.
///
/// While `busy` the compositor owns the contents; [`Buffer::pixels_mut`]
/// refuses access until [`Buffer::release`] is called.
pub struct Buffer {
    width: u32,
    height: u32,
    stride: u32,
    format: PixelFormat,
    file: File,
    map: MmapMut,
    busy: bool,
    pool: Option<wl_shm_pool::WlShmPool>,
    wl_buffer: Option<wl_buffer::WlBuffer>,
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("format", &self.format)
            .field("busy", &self.busy)
            .finish()
    }
}

impl Buffer {
    /// Allocates a zero-filled buffer with a tightly packed stride.
    pub fn allocate(width: u32, height: u32, format: PixelFormat) -> Result<Self, ShmError> {
        let bpp = format
            .bytes_per_pixel()
            .ok_or_else(|| ShmError::Geometry(format!("no byte size for {:?}", format)))?;
        let stride = width
            .checked_mul(bpp)
            .ok_or_else(|| ShmError::Geometry(format!("width {} overflows", width)))?;
        Self::with_stride(width, height, stride, format)
    }

    /// Allocates a zero-filled buffer with a caller-chosen stride, as
    /// advertised by screen-copy negotiation.
    pub fn with_stride(
        width: u32,
        height: u32,
        stride: u32,
        format: PixelFormat,
    ) -> Result<Self, ShmError> {
        if width == 0 || height == 0 || stride == 0 {
            return Err(ShmError::Geometry(format!(
                "{}x{} stride {}",
                width, height, stride
            )));
        }
        let size = (stride as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| ShmError::Geometry(format!("{} rows of {} bytes", height, stride)))?;
        let rounded = size.div_ceil(PAGE_SIZE) * PAGE_SIZE;

        let file = create_anonymous_file()?;
        nix::unistd::ftruncate(file.as_fd(), rounded as libc::off_t).map_err(|source| {
            ShmError::ResourceExhausted {
                size: rounded,
                source,
            }
        })?;

        // SAFETY: the file is private to this process (memfd or unlinked), sized
        // above, and stays open for the lifetime of the mapping.
        let map = unsafe { MmapOptions::new().len(rounded).map_mut(&file) }
            .map_err(ShmError::Map)?;

        debug!(
            "Allocated {}x{} {:?} buffer (stride {}, {} bytes)",
            width, height, format, stride, rounded
        );

        Ok(Self {
            width,
            height,
            stride,
            format,
            file,
            map,
            busy: false,
            pool: None,
            wl_buffer: None,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Whether this buffer can serve a `width`x`height` frame in `format`.
    pub fn matches(&self, width: u32, height: u32, format: PixelFormat) -> bool {
        self.width == width && self.height == height && self.format == format
    }

    /// The pixel rows (`stride * height` bytes).
    pub fn pixels(&self) -> &[u8] {
        &self.map[..self.stride as usize * self.height as usize]
    }

    /// Mutable pixel rows; `None` while the compositor holds the buffer.
    pub fn pixels_mut(&mut self) -> Option<&mut [u8]> {
        if self.busy {
            return None;
        }
        let len = self.stride as usize * self.height as usize;
        Some(&mut self.map[..len])
    }

    /// Hands the buffer to the compositor.
    pub fn mark_busy(&mut self) {
        self.busy = true;
    }

    /// Returns the buffer from the compositor. The only way a busy buffer
    /// becomes writable again.
    pub fn release(&mut self) {
        self.busy = false;
    }

    /// The `wl_buffer` for this memory, created on first use.
    pub fn wl_buffer<D>(
        &mut self,
        shm: &wl_shm::WlShm,
        qh: &QueueHandle<D>,
        tag: BufferTag,
    ) -> Result<&wl_buffer::WlBuffer, ShmError>
    where
        D: wayland_client::Dispatch<wl_shm_pool::WlShmPool, ()>
            + wayland_client::Dispatch<wl_buffer::WlBuffer, BufferTag>
            + 'static,
    {
        if self.wl_buffer.is_none() {
            let wl_format = self.format.to_wl().ok_or_else(|| {
                ShmError::Geometry(format!("{:?} has no wl_shm code", self.format))
            })?;
            let pool = shm.create_pool(self.file.as_fd(), self.map.len() as i32, qh, ());
            let buffer = pool.create_buffer(
                0,
                self.width as i32,
                self.height as i32,
                self.stride as i32,
                wl_format,
                qh,
                tag,
            );
            self.pool = Some(pool);
            self.wl_buffer = Some(buffer);
        }
        self.wl_buffer
            .as_ref()
            .ok_or_else(|| ShmError::Geometry("wl_buffer missing after creation".to_string()))
    }

    /// Whether `buffer` is this memory's `wl_buffer`.
    pub fn owns(&self, buffer: &wl_buffer::WlBuffer) -> bool {
        self.wl_buffer.as_ref() == Some(buffer)
    }

    /// Destroys the protocol objects. The memory itself goes with `self`.
    pub fn destroy(&mut self) {
        if let Some(buffer) = self.wl_buffer.take() {
            buffer.destroy();
        }
        if let Some(pool) = self.pool.take() {
            pool.destroy();
        }
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn create_anonymous_file() -> Result<File, ShmError> {
    let name = CString::new("wayscan-shm").map_err(|e| {
        ShmError::Create(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
    })?;
    // SAFETY: `name` is a valid NUL-terminated string for the duration of the call.
    let fd = unsafe { libc::memfd_create(name.as_ptr(), libc::MFD_CLOEXEC) };
    if fd >= 0 {
        // SAFETY: memfd_create returned a fresh descriptor that nothing else owns.
        return Ok(unsafe { File::from_raw_fd(fd) });
    }

    let err = std::io::Error::last_os_error();
    warn!("memfd_create failed ({}), falling back to runtime dir", err);
    create_unlinked_file()
}

fn create_unlinked_file() -> Result<File, ShmError> {
    let dir = env::var_os("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(env::temp_dir);

    loop {
        let n = FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = dir.join(format!("wayscan-shm-{}-{}", std::process::id(), n));
        // std opens with O_CLOEXEC.
        match OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => {
                fs::remove_file(&path).map_err(ShmError::Create)?;
                return Ok(file);
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(ShmError::Create(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_is_zeroed_and_packed() {
        let buffer = Buffer::allocate(3, 2, PixelFormat::Argb8888).unwrap();
        assert_eq!(buffer.stride(), 12);
        assert_eq!(buffer.pixels().len(), 24);
        assert!(buffer.pixels().iter().all(|&b| b == 0));
    }

    #[test]
    fn busy_buffer_refuses_writes_until_released() {
        let mut buffer = Buffer::allocate(2, 2, PixelFormat::Argb8888).unwrap();
        buffer.pixels_mut().unwrap()[0] = 7;
        buffer.mark_busy();
        assert!(buffer.pixels_mut().is_none());
        buffer.release();
        assert_eq!(buffer.pixels_mut().unwrap()[0], 7);
    }

    #[test]
    fn honors_negotiated_stride() {
        let buffer = Buffer::with_stride(10, 4, 64, PixelFormat::Xrgb8888).unwrap();
        assert_eq!(buffer.pixels().len(), 256);
        assert!(buffer.matches(10, 4, PixelFormat::Xrgb8888));
        assert!(!buffer.matches(10, 4, PixelFormat::Argb8888));
    }

    #[test]
    fn rejects_unknown_format_and_empty_size() {
        assert!(matches!(
            Buffer::allocate(4, 4, PixelFormat::Other(1)),
            Err(ShmError::Geometry(_))
        ));
        assert!(matches!(
            Buffer::allocate(0, 4, PixelFormat::Argb8888),
            Err(ShmError::Geometry(_))
        ));
    }

    #[test]
    fn fallback_file_is_unlinked() {
        let dir = tempfile::tempdir().unwrap();
        // SAFETY: tests in this module do not read XDG_RUNTIME_DIR concurrently.
        unsafe { env::set_var("XDG_RUNTIME_DIR", dir.path()) };
        let _file = create_unlinked_file().unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
