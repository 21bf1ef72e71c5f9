use wayland_client::{WEnum, protocol::wl_shm};

/// Pixel layouts a compositor may offer for a screencopy frame.
///
/// Names follow the wl_shm convention: the channel order describes a
/// little-endian 32-bit word, so `Argb8888` is `[B, G, R, A]` in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Argb8888,
    Xrgb8888,
    Abgr8888,
    Xbgr8888,
    Argb2101010,
    Xrgb2101010,
    Abgr2101010,
    Xbgr2101010,
    /// 24-bit, `[B, G, R]` in memory.
    Rgb888,
    /// 24-bit, `[R, G, B]` in memory.
    Bgr888,
    /// Anything else; carries the raw wl_shm code.
    Other(u32),
}

impl PixelFormat {
    /// Bytes per pixel, or `None` for formats we cannot convert.
    pub fn bytes_per_pixel(self) -> Option<u32> {
        match self {
            PixelFormat::Rgb888 | PixelFormat::Bgr888 => Some(3),
            PixelFormat::Other(_) => None,
            _ => Some(4),
        }
    }

    /// Whether the layout is already canonical.
    pub fn is_canonical(self) -> bool {
        matches!(self, PixelFormat::Argb8888 | PixelFormat::Xrgb8888)
    }

    /// Whether the layout has no meaningful alpha channel.
    pub fn ignores_alpha(self) -> bool {
        matches!(
            self,
            PixelFormat::Xrgb8888
                | PixelFormat::Xbgr8888
                | PixelFormat::Xrgb2101010
                | PixelFormat::Xbgr2101010
        )
    }

    pub fn from_wl(format: WEnum<wl_shm::Format>) -> Self {
        match format {
            WEnum::Value(wl_shm::Format::Argb8888) => PixelFormat::Argb8888,
            WEnum::Value(wl_shm::Format::Xrgb8888) => PixelFormat::Xrgb8888,
            WEnum::Value(wl_shm::Format::Abgr8888) => PixelFormat::Abgr8888,
            WEnum::Value(wl_shm::Format::Xbgr8888) => PixelFormat::Xbgr8888,
            WEnum::Value(wl_shm::Format::Argb2101010) => PixelFormat::Argb2101010,
            WEnum::Value(wl_shm::Format::Xrgb2101010) => PixelFormat::Xrgb2101010,
            WEnum::Value(wl_shm::Format::Abgr2101010) => PixelFormat::Abgr2101010,
            WEnum::Value(wl_shm::Format::Xbgr2101010) => PixelFormat::Xbgr2101010,
            WEnum::Value(wl_shm::Format::Rgb888) => PixelFormat::Rgb888,
            WEnum::Value(wl_shm::Format::Bgr888) => PixelFormat::Bgr888,
            WEnum::Value(other) => PixelFormat::Other(other.into()),
            WEnum::Unknown(raw) => PixelFormat::Other(raw),
        }
    }

    /// The wl_shm code used when allocating a buffer in this layout.
    pub fn to_wl(self) -> Option<wl_shm::Format> {
        let format = match self {
            PixelFormat::Argb8888 => wl_shm::Format::Argb8888,
            PixelFormat::Xrgb8888 => wl_shm::Format::Xrgb8888,
            PixelFormat::Abgr8888 => wl_shm::Format::Abgr8888,
            PixelFormat::Xbgr8888 => wl_shm::Format::Xbgr8888,
            PixelFormat::Argb2101010 => wl_shm::Format::Argb2101010,
            PixelFormat::Xrgb2101010 => wl_shm::Format::Xrgb2101010,
            PixelFormat::Abgr2101010 => wl_shm::Format::Abgr2101010,
            PixelFormat::Xbgr2101010 => wl_shm::Format::Xbgr2101010,
            PixelFormat::Rgb888 => wl_shm::Format::Rgb888,
            PixelFormat::Bgr888 => wl_shm::Format::Bgr888,
            PixelFormat::Other(_) => return None,
        };
        Some(format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_codes_map_to_other() {
        assert_eq!(
            PixelFormat::from_wl(WEnum::Unknown(0xdead_beef)),
            PixelFormat::Other(0xdead_beef)
        );
        assert_eq!(PixelFormat::Other(7).bytes_per_pixel(), None);
        assert_eq!(PixelFormat::Other(7).to_wl(), None);
    }

    #[test]
    fn wl_codes_roundtrip() {
        for format in [
            PixelFormat::Argb8888,
            PixelFormat::Xbgr2101010,
            PixelFormat::Rgb888,
        ] {
            let wl = format.to_wl().unwrap();
            assert_eq!(PixelFormat::from_wl(WEnum::Value(wl)), format);
        }
    }

    #[test]
    fn bytes_per_pixel_by_family() {
        assert_eq!(PixelFormat::Bgr888.bytes_per_pixel(), Some(3));
        assert_eq!(PixelFormat::Abgr2101010.bytes_per_pixel(), Some(4));
        assert!(PixelFormat::Xrgb8888.is_canonical());
        assert!(!PixelFormat::Xbgr8888.is_canonical());
    }
}
