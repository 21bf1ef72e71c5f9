//! Conversion of compositor layouts into the canonical 32-bit layout.
//!
//! Canonical pixels are `[B, G, R, A]` in memory (Cairo `ARgb32`), rows
//! packed with a stride of `width * 4`. 32-bit inputs are rewritten in place
//! before packing; 24-bit inputs are repacked with an opaque alpha byte.

use super::{CanonicalImage, PixelError, PixelFormat};

/// A borrowed screencopy frame as the compositor wrote it.
#[derive(Debug)]
pub struct RawFrame<'a> {
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub format: PixelFormat,
    /// Rows are stored bottom-to-top.
    pub y_invert: bool,
    pub data: &'a mut [u8],
}

/// Converts `frame` into a [`CanonicalImage`].
///
/// The input buffer may be modified. Converting a canonical frame leaves the
/// pixel values untouched.
pub fn normalize(frame: RawFrame<'_>) -> Result<CanonicalImage, PixelError> {
    let bpp = frame
        .format
        .bytes_per_pixel()
        .ok_or(PixelError::UnsupportedFormat(frame.format))?;
    validate_layout(&frame, bpp)?;

    let RawFrame {
        width,
        height,
        stride,
        format,
        y_invert,
        data,
    } = frame;

    let row_bytes = (width * 4) as usize;
    let mut packed = Vec::with_capacity(row_bytes * height as usize);

    for row in 0..height as usize {
        let start = row * stride as usize;
        let src = &mut data[start..start + (width * bpp) as usize];
        if bpp == 4 {
            convert_row_in_place(format, src);
            packed.extend_from_slice(src);
        } else {
            repack_row_24(format, src, &mut packed);
        }
    }

    let mut image = CanonicalImage::new(width, height, packed, format.ignores_alpha())?;
    if y_invert {
        image.flip_vertical();
    }
    Ok(image)
}

fn validate_layout(frame: &RawFrame<'_>, bpp: u32) -> Result<(), PixelError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(PixelError::InvalidLayout(format!(
            "empty frame {}x{}",
            frame.width, frame.height
        )));
    }
    let min_stride = frame.width.checked_mul(bpp).ok_or_else(|| {
        PixelError::InvalidLayout(format!("width {} overflows", frame.width))
    })?;
    if frame.stride < min_stride {
        return Err(PixelError::InvalidLayout(format!(
            "stride {} shorter than row of {} bytes",
            frame.stride, min_stride
        )));
    }
    // The last row only needs its pixel bytes, not a full stride.
    let needed = frame.stride as usize * (frame.height as usize - 1) + min_stride as usize;
    if frame.data.len() < needed {
        return Err(PixelError::InvalidLayout(format!(
            "buffer holds {} bytes, frame needs {}",
            frame.data.len(),
            needed
        )));
    }
    Ok(())
}

fn convert_row_in_place(format: PixelFormat, row: &mut [u8]) {
    match format {
        PixelFormat::Argb8888 | PixelFormat::Xrgb8888 => {}
        PixelFormat::Abgr8888 | PixelFormat::Xbgr8888 => {
            for px in row.chunks_exact_mut(4) {
                px.swap(0, 2);
            }
        }
        PixelFormat::Argb2101010 | PixelFormat::Xrgb2101010 => {
            for px in row.chunks_exact_mut(4) {
                let word = u32::from_le_bytes([px[0], px[1], px[2], px[3]]);
                px.copy_from_slice(&downsample_2101010(word, false));
            }
        }
        PixelFormat::Abgr2101010 | PixelFormat::Xbgr2101010 => {
            for px in row.chunks_exact_mut(4) {
                let word = u32::from_le_bytes([px[0], px[1], px[2], px[3]]);
                px.copy_from_slice(&downsample_2101010(word, true));
            }
        }
        PixelFormat::Rgb888 | PixelFormat::Bgr888 | PixelFormat::Other(_) => {}
    }
}

fn repack_row_24(format: PixelFormat, row: &[u8], out: &mut Vec<u8>) {
    for px in row.chunks_exact(3) {
        match format {
            // [R, G, B] in memory
            PixelFormat::Bgr888 => out.extend_from_slice(&[px[2], px[1], px[0], 0xff]),
            // [B, G, R] in memory
            _ => out.extend_from_slice(&[px[0], px[1], px[2], 0xff]),
        }
    }
}

/// Reduces one 2:10:10:10 word to canonical `[B, G, R, A]` bytes.
///
/// The low 10 bits hold blue for the `*RGB*` layouts and red for the
/// `*BGR*` layouts; `swap_rb` selects the latter.
fn downsample_2101010(word: u32, swap_rb: bool) -> [u8; 4] {
    let low = scale_10(word & 0x3ff);
    let mid = scale_10((word >> 10) & 0x3ff);
    let high = scale_10((word >> 20) & 0x3ff);
    let alpha = scale_2((word >> 30) & 0x3);
    if swap_rb {
        [high, mid, low, alpha]
    } else {
        [low, mid, high, alpha]
    }
}

fn scale_10(value: u32) -> u8 {
    (255.0 * value as f64 / 1023.0).round() as u8
}

fn scale_2(value: u32) -> u8 {
    (255.0 * value as f64 / 3.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(format: PixelFormat, width: u32, height: u32, stride: u32, data: &mut [u8]) -> RawFrame<'_> {
        RawFrame {
            width,
            height,
            stride,
            format,
            y_invert: false,
            data,
        }
    }

    fn word_2101010(low: u32, mid: u32, high: u32, alpha: u32) -> [u8; 4] {
        (low | (mid << 10) | (high << 20) | (alpha << 30)).to_le_bytes()
    }

    #[test]
    fn canonical_input_is_untouched() {
        let original = vec![1, 2, 3, 4, 5, 6, 7, 8];
        let mut data = original.clone();
        let image = normalize(frame(PixelFormat::Argb8888, 2, 1, 8, &mut data)).unwrap();
        assert_eq!(image.data(), original.as_slice());

        // A second pass over canonical bytes changes nothing.
        let mut again = image.data().to_vec();
        let second = normalize(frame(PixelFormat::Argb8888, 2, 1, 8, &mut again)).unwrap();
        assert_eq!(second.data(), original.as_slice());
    }

    #[test]
    fn abgr_swaps_red_and_blue() {
        // Memory [R, G, B, A]
        let mut data = vec![0x10, 0x20, 0x30, 0x40];
        let image = normalize(frame(PixelFormat::Abgr8888, 1, 1, 4, &mut data)).unwrap();
        assert_eq!(image.data(), &[0x30, 0x20, 0x10, 0x40]);
    }

    #[test]
    fn abgr_swap_twice_restores_bytes() {
        let original: Vec<u8> = (0..=255u8).collect();
        let mut data = original.clone();
        let once = normalize(frame(PixelFormat::Abgr8888, 8, 8, 32, &mut data)).unwrap();
        assert_ne!(once.data(), original.as_slice());

        let mut swapped = once.data().to_vec();
        let twice = normalize(frame(PixelFormat::Abgr8888, 8, 8, 32, &mut swapped)).unwrap();
        assert_eq!(twice.data(), original.as_slice());
    }

    #[test]
    fn ten_bit_downsampling_is_monotonic_and_bounded() {
        let mut previous = 0u8;
        for value in 0..1024u32 {
            let scaled = scale_10(value);
            assert!(scaled >= previous, "scale_10 drops at {}", value);
            previous = scaled;
        }
        assert_eq!((scale_10(0), scale_10(1023)), (0, 255));

        let alpha: Vec<u8> = (0..4u32).map(scale_2).collect();
        assert_eq!(alpha, vec![0, 85, 170, 255]);
    }

    #[test]
    fn ten_bit_channels_follow_their_source_component() {
        let mut previous = [0u8; 4];
        for value in 0..1024u32 {
            let mut data = word_2101010(value, value, value, 3).to_vec();
            let image = normalize(frame(PixelFormat::Xrgb2101010, 1, 1, 4, &mut data)).unwrap();
            let px = [image.data()[0], image.data()[1], image.data()[2], image.data()[3]];
            assert!(px[..3].iter().zip(&previous[..3]).all(|(now, before)| now >= before));
            assert_eq!(px[3], 255);
            previous = px;
        }
    }

    #[test]
    fn xbgr_is_tagged_without_alpha() {
        let mut data = vec![0x10, 0x20, 0x30, 0x00];
        let image = normalize(frame(PixelFormat::Xbgr8888, 1, 1, 4, &mut data)).unwrap();
        assert_eq!(image.data(), &[0x30, 0x20, 0x10, 0x00]);
        assert!(image.ignores_alpha());
    }

    #[test]
    fn rgb888_repacks_with_opaque_alpha() {
        // Memory [B, G, R] for two pixels
        let mut data = vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06];
        let image = normalize(frame(PixelFormat::Rgb888, 2, 1, 6, &mut data)).unwrap();
        assert_eq!(image.data(), &[0x01, 0x02, 0x03, 0xff, 0x04, 0x05, 0x06, 0xff]);
        assert_eq!(image.stride(), 8);
    }

    #[test]
    fn bgr888_reverses_channels() {
        // Memory [R, G, B]
        let mut data = vec![0xaa, 0xbb, 0xcc];
        let image = normalize(frame(PixelFormat::Bgr888, 1, 1, 3, &mut data)).unwrap();
        assert_eq!(image.data(), &[0xcc, 0xbb, 0xaa, 0xff]);
    }

    #[test]
    fn xrgb2101010_downsamples_each_channel() {
        // blue=1023 (low), green=512, red=0, alpha=3
        let mut data = word_2101010(1023, 512, 0, 3).to_vec();
        let image = normalize(frame(PixelFormat::Xrgb2101010, 1, 1, 4, &mut data)).unwrap();
        assert_eq!(image.data(), &[255, 128, 0, 255]);
    }

    #[test]
    fn xbgr2101010_flips_low_and_high() {
        // red=1023 (low), green=0, blue=0, alpha=1
        let mut data = word_2101010(1023, 0, 0, 1).to_vec();
        let image = normalize(frame(PixelFormat::Abgr2101010, 1, 1, 4, &mut data)).unwrap();
        assert_eq!(image.data(), &[0, 0, 255, 85]);
    }

    #[test]
    fn padded_stride_is_dropped_from_output() {
        let mut data = vec![
            1, 1, 1, 1, 0xee, 0xee, 0xee, 0xee, // row 0 + padding
            2, 2, 2, 2, // row 1, no trailing padding
        ];
        let image = normalize(frame(PixelFormat::Argb8888, 1, 2, 8, &mut data)).unwrap();
        assert_eq!(image.data(), &[1, 1, 1, 1, 2, 2, 2, 2]);
    }

    #[test]
    fn y_invert_flips_rows() {
        let mut data = vec![1, 1, 1, 1, 2, 2, 2, 2];
        let mut raw = frame(PixelFormat::Argb8888, 1, 2, 4, &mut data);
        raw.y_invert = true;
        let image = normalize(raw).unwrap();
        assert_eq!(image.data(), &[2, 2, 2, 2, 1, 1, 1, 1]);
    }

    #[test]
    fn rejects_unknown_format() {
        let mut data = vec![0; 4];
        let err = normalize(frame(PixelFormat::Other(42), 1, 1, 4, &mut data)).unwrap_err();
        assert!(matches!(err, PixelError::UnsupportedFormat(PixelFormat::Other(42))));
    }

    #[test]
    fn rejects_short_buffer() {
        let mut data = vec![0; 7];
        let err = normalize(frame(PixelFormat::Argb8888, 2, 1, 8, &mut data)).unwrap_err();
        assert!(matches!(err, PixelError::InvalidLayout(_)));
    }
}
