use cairo::{Format, ImageSurface};

use super::PixelError;
use crate::util::PixelRect;

/// A frozen frame in canonical layout: `[B, G, R, A]` pixels, rows packed
/// with a stride of `width * 4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalImage {
    width: u32,
    height: u32,
    /// The source had padding instead of alpha; the fourth byte is ignored.
    ignores_alpha: bool,
    data: Vec<u8>,
}

impl CanonicalImage {
    pub fn new(
        width: u32,
        height: u32,
        data: Vec<u8>,
        ignores_alpha: bool,
    ) -> Result<Self, PixelError> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(PixelError::InvalidLayout(format!(
                "{}x{} image needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            ignores_alpha,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> u32 {
        self.width * 4
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn ignores_alpha(&self) -> bool {
        self.ignores_alpha
    }

    fn cairo_format(&self) -> Format {
        if self.ignores_alpha {
            Format::Rgb24
        } else {
            Format::ARgb32
        }
    }

    /// Reverses row order.
    pub fn flip_vertical(&mut self) {
        let stride = self.stride() as usize;
        let rows = self.height as usize;
        for top in 0..rows / 2 {
            let bottom = rows - 1 - top;
            let (head, tail) = self.data.split_at_mut(bottom * stride);
            head[top * stride..(top + 1) * stride].swap_with_slice(&mut tail[..stride]);
        }
    }

    /// Copies out `rect`. Parts of `rect` outside the image come back fully
    /// transparent.
    pub fn crop(&self, rect: PixelRect) -> Result<CanonicalImage, PixelError> {
        let out_stride = rect.width as usize * 4;
        let out_len = out_stride
            .checked_mul(rect.height as usize)
            .ok_or_else(|| PixelError::Crop(format!("{:?} is too large", rect)))?;
        let mut out = vec![0u8; out_len];

        let left = i64::from(rect.x).max(0);
        let top = i64::from(rect.y).max(0);
        let right = (i64::from(rect.x) + i64::from(rect.width)).min(i64::from(self.width));
        let bottom = (i64::from(rect.y) + i64::from(rect.height)).min(i64::from(self.height));

        if left < right && top < bottom {
            let span = (right - left) as usize * 4;
            let src_stride = self.stride() as usize;
            for y in top..bottom {
                let src = y as usize * src_stride + left as usize * 4;
                let dst = (y - i64::from(rect.y)) as usize * out_stride
                    + (left - i64::from(rect.x)) as usize * 4;
                out[dst..dst + span].copy_from_slice(&self.data[src..src + span]);
            }
        } else {
            log::debug!("Crop {:?} lies outside {}x{} frame", rect, self.width, self.height);
        }

        CanonicalImage::new(rect.width, rect.height, out, self.ignores_alpha)
    }

    /// Wraps a copy of the pixels in a Cairo surface for painting.
    pub fn to_surface(&self) -> Result<ImageSurface, cairo::Error> {
        ImageSurface::create_for_data(
            self.data.clone(),
            self.cairo_format(),
            self.width as i32,
            self.height as i32,
            self.stride() as i32,
        )
    }

    /// Encodes the image as PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>, PixelError> {
        let surface = self
            .to_surface()
            .map_err(|e| PixelError::Encode(format!("surface creation failed: {}", e)))?;
        let mut png = Vec::new();
        surface
            .write_to_png(&mut png)
            .map_err(|e| PixelError::Encode(e.to_string()))?;
        Ok(png)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> CanonicalImage {
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[x as u8, y as u8, 0, 0xff]);
            }
        }
        CanonicalImage::new(width, height, data, false).unwrap()
    }

    #[test]
    fn new_rejects_mismatched_length() {
        assert!(CanonicalImage::new(2, 2, vec![0; 15], false).is_err());
    }

    #[test]
    fn crop_copies_interior_region() {
        let image = gradient(4, 4);
        let crop = image.crop(PixelRect::new(1, 2, 2, 1).unwrap()).unwrap();
        assert_eq!(crop.width(), 2);
        assert_eq!(crop.height(), 1);
        assert_eq!(crop.data(), &[1, 2, 0, 0xff, 2, 2, 0, 0xff]);
    }

    #[test]
    fn unscaled_selection_crops_matching_pixels() {
        use crate::util::{Rect, logical_to_pixels, scale_between};

        let image = gradient(1920, 1080);
        let scale = scale_between((1920, 1080), (1920, 1080)).unwrap();
        assert_eq!(scale, (1.0, 1.0));

        let rect = logical_to_pixels(Rect::new(100.0, 100.0, 300.0, 200.0), scale).unwrap();
        assert_eq!(rect, PixelRect::new(100, 100, 300, 200).unwrap());

        let crop = image.crop(rect).unwrap();
        assert_eq!((crop.width(), crop.height()), (300, 200));
        assert_eq!(&crop.data()[..4], &[100, 100, 0, 0xff]);
        let last = crop.data().len() - 4;
        assert_eq!(&crop.data()[last..], &[(399 % 256) as u8, (299 % 256) as u8, 0, 0xff]);
    }

    #[test]
    fn crop_past_edges_is_transparent() {
        let image = gradient(2, 2);
        let crop = image.crop(PixelRect::new(-1, 1, 2, 2).unwrap()).unwrap();
        assert_eq!(
            crop.data(),
            &[
                0, 0, 0, 0, 0, 1, 0, 0xff, // row y=1
                0, 0, 0, 0, 0, 0, 0, 0, // row y=2, outside
            ]
        );
    }

    #[test]
    fn flip_vertical_handles_odd_heights() {
        let mut image = gradient(1, 3);
        image.flip_vertical();
        assert_eq!(image.data(), &[0, 2, 0, 0xff, 0, 1, 0, 0xff, 0, 0, 0, 0xff]);
    }

    #[test]
    fn encode_png_writes_signature() {
        let png = gradient(3, 3).encode_png().unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
