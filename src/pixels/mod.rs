//! Frozen-frame pixel handling.
//!
//! Screencopy hands us whatever layout the compositor prefers. This module
//! tags those layouts ([`PixelFormat`]), rewrites them into one canonical
//! 32-bit layout ([`normalize`]) and crops/encodes the result
//! ([`CanonicalImage`]).

mod convert;
mod format;
mod image;

pub use convert::{RawFrame, normalize};
pub use format::PixelFormat;
pub use image::CanonicalImage;

use thiserror::Error;

/// Errors raised while converting, cropping or encoding pixel data.
#[derive(Debug, Error)]
pub enum PixelError {
    #[error("Unsupported pixel format: {0:?}")]
    UnsupportedFormat(PixelFormat),

    #[error("Invalid buffer layout: {0}")]
    InvalidLayout(String),

    #[error("Crop failed: {0}")]
    Crop(String),

    #[error("PNG encoding failed: {0}")]
    Encode(String),
}
