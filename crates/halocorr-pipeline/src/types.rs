//! Shared types for the halocorr conversion pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Re-export `RgbImage` so downstream crates can reference decoded
/// sources without depending on `image` directly.
pub use image::RgbImage;

/// Re-export `GrayImage` for single-channel 8-bit results.
pub use image::GrayImage;

/// A single-channel 32-bit float image, nominally in the `[0, 255]` range.
///
/// All intermediates of the cathodo-luminescence correction are stored in
/// this format; the final conversion back to 8-bit saturates.
pub type GrayF32Image = image::ImageBuffer<image::Luma<f32>, Vec<f32>>;

/// The conversions the pipeline can perform.
///
/// Each mode owns a dedicated [`ConversionCache`](crate::ConversionCache);
/// modes never share cached state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversionMode {
    /// Pass the (resized) source through unchanged.
    None,
    /// Single-channel luminance conversion.
    Greyscale,
    /// The cathodo-luminescence halo correction.
    ClCorrection,
    /// Preview of the blurred background estimate used by the correction.
    BlurredFilter,
    /// Binary threshold of the source brightness channel.
    ThresholdTest,
    /// Halo correction followed by a binary threshold of the result.
    ClCorrectionThresholdTest,
}

impl ConversionMode {
    /// All modes, in a fixed order.
    pub const ALL: [Self; 6] = [
        Self::None,
        Self::Greyscale,
        Self::ClCorrection,
        Self::BlurredFilter,
        Self::ThresholdTest,
        Self::ClCorrectionThresholdTest,
    ];
}

impl fmt::Display for ConversionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Greyscale => f.write_str("greyscale"),
            Self::ClCorrection => f.write_str("cl-correction"),
            Self::BlurredFilter => f.write_str("blurred-filter"),
            Self::ThresholdTest => f.write_str("threshold-test"),
            Self::ClCorrectionThresholdTest => f.write_str("cl-correction-threshold-test"),
        }
    }
}

/// A pixel buffer in one of the element formats the pipeline caches.
///
/// The cache is the sole owner of every stored buffer; replacing or
/// removing an entry drops the previous backing storage exactly once.
/// Lookups hand out borrows, never ownership.
#[derive(Debug, Clone)]
pub enum PixelBuffer {
    /// 8-bit unsigned, three channels (decoded sources and RGB results).
    Rgb8(RgbImage),
    /// 8-bit unsigned, single channel (greyscale results).
    Gray8(GrayImage),
    /// 32-bit float, single channel (correction intermediates).
    GrayF32(GrayF32Image),
}

impl PixelBuffer {
    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        match self {
            Self::Rgb8(img) => img.width(),
            Self::Gray8(img) => img.width(),
            Self::GrayF32(img) => img.width(),
        }
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        match self {
            Self::Rgb8(img) => img.height(),
            Self::Gray8(img) => img.height(),
            Self::GrayF32(img) => img.height(),
        }
    }

    /// Returns `true` if either dimension is zero.
    ///
    /// A failed decode is cached as an empty buffer so a broken file is
    /// not re-read on every request.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Borrow as an RGB 8-bit image, if that is the stored format.
    #[must_use]
    pub fn as_rgb8(&self) -> Option<&RgbImage> {
        match self {
            Self::Rgb8(img) => Some(img),
            _ => None,
        }
    }

    /// Borrow as a single-channel 8-bit image, if that is the stored format.
    #[must_use]
    pub fn as_gray8(&self) -> Option<&GrayImage> {
        match self {
            Self::Gray8(img) => Some(img),
            _ => None,
        }
    }

    /// Borrow as a single-channel float image, if that is the stored format.
    #[must_use]
    pub fn as_gray_f32(&self) -> Option<&GrayF32Image> {
        match self {
            Self::GrayF32(img) => Some(img),
            _ => None,
        }
    }
}

impl From<RgbImage> for PixelBuffer {
    fn from(img: RgbImage) -> Self {
        Self::Rgb8(img)
    }
}

impl From<GrayImage> for PixelBuffer {
    fn from(img: GrayImage) -> Self {
        Self::Gray8(img)
    }
}

impl From<GrayF32Image> for PixelBuffer {
    fn from(img: GrayF32Image) -> Self {
        Self::GrayF32(img)
    }
}

/// Minimum and maximum of a float channel, with the pixel positions at
/// which they occur.
///
/// Cheap to recompute but cached to avoid rescanning large buffers on
/// every parameter tweak.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    /// Smallest sample value.
    pub min: f64,
    /// Largest sample value.
    pub max: f64,
    /// `(x, y)` of the first occurrence of the minimum.
    pub min_pos: (u32, u32),
    /// `(x, y)` of the first occurrence of the maximum.
    pub max_pos: (u32, u32),
}

impl ChannelStats {
    /// `max - min`.
    #[must_use]
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Errors raised by the conversion pipeline.
///
/// Decode and encode failures are not errors: they are reported as an
/// absent result (`Ok(None)`) so the caller can show a placeholder, while
/// these variants abort the request before any work happens.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The requested output type is not on the allowlist.
    #[error("\"{0}\" is not a supported output type")]
    UnsupportedOutputType(String),

    /// A size tolerance outside its legal band was supplied.
    #[error("invalid cache size tolerance: {0}")]
    InvalidTolerance(String),
}
