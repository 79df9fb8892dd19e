//! Greyscale conversion stage.
//!
//! One parameter-independent memoisation: the result only ever becomes
//! stale when the source (or the working size) changes, which resets the
//! whole cache.

use crate::cache::{ConversionCache, expect_rgb8, keys};
use crate::diagnostics::StageCounters;
use crate::types::{GrayImage, PixelBuffer, RgbImage};

/// Convert the resized source to greyscale, memoised under
/// [`keys::GREY_RESULT`]. Returns the result key.
pub(crate) fn convert(cache: &mut ConversionCache, counters: &mut StageCounters) -> &'static str {
    if !cache.has_buffer(keys::GREY_RESULT) {
        counters.record(keys::GREY_RESULT);
        let grey = {
            let source = expect_rgb8(cache, keys::RESIZED);
            to_greyscale(source)
        };
        cache.put_buffer(keys::GREY_RESULT, PixelBuffer::Gray8(grey));
    }
    keys::GREY_RESULT
}

/// Weighted luminance conversion, `0.299 R + 0.587 G + 0.114 B`, rounded.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn to_greyscale(source: &RgbImage) -> GrayImage {
    GrayImage::from_fn(source.width(), source.height(), |x, y| {
        let [r, g, b] = source.get_pixel(x, y).0;
        let luma = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
        image::Luma([luma.round().clamp(0.0, 255.0) as u8])
    })
}
