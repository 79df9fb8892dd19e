//! Gaussian blur of float brightness channels.
//!
//! Wraps [`imageproc::filter::gaussian_blur_f32`], which derives the
//! kernel size from sigma and replicates edge samples at the border.
//!
//! The background estimate uses a sigma proportional to the image size
//! ([`blur_scaled`]), so the same multiplier produces the same correction
//! regardless of the working resolution. The noise-reduction low-pass
//! uses a fixed sigma in pixel units ([`NOISE_REDUCTION_SIGMA`]).

use crate::types::GrayF32Image;

/// Sigma of the noise-reduction low-pass, in pixels. Independent of the
/// image size.
pub const NOISE_REDUCTION_SIGMA: f64 = 10.0;

/// Blur with a sigma proportional to the image size:
/// `sigma = min(rows, cols) * sigma_multiplier`.
///
/// When the derived sigma falls below `1.0` the channel is returned
/// unblurred; the underlying filter rejects non-positive sigmas and a
/// sub-pixel kernel would be a no-op anyway.
#[must_use]
pub fn blur_scaled(channel: &GrayF32Image, sigma_multiplier: f64) -> GrayF32Image {
    let shorter = f64::from(channel.width().min(channel.height()));
    let sigma = shorter * sigma_multiplier;
    if sigma < 1.0 {
        return channel.clone();
    }
    #[allow(clippy::cast_possible_truncation)]
    let sigma = sigma as f32;
    imageproc::filter::gaussian_blur_f32(channel, sigma)
}

/// Blur with a fixed sigma in pixel units.
#[must_use]
pub fn blur_fixed(channel: &GrayF32Image, sigma: f64) -> GrayF32Image {
    if sigma <= 0.0 {
        return channel.clone();
    }
    #[allow(clippy::cast_possible_truncation)]
    let sigma = sigma as f32;
    imageproc::filter::gaussian_blur_f32(channel, sigma)
}
