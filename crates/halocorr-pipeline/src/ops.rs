//! Arithmetic primitives over float channels.
//!
//! Small, deterministic building blocks the stage functions compose:
//! min/max scans, scalar arithmetic, pixelwise division, linear remapping
//! into `[0, 255]`, thresholding, and the saturating return to 8-bit.

use crate::types::{ChannelStats, GrayF32Image, GrayImage};

/// Scan a float channel for its minimum and maximum and where they occur.
///
/// An empty channel reports zeros. Non-finite samples are skipped.
#[must_use]
pub fn min_max_loc(channel: &GrayF32Image) -> ChannelStats {
    let mut stats = ChannelStats {
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
        min_pos: (0, 0),
        max_pos: (0, 0),
    };

    for (x, y, pixel) in channel.enumerate_pixels() {
        let sample = f64::from(pixel.0[0]);
        if !sample.is_finite() {
            continue;
        }
        if sample < stats.min {
            stats.min = sample;
            stats.min_pos = (x, y);
        }
        if sample > stats.max {
            stats.max = sample;
            stats.max_pos = (x, y);
        }
    }

    if stats.min > stats.max {
        // Nothing scanned.
        stats.min = 0.0;
        stats.max = 0.0;
    }
    stats
}

/// Add a scalar to every sample.
#[must_use]
pub fn add_scalar(channel: &GrayF32Image, value: f32) -> GrayF32Image {
    map_samples(channel, |sample| sample + value)
}

/// Subtract a scalar from every sample.
#[must_use]
pub fn subtract_scalar(channel: &GrayF32Image, value: f32) -> GrayF32Image {
    map_samples(channel, |sample| sample - value)
}

/// Multiply every sample by a scalar.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn scale(channel: &GrayF32Image, factor: f64) -> GrayF32Image {
    let factor = factor as f32;
    map_samples(channel, |sample| sample * factor)
}

/// Pixelwise division `numerator / denominator`.
///
/// Both channels must share the same dimensions.
#[must_use]
pub fn divide(numerator: &GrayF32Image, denominator: &GrayF32Image) -> GrayF32Image {
    GrayF32Image::from_fn(numerator.width(), numerator.height(), |x, y| {
        image::Luma([numerator.get_pixel(x, y).0[0] / denominator.get_pixel(x, y).0[0]])
    })
}

/// Linearly remap a channel into `[0, 255]` using the supplied stats:
/// `(sample - min) * 255 / (max - min)`.
///
/// A constant channel (zero range) remaps to all zeros instead of
/// producing non-finite samples.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn remap_to_0_255(channel: &GrayF32Image, stats: &ChannelStats) -> GrayF32Image {
    let range = stats.range();
    if range <= f64::EPSILON {
        return GrayF32Image::new(channel.width(), channel.height());
    }
    let min = stats.min as f32;
    let factor = (255.0 / range) as f32;
    map_samples(channel, |sample| (sample - min) * factor)
}

/// Binary threshold: samples strictly above `threshold` become `255.0`,
/// everything else `0.0`.
#[must_use]
pub fn threshold_binary(channel: &GrayF32Image, threshold: f64) -> GrayF32Image {
    #[allow(clippy::cast_possible_truncation)]
    let threshold = threshold as f32;
    map_samples(channel, |sample| {
        if sample > threshold { 255.0 } else { 0.0 }
    })
}

/// Threshold-to-zero: negative samples clamp to `0.0`, positive samples
/// pass through unchanged.
#[must_use]
pub fn threshold_to_zero(channel: &GrayF32Image) -> GrayF32Image {
    map_samples(channel, |sample| if sample > 0.0 { sample } else { 0.0 })
}

/// Saturating conversion of a float channel back to 8-bit, with rounding.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn gray_f32_to_u8(channel: &GrayF32Image) -> GrayImage {
    GrayImage::from_fn(channel.width(), channel.height(), |x, y| {
        let sample = channel.get_pixel(x, y).0[0];
        image::Luma([sample.round().clamp(0.0, 255.0) as u8])
    })
}

fn map_samples(channel: &GrayF32Image, f: impl Fn(f32) -> f32) -> GrayF32Image {
    GrayF32Image::from_fn(channel.width(), channel.height(), |x, y| {
        image::Luma([f(channel.get_pixel(x, y).0[0])])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel_from(samples: &[&[f32]]) -> GrayF32Image {
        #[allow(clippy::cast_possible_truncation)]
        let (h, w) = (samples.len() as u32, samples[0].len() as u32);
        GrayF32Image::from_fn(w, h, |x, y| {
            image::Luma([samples[y as usize][x as usize]])
        })
    }

    #[test]
    fn min_max_finds_values_and_positions() {
        let channel = channel_from(&[&[5.0, 1.0, 9.0], &[3.0, 7.0, 2.0]]);
        let stats = min_max_loc(&channel);
        assert!((stats.min - 1.0).abs() < f64::EPSILON);
        assert!((stats.max - 9.0).abs() < f64::EPSILON);
        assert_eq!(stats.min_pos, (1, 0));
        assert_eq!(stats.max_pos, (2, 0));
    }

    #[test]
    fn min_max_of_empty_channel_is_zero() {
        let stats = min_max_loc(&GrayF32Image::new(0, 0));
        assert!((stats.min - 0.0).abs() < f64::EPSILON);
        assert!((stats.max - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn min_max_skips_non_finite_samples() {
        let channel = channel_from(&[&[f32::NAN, 4.0], &[f32::INFINITY, 2.0]]);
        let stats = min_max_loc(&channel);
        assert!((stats.min - 2.0).abs() < f64::EPSILON);
        assert!((stats.max - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn scalar_arithmetic_is_pixelwise() {
        let channel = channel_from(&[&[1.0, 2.0]]);
        assert!((add_scalar(&channel, 1.0).get_pixel(1, 0).0[0] - 3.0).abs() < 1e-6);
        assert!((subtract_scalar(&channel, 1.0).get_pixel(0, 0).0[0] - 0.0).abs() < 1e-6);
        assert!((scale(&channel, 2.5).get_pixel(1, 0).0[0] - 5.0).abs() < 1e-6);
    }

    #[test]
    fn divide_is_pixelwise() {
        let numerator = channel_from(&[&[10.0, 9.0]]);
        let denominator = channel_from(&[&[2.0, 3.0]]);
        let result = divide(&numerator, &denominator);
        assert!((result.get_pixel(0, 0).0[0] - 5.0).abs() < 1e-6);
        assert!((result.get_pixel(1, 0).0[0] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn remap_stretches_to_full_range() {
        let channel = channel_from(&[&[2.0, 4.0, 6.0]]);
        let stats = min_max_loc(&channel);
        let remapped = remap_to_0_255(&channel, &stats);
        assert!((remapped.get_pixel(0, 0).0[0] - 0.0).abs() < 1e-4);
        assert!((remapped.get_pixel(1, 0).0[0] - 127.5).abs() < 1e-4);
        assert!((remapped.get_pixel(2, 0).0[0] - 255.0).abs() < 1e-4);
    }

    #[test]
    fn remap_of_constant_channel_is_all_zero() {
        let channel = channel_from(&[&[7.0, 7.0, 7.0]]);
        let stats = min_max_loc(&channel);
        let remapped = remap_to_0_255(&channel, &stats);
        for pixel in remapped.pixels() {
            assert!((pixel.0[0] - 0.0).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn binary_threshold_is_strictly_greater() {
        let channel = channel_from(&[&[126.0, 127.0, 128.0]]);
        let result = threshold_binary(&channel, 127.0);
        assert!((result.get_pixel(0, 0).0[0] - 0.0).abs() < f32::EPSILON);
        assert!((result.get_pixel(1, 0).0[0] - 0.0).abs() < f32::EPSILON);
        assert!((result.get_pixel(2, 0).0[0] - 255.0).abs() < f32::EPSILON);
    }

    #[test]
    fn threshold_to_zero_clamps_negatives_only() {
        let channel = channel_from(&[&[-3.0, 0.0, 4.5]]);
        let result = threshold_to_zero(&channel);
        assert!((result.get_pixel(0, 0).0[0] - 0.0).abs() < f32::EPSILON);
        assert!((result.get_pixel(1, 0).0[0] - 0.0).abs() < f32::EPSILON);
        assert!((result.get_pixel(2, 0).0[0] - 4.5).abs() < f32::EPSILON);
    }

    #[test]
    fn u8_conversion_saturates_and_rounds() {
        let channel = channel_from(&[&[-10.0, 0.4, 0.6, 254.6, 300.0]]);
        let result = gray_f32_to_u8(&channel);
        assert_eq!(result.get_pixel(0, 0).0[0], 0);
        assert_eq!(result.get_pixel(1, 0).0[0], 0);
        assert_eq!(result.get_pixel(2, 0).0[0], 1);
        assert_eq!(result.get_pixel(3, 0).0[0], 255);
        assert_eq!(result.get_pixel(4, 0).0[0], 255);
    }
}
