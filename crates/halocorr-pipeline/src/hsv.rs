//! RGB ↔ HSV conversion on float channels.
//!
//! Follows the float convention of the correction algorithm: for 8-bit
//! input lifted to 32-bit float, H is in degrees `[0, 360)`, S is in
//! `[0, 1]`, and V keeps the input scale `[0, 255]` (V is the maximum
//! channel). The brightness pipeline only ever rewrites V; H and S pass
//! through untouched, so the round trip preserves hue exactly up to
//! float error.

use crate::types::{GrayF32Image, RgbImage};

/// Convert one RGB sample (each channel in `[0, 255]`) to HSV.
#[must_use]
pub fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = v - min;

    let s = if v > 0.0 { delta / v } else { 0.0 };

    let h = if delta > 0.0 {
        let h = if r >= g && r >= b {
            60.0 * (g - b) / delta
        } else if g >= b {
            120.0 + 60.0 * (b - r) / delta
        } else {
            240.0 + 60.0 * (r - g) / delta
        };
        if h < 0.0 { h + 360.0 } else { h }
    } else {
        0.0
    };

    (h, s, v)
}

/// Convert one HSV sample (H in degrees, S in `[0, 1]`, V in `[0, 255]`)
/// back to RGB in the V scale.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    if s <= 0.0 {
        return (v, v, v);
    }

    let mut sector = (h / 60.0) % 6.0;
    if sector < 0.0 {
        sector += 6.0;
    }
    let i = sector.floor();
    let f = sector - i;

    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    match i as u32 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

/// Split an RGB image into float H, S, and V channels.
#[must_use]
pub fn split_hsv(source: &RgbImage) -> (GrayF32Image, GrayF32Image, GrayF32Image) {
    let (w, h) = (source.width(), source.height());
    let mut hue = GrayF32Image::new(w, h);
    let mut sat = GrayF32Image::new(w, h);
    let mut val = GrayF32Image::new(w, h);

    for (x, y, pixel) in source.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let (ph, ps, pv) = rgb_to_hsv(f32::from(r), f32::from(g), f32::from(b));
        hue.put_pixel(x, y, image::Luma([ph]));
        sat.put_pixel(x, y, image::Luma([ps]));
        val.put_pixel(x, y, image::Luma([pv]));
    }

    (hue, sat, val)
}

/// Extract only the brightness (V) channel of an RGB image.
#[must_use]
pub fn value_channel(source: &RgbImage) -> GrayF32Image {
    GrayF32Image::from_fn(source.width(), source.height(), |x, y| {
        let [r, g, b] = source.get_pixel(x, y).0;
        image::Luma([f32::from(r).max(f32::from(g)).max(f32::from(b))])
    })
}

/// Merge H, S, and V channels back into an 8-bit RGB image.
///
/// The float result saturates into `[0, 255]` with rounding.
///
/// All three channels must share the same dimensions; samples outside a
/// smaller channel read as zero.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn merge_hsv_to_rgb8(h: &GrayF32Image, s: &GrayF32Image, v: &GrayF32Image) -> RgbImage {
    let saturate = |sample: f32| sample.round().clamp(0.0, 255.0) as u8;

    RgbImage::from_fn(v.width(), v.height(), |x, y| {
        let hue = h.get_pixel(x, y).0[0];
        let sat = s.get_pixel(x, y).0[0];
        let val = v.get_pixel(x, y).0[0];
        let (r, g, b) = hsv_to_rgb(hue, sat, val);
        image::Rgb([saturate(r), saturate(g), saturate(b)])
    })
}

#[cfg(test)]
#[allow(clippy::cast_possible_truncation)]
mod tests {
    use super::*;

    fn assert_close(actual: f32, expected: f32, tolerance: f32, label: &str) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "{label}: expected {expected}, got {actual}",
        );
    }

    #[test]
    fn primary_colors_map_to_known_hues() {
        let (h, s, v) = rgb_to_hsv(255.0, 0.0, 0.0);
        assert_close(h, 0.0, 1e-4, "red hue");
        assert_close(s, 1.0, 1e-6, "red saturation");
        assert_close(v, 255.0, 1e-6, "red value");

        let (h, _, _) = rgb_to_hsv(0.0, 255.0, 0.0);
        assert_close(h, 120.0, 1e-4, "green hue");

        let (h, _, _) = rgb_to_hsv(0.0, 0.0, 255.0);
        assert_close(h, 240.0, 1e-4, "blue hue");
    }

    #[test]
    fn grey_has_zero_saturation_and_hue() {
        let (h, s, v) = rgb_to_hsv(128.0, 128.0, 128.0);
        assert_close(h, 0.0, 1e-6, "grey hue");
        assert_close(s, 0.0, 1e-6, "grey saturation");
        assert_close(v, 128.0, 1e-6, "grey value");
    }

    #[test]
    fn black_is_fully_desaturated() {
        let (h, s, v) = rgb_to_hsv(0.0, 0.0, 0.0);
        assert_close(h, 0.0, 1e-6, "black hue");
        assert_close(s, 0.0, 1e-6, "black saturation");
        assert_close(v, 0.0, 1e-6, "black value");
    }

    #[test]
    fn value_is_the_maximum_channel() {
        let (_, _, v) = rgb_to_hsv(10.0, 200.0, 90.0);
        assert_close(v, 200.0, 1e-6, "value");
    }

    #[test]
    fn hue_is_never_negative() {
        // Magenta-ish color exercises the negative hue branch.
        let (h, _, _) = rgb_to_hsv(255.0, 0.0, 128.0);
        assert!((0.0..360.0).contains(&h), "hue out of range: {h}");
    }

    #[test]
    fn sample_round_trip_is_exact_within_float_error() {
        for (r, g, b) in [
            (255.0, 0.0, 0.0),
            (12.0, 240.0, 100.0),
            (200.0, 200.0, 50.0),
            (0.0, 0.0, 0.0),
            (77.0, 77.0, 77.0),
            (255.0, 254.0, 253.0),
        ] {
            let (h, s, v) = rgb_to_hsv(r, g, b);
            let (r2, g2, b2) = hsv_to_rgb(h, s, v);
            assert_close(r2, r, 1e-3, "red round trip");
            assert_close(g2, g, 1e-3, "green round trip");
            assert_close(b2, b, 1e-3, "blue round trip");
        }
    }

    #[test]
    fn split_produces_matching_dimensions() {
        let source = RgbImage::from_pixel(6, 4, image::Rgb([50, 100, 150]));
        let (h, s, v) = split_hsv(&source);
        for channel in [&h, &s, &v] {
            assert_eq!(channel.width(), 6);
            assert_eq!(channel.height(), 4);
        }
        assert_close(v.get_pixel(0, 0).0[0], 150.0, 1e-6, "split value");
    }

    #[test]
    fn value_channel_matches_split() {
        let source = RgbImage::from_fn(8, 8, |x, y| {
            image::Rgb([(x * 30) as u8, (y * 25) as u8, 120])
        });
        let (_, _, v) = split_hsv(&source);
        let direct = value_channel(&source);
        for (a, b) in v.pixels().zip(direct.pixels()) {
            assert_close(a.0[0], b.0[0], 1e-6, "value channel");
        }
    }

    #[test]
    fn image_round_trip_preserves_pixels() {
        let source = RgbImage::from_fn(16, 16, |x, y| {
            image::Rgb([(x * 16) as u8, (y * 16) as u8, ((x + y) * 8) as u8])
        });
        let (h, s, v) = split_hsv(&source);
        let back = merge_hsv_to_rgb8(&h, &s, &v);
        for (original, merged) in source.pixels().zip(back.pixels()) {
            for c in 0..3 {
                let diff = i16::from(original.0[c]) - i16::from(merged.0[c]);
                assert!(
                    diff.abs() <= 1,
                    "channel {c}: {} vs {}",
                    original.0[c],
                    merged.0[c],
                );
            }
        }
    }
}
