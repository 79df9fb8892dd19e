//! Resize gatekeeper: sanitise the requested output size, keep the source
//! aspect ratio, and decide whether the cached resized source is still
//! fit for purpose.
//!
//! Conversions run on a shrunk copy of the source so that interactive
//! parameter sweeps at preview size stay cheap. The cached resized copy is
//! reused across requests as long as the requested size stays within a
//! multiplicative tolerance band of it: the upper bound forbids serving an
//! upscale of the cached copy and absorbs pixel-level jitter from window
//! resizes, while the lower bound lets the whole cache shrink once the
//! view gets substantially smaller.

use std::path::Path;

use image::imageops::FilterType;
use tracing::{debug, warn};

use crate::cache::{ConversionCache, expect_rgb8, keys};
use crate::diagnostics::StageCounters;
use crate::types::{ConvertError, PixelBuffer, RgbImage};

/// Multiplicative band within which a cached resized source is reused.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeTolerance {
    lower: f64,
    upper: f64,
}

impl Default for SizeTolerance {
    fn default() -> Self {
        Self {
            lower: 0.8,
            upper: 1.1,
        }
    }
}

impl SizeTolerance {
    /// Build a tolerance band.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::InvalidTolerance`] unless
    /// `lower` is in `(0, 1]` and `upper` is at least `1`.
    pub fn new(lower: f64, upper: f64) -> Result<Self, ConvertError> {
        if !(lower > 0.0 && lower <= 1.0) {
            return Err(ConvertError::InvalidTolerance(format!(
                "lower bound {lower} must be in (0, 1]",
            )));
        }
        if upper < 1.0 {
            return Err(ConvertError::InvalidTolerance(format!(
                "upper bound {upper} must be at least 1",
            )));
        }
        Ok(Self { lower, upper })
    }

    /// Lower bound of the band.
    #[must_use]
    pub fn lower(&self) -> f64 {
        self.lower
    }

    /// Upper bound of the band.
    #[must_use]
    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Whether `desired / cached` falls outside the band.
    fn breached(&self, desired: u32, cached: u32) -> bool {
        let ratio = f64::from(desired) / f64::from(cached);
        ratio > self.upper || ratio < self.lower
    }
}

/// Ensure the cache holds a resized source for the requested size.
///
/// Returns `false` when the source cannot be decoded (the failure is
/// cached as an empty buffer so the codec is not re-hit on every
/// request); otherwise the `resized` entry is present and `true` is
/// returned.
///
/// A tolerance breach resets the whole cache: the decoded source is the
/// only entry that survives, via a deep copy taken before the reset.
pub(crate) fn prepare_resized_source(
    cache: &mut ConversionCache,
    counters: &mut StageCounters,
    path: &Path,
    desired_width: i32,
    desired_height: i32,
    tolerance: SizeTolerance,
) -> bool {
    if !cache.has_buffer(keys::SRC) {
        counters.record(keys::SRC);
        let decoded = match image::open(path) {
            Ok(img) => img.to_rgb8(),
            Err(error) => {
                warn!(path = %path.display(), %error, "image decoding failed");
                RgbImage::new(0, 0)
            }
        };
        cache.put_buffer(keys::SRC, PixelBuffer::Rgb8(decoded));
    }

    let (src_w, src_h) = match cache.rgb8(keys::SRC) {
        Some(src) if src.width() > 0 && src.height() > 0 => (src.width(), src.height()),
        _ => return false,
    };

    let (out_w, out_h) = sanitize_size(desired_width, desired_height, src_w, src_h);

    // Tolerance check against an existing resized copy.
    let breach = cache.rgb8(keys::RESIZED).is_some_and(|cached| {
        tolerance.breached(out_w, cached.width()) || tolerance.breached(out_h, cached.height())
    });
    if breach {
        debug!(
            out_w,
            out_h,
            "requested size outside tolerance of cached resized source",
        );
        // Deep-copy the decoded source across the reset; everything else
        // is recomputed at the new working size.
        let src_copy = cache.rgb8(keys::SRC).cloned();
        let source_path = cache.source_path().to_path_buf();
        cache.init(&source_path);
        if let Some(copy) = src_copy {
            cache.put_buffer(keys::SRC, PixelBuffer::Rgb8(copy));
        }
    }

    if !cache.has_buffer(keys::RESIZED) {
        counters.record(keys::RESIZED);
        let resized = {
            let src = expect_rgb8(cache, keys::SRC);
            if (src.width(), src.height()) == (out_w, out_h) {
                src.clone()
            } else {
                // The requested size is never larger than the source, so
                // this is always a shrink.
                image::imageops::resize(src, out_w, out_h, FilterType::Triangle)
            }
        };
        cache.put_buffer(keys::RESIZED, PixelBuffer::Rgb8(resized));
    }

    true
}

/// Sanitise a requested output size against the source dimensions.
///
/// Non-positive requests mean "no resize". Upscaling is forbidden, so
/// each dimension clamps to the source first; the smaller result then
/// drives the other through the source aspect ratio.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn sanitize_size(
    desired_width: i32,
    desired_height: i32,
    src_width: u32,
    src_height: u32,
) -> (u32, u32) {
    let should_resize = desired_width > 0
        && desired_height > 0
        && (i64::from(desired_width) < i64::from(src_width)
            || i64::from(desired_height) < i64::from(src_height));
    if !should_resize {
        return (src_width, src_height);
    }

    let mut out_w = (desired_width as u32).min(src_width);
    let mut out_h = (desired_height as u32).min(src_height);

    let ratio = f64::from(src_width) / f64::from(src_height);
    if ratio >= 1.0 {
        // Landscape: keep the width, recompute the height.
        out_h = (f64::from(out_w) / ratio) as u32;
    } else {
        // Portrait: keep the height, recompute the width.
        out_w = (f64::from(out_h) * ratio) as u32;
    }

    (out_w.max(1), out_h.max(1))
}
