//! Cathodo-luminescence correction stage.
//!
//! The halo is modelled as a smooth multiplicative illumination field:
//! dividing the brightness channel by a heavily blurred copy of itself
//! estimates the underlying reflectance, which is then remapped to
//! `[0, 255]`, optionally denoised, and optionally rescaled back to the
//! original brightness ceiling before the channels are recombined.
//!
//! Every step is a keyed cache entry. The dependency ladder is
//!
//! ```text
//! h, s, v, v_minmax      source only
//! v_div_0_255            SIGMA
//! v_new_0_255            SIGMA, NOISE_REDUCTION
//! v_corrected            SIGMA, NOISE_REDUCTION, MAX_CONTRAST
//! cl_result              SIGMA, NOISE_REDUCTION, MAX_CONTRAST
//! ```
//!
//! and a parameter change drops exactly the transitive closure below it,
//! plus every cached encoded image.

use tracing::debug;

use crate::cache::{ConversionCache, expect_gray_f32, expect_rgb8, keys};
use crate::diagnostics::StageCounters;
use crate::params::{
    ParamKey, Params, canonical_bool, canonical_f64, correction_changes,
};
use crate::types::PixelBuffer;
use crate::{blur, hsv, ops, threshold};

/// Run the correction on the resized source, memoised under
/// [`keys::CL_RESULT`]. Returns the result key.
pub(crate) fn convert(
    cache: &mut ConversionCache,
    counters: &mut StageCounters,
    params: &Params,
) -> &'static str {
    invalidate(cache, params);
    store_params(cache, params);
    ensure_result(cache, counters, params);
    keys::CL_RESULT
}

/// Run the correction, then threshold its output, sharing one cache.
///
/// The invalidation check runs before either stage so a correction
/// parameter change forces the threshold result out even when the
/// threshold level is unchanged.
pub(crate) fn convert_with_threshold(
    cache: &mut ConversionCache,
    counters: &mut StageCounters,
    params: &Params,
) -> &'static str {
    let correction_changed = invalidate(cache, params);
    threshold::invalidate(cache, params, correction_changed);

    store_params(cache, params);
    cache.set_param(
        ParamKey::ThresholdValue,
        canonical_f64(params.threshold_value()),
    );

    ensure_result(cache, counters, params);
    threshold::ensure_result(cache, counters, keys::CL_RESULT, params.threshold_value());
    keys::THR_RESULT
}

/// Drop the intermediates downstream of any changed correction parameter.
/// Returns whether anything changed.
pub(crate) fn invalidate(cache: &mut ConversionCache, params: &Params) -> bool {
    let changes = correction_changes(cache, params);

    if changes.sigma {
        cache.drop_buffer(keys::V_DIV_0_255);
    }
    if changes.sigma || changes.noise_reduction {
        cache.drop_buffer(keys::V_NEW_0_255);
    }
    if changes.any() {
        cache.drop_buffer(keys::V_CORRECTED);
        cache.drop_buffer(keys::CL_RESULT);
        cache.clear_encoded();
        debug!(
            sigma = changes.sigma,
            noise_reduction = changes.noise_reduction,
            max_contrast = changes.max_contrast,
            "correction parameters changed",
        );
    }

    changes.any()
}

fn store_params(cache: &mut ConversionCache, params: &Params) {
    cache.set_param(ParamKey::Sigma, canonical_f64(params.sigma()));
    cache.set_param(
        ParamKey::NoiseReduction,
        canonical_bool(params.noise_reduction()),
    );
    cache.set_param(
        ParamKey::MaxContrast,
        canonical_bool(params.max_contrast()),
    );
}

fn ensure_result(cache: &mut ConversionCache, counters: &mut StageCounters, params: &Params) {
    if cache.has_buffer(keys::CL_RESULT) {
        return;
    }

    ensure_channels(cache, counters);
    ensure_v_stats(cache);
    ensure_v_div(cache, counters, params.sigma());
    ensure_v_new(cache, counters, params.noise_reduction());
    ensure_v_corrected(cache, counters, params.max_contrast());

    counters.record(keys::CL_RESULT);
    let result = {
        let h = expect_gray_f32(cache, keys::H);
        let s = expect_gray_f32(cache, keys::S);
        let v = expect_gray_f32(cache, keys::V_CORRECTED);
        hsv::merge_hsv_to_rgb8(h, s, v)
    };
    cache.put_buffer(keys::CL_RESULT, PixelBuffer::Rgb8(result));
}

/// Split the resized source into float H, S, and V channels.
///
/// The three channels only ever become stale together (a source change
/// resets the whole cache), so they are computed in one pass.
fn ensure_channels(cache: &mut ConversionCache, counters: &mut StageCounters) {
    if cache.has_buffer(keys::H) && cache.has_buffer(keys::S) && cache.has_buffer(keys::V) {
        return;
    }
    counters.record(keys::H);
    counters.record(keys::S);
    counters.record(keys::V);

    let (h, s, v) = {
        let source = expect_rgb8(cache, keys::RESIZED);
        hsv::split_hsv(source)
    };
    cache.put_buffer(keys::H, PixelBuffer::GrayF32(h));
    cache.put_buffer(keys::S, PixelBuffer::GrayF32(s));
    cache.put_buffer(keys::V, PixelBuffer::GrayF32(v));
}

fn ensure_v_stats(cache: &mut ConversionCache) {
    if cache.has_stat(keys::V_MINMAX) {
        return;
    }
    let stats = ops::min_max_loc(expect_gray_f32(cache, keys::V));
    cache.put_stat(keys::V_MINMAX, stats);
}

/// Brightness divided by its blurred background, remapped to `[0, 255]`.
///
/// The `+1` on the blurred background avoids dividing by zero where the
/// background is black; the bias vanishes in the linear remap.
fn ensure_v_div(cache: &mut ConversionCache, counters: &mut StageCounters, sigma: f64) {
    if cache.has_buffer(keys::V_DIV_0_255) {
        return;
    }
    counters.record(keys::V_DIV_0_255);

    let divided_0_255 = {
        let v = expect_gray_f32(cache, keys::V);
        let background = ops::add_scalar(&blur::blur_scaled(v, sigma), 1.0);
        let divided = ops::divide(v, &background);
        let stats = ops::min_max_loc(&divided);
        ops::remap_to_0_255(&divided, &stats)
    };
    cache.put_buffer(keys::V_DIV_0_255, PixelBuffer::GrayF32(divided_0_255));
}

/// Optionally denoised brightness.
///
/// Noise reduction subtracts the minimum of a mildly blurred copy,
/// clamps negatives to zero, and rescales to a 255 peak. Without it the
/// divided channel passes through as a copy.
fn ensure_v_new(cache: &mut ConversionCache, counters: &mut StageCounters, noise_reduction: bool) {
    if cache.has_buffer(keys::V_NEW_0_255) {
        return;
    }
    counters.record(keys::V_NEW_0_255);

    let v_new = {
        let divided = expect_gray_f32(cache, keys::V_DIV_0_255);
        if noise_reduction {
            let low_pass = blur::blur_fixed(divided, blur::NOISE_REDUCTION_SIGMA);
            let floor = ops::min_max_loc(&low_pass).min;
            #[allow(clippy::cast_possible_truncation)]
            let shifted = ops::subtract_scalar(divided, floor as f32);
            let clamped = ops::threshold_to_zero(&shifted);
            let stats = ops::min_max_loc(&clamped);
            let range = stats.range();
            if range > f64::EPSILON {
                ops::scale(&clamped, 255.0 / range)
            } else {
                clamped
            }
        } else {
            divided.clone()
        }
    };
    cache.put_buffer(keys::V_NEW_0_255, PixelBuffer::GrayF32(v_new));
}

/// Apply the contrast policy: either keep the full `[0, 255]` range, or
/// rescale so the peak matches the original brightness ceiling.
fn ensure_v_corrected(
    cache: &mut ConversionCache,
    counters: &mut StageCounters,
    max_contrast: bool,
) {
    if cache.has_buffer(keys::V_CORRECTED) {
        return;
    }
    counters.record(keys::V_CORRECTED);

    let corrected = {
        let v_new = expect_gray_f32(cache, keys::V_NEW_0_255);
        if max_contrast {
            v_new.clone()
        } else {
            let ceiling = cache
                .get_stat(keys::V_MINMAX)
                .map_or(1.0, |stats| stats.max / 255.0);
            ops::scale(v_new, ceiling)
        }
    };
    cache.put_buffer(keys::V_CORRECTED, PixelBuffer::GrayF32(corrected));
}
