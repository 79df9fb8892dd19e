//! Blurred-filter stage: preview of the background estimate the halo
//! correction divides by.
//!
//! Two-entry dependency ladder: the extracted brightness channel
//! ([`keys::BF_V`]) depends only on the source, while the blurred and
//! remapped result ([`keys::BF_RESULT`]) also depends on `SIGMA`. A sigma
//! change therefore drops only the result and reuses the channel.

use crate::cache::{ConversionCache, expect_gray_f32, expect_rgb8, keys};
use crate::diagnostics::StageCounters;
use crate::params::{ParamKey, Params, canonical_f64};
use crate::types::PixelBuffer;
use crate::{blur, hsv, ops};

/// Produce the blurred-filter preview for the resized source, memoised
/// under [`keys::BF_RESULT`]. Returns the result key.
pub(crate) fn convert(
    cache: &mut ConversionCache,
    counters: &mut StageCounters,
    params: &Params,
) -> &'static str {
    let sigma = params.sigma();
    let canonical = canonical_f64(sigma);

    if cache.get_param(ParamKey::Sigma) != Some(canonical.as_str()) {
        cache.drop_buffer(keys::BF_RESULT);
        cache.clear_encoded();
    }
    cache.set_param(ParamKey::Sigma, canonical);

    if !cache.has_buffer(keys::BF_V) {
        counters.record(keys::BF_V);
        let channel = {
            let source = expect_rgb8(cache, keys::RESIZED);
            hsv::value_channel(source)
        };
        cache.put_buffer(keys::BF_V, PixelBuffer::GrayF32(channel));
    }

    if !cache.has_buffer(keys::BF_RESULT) {
        counters.record(keys::BF_RESULT);
        let result = {
            let channel = expect_gray_f32(cache, keys::BF_V);
            let blurred = blur::blur_scaled(channel, sigma);
            let stats = ops::min_max_loc(&blurred);
            ops::remap_to_0_255(&blurred, &stats)
        };
        cache.put_buffer(keys::BF_RESULT, PixelBuffer::GrayF32(result));
    }

    keys::BF_RESULT
}
