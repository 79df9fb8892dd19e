//! Threshold-test stage: binary threshold of the brightness channel.
//!
//! Used standalone on the resized source, and chained after the halo
//! correction in the combined mode. In the combined mode a correction
//! parameter change forces the threshold result out of the shared cache
//! even when the threshold level itself is unchanged.

use crate::cache::{ConversionCache, expect_rgb8, keys};
use crate::diagnostics::StageCounters;
use crate::params::{ParamKey, Params, canonical_f64, threshold_changed};
use crate::types::PixelBuffer;
use crate::{hsv, ops};

/// Threshold the resized source, memoised under [`keys::THR_RESULT`].
/// Returns the result key.
pub(crate) fn convert(
    cache: &mut ConversionCache,
    counters: &mut StageCounters,
    params: &Params,
) -> &'static str {
    invalidate(cache, params, false);
    cache.set_param(
        ParamKey::ThresholdValue,
        canonical_f64(params.threshold_value()),
    );
    ensure_result(cache, counters, keys::RESIZED, params.threshold_value());
    keys::THR_RESULT
}

/// Drop the threshold result when the level changed, or unconditionally
/// when `force` is set (the combined mode forces after a correction
/// parameter change). Returns whether anything was dropped.
pub(crate) fn invalidate(cache: &mut ConversionCache, params: &Params, force: bool) -> bool {
    if force || threshold_changed(cache, params) {
        cache.drop_buffer(keys::THR_RESULT);
        cache.clear_encoded();
        return true;
    }
    false
}

/// Compute the threshold result from the RGB buffer under `source_key`
/// unless it is already cached.
///
/// Samples with brightness strictly above `threshold_value` become 255,
/// everything else 0.
pub(crate) fn ensure_result(
    cache: &mut ConversionCache,
    counters: &mut StageCounters,
    source_key: &'static str,
    threshold_value: f64,
) {
    if cache.has_buffer(keys::THR_RESULT) {
        return;
    }
    counters.record(keys::THR_RESULT);
    let result = {
        let source = expect_rgb8(cache, source_key);
        let channel = hsv::value_channel(source);
        ops::threshold_binary(&channel, threshold_value)
    };
    cache.put_buffer(keys::THR_RESULT, PixelBuffer::GrayF32(result));
}
