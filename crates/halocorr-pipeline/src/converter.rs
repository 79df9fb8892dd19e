//! The converter: per-mode caches, the pipeline dispatcher, and the
//! encoded-output memo.
//!
//! One [`Converter`] holds a [`ConversionCache`] per [`ConversionMode`]
//! plus the computation counters. It is deliberately not thread-safe:
//! every request runs to completion on the caller's thread and borrows
//! the caches mutably, so callers that need concurrency wrap the
//! converter in their own serialising owner (a mutex or a dedicated
//! worker) and marshal the returned bytes back.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::cache::{ConversionCache, expect_rgb8, keys};
use crate::diagnostics::StageCounters;
use crate::encode;
use crate::params::Params;
use crate::resize::{self, SizeTolerance};
use crate::types::{ConversionMode, ConvertError, PixelBuffer};
use crate::{blurred, correction, format, greyscale, threshold};

/// Cached, parameterised image converter.
#[derive(Debug, Default)]
pub struct Converter {
    caches: HashMap<ConversionMode, ConversionCache>,
    tolerance: SizeTolerance,
    counters: StageCounters,
}

impl Converter {
    /// A converter with empty caches and the default size tolerance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the resize tolerance band.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::InvalidTolerance`] for bounds outside
    /// their legal ranges (lower in `(0, 1]`, upper at least `1`).
    pub fn set_size_tolerance(&mut self, lower: f64, upper: f64) -> Result<(), ConvertError> {
        self.tolerance = SizeTolerance::new(lower, upper)?;
        Ok(())
    }

    /// The active resize tolerance band.
    #[must_use]
    pub fn size_tolerance(&self) -> SizeTolerance {
        self.tolerance
    }

    /// Drop everything cached for `mode`.
    pub fn clear_cache(&mut self, mode: ConversionMode) {
        if let Some(cache) = self.caches.get_mut(&mode) {
            cache.clear();
        }
    }

    /// Drop everything cached for every mode.
    pub fn clear_all_caches(&mut self) {
        for cache in self.caches.values_mut() {
            cache.clear();
        }
    }

    /// Computation counters for the cached intermediates.
    #[must_use]
    pub fn diagnostics(&self) -> &StageCounters {
        &self.counters
    }

    /// Reset the computation counters.
    pub fn reset_diagnostics(&mut self) {
        self.counters.reset();
    }

    /// Convert `path` according to `mode` and `params`, encode the result
    /// as `output_type`, and return the encoded bytes.
    ///
    /// `desired_width`/`desired_height` cap the working size; values of
    /// zero or below mean "use the source dimensions". The aspect ratio
    /// is always preserved and upscaling never happens.
    ///
    /// Returns `Ok(None)` when the source cannot be decoded or the result
    /// cannot be encoded. The returned bytes are an independent copy; the
    /// cache keeps its own.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::UnsupportedOutputType`] before any work,
    /// including cache access, when `output_type` is not on the
    /// allowlist.
    pub fn convert(
        &mut self,
        path: &Path,
        mode: ConversionMode,
        output_type: &str,
        params: &Params,
        desired_width: i32,
        desired_height: i32,
    ) -> Result<Option<Vec<u8>>, ConvertError> {
        if !format::is_supported_output_type(output_type) {
            return Err(ConvertError::UnsupportedOutputType(output_type.to_string()));
        }

        let cache = self.caches.entry(mode).or_default();

        if !cache.is_same_source(path) {
            cache.init(path);
        }

        if !resize::prepare_resized_source(
            cache,
            &mut self.counters,
            path,
            desired_width,
            desired_height,
            self.tolerance,
        ) {
            return Ok(None);
        }

        // Only the parameters this mode consults take part in the memo
        // key; extra keys on the request are ignored.
        let relevant = params.subset(mode.parameter_keys());

        if cache.is_same_source(path) && cache.same_params(&relevant) {
            if let Some(bytes) = cache.get_encoded(output_type) {
                debug!(%mode, output_type, "returning cached encoded bytes");
                return Ok(Some(bytes.to_vec()));
            }
        }

        let result_key = match mode {
            ConversionMode::None => duplicate(cache, &mut self.counters),
            ConversionMode::Greyscale => greyscale::convert(cache, &mut self.counters),
            ConversionMode::ClCorrection => {
                correction::convert(cache, &mut self.counters, &relevant)
            }
            ConversionMode::BlurredFilter => {
                blurred::convert(cache, &mut self.counters, &relevant)
            }
            ConversionMode::ThresholdTest => {
                threshold::convert(cache, &mut self.counters, &relevant)
            }
            ConversionMode::ClCorrectionThresholdTest => {
                correction::convert_with_threshold(cache, &mut self.counters, &relevant)
            }
        };

        let Some(result) = cache.get_buffer(result_key) else {
            return Ok(None);
        };
        let Some(bytes) = encode::encode(result, output_type) else {
            return Ok(None);
        };

        cache.put_encoded(output_type, bytes.clone());
        Ok(Some(bytes))
    }
}

/// Pass-through conversion: a cached deep copy of the resized source.
fn duplicate(cache: &mut ConversionCache, counters: &mut StageCounters) -> &'static str {
    if !cache.has_buffer(keys::DUPLICATE_RESULT) {
        counters.record(keys::DUPLICATE_RESULT);
        let copy = expect_rgb8(cache, keys::RESIZED).clone();
        cache.put_buffer(keys::DUPLICATE_RESULT, PixelBuffer::Rgb8(copy));
    }
    keys::DUPLICATE_RESULT
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn tolerance_setter_validates_bounds() {
        let mut converter = Converter::new();
        assert!(converter.set_size_tolerance(0.5, 1.2).is_ok());
        assert!(converter.set_size_tolerance(0.0, 1.2).is_err());
        assert!(converter.set_size_tolerance(0.5, 0.9).is_err());
        // The last valid band stays active.
        assert!((converter.size_tolerance().lower() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn unsupported_output_is_rejected_without_touching_caches() {
        let mut converter = Converter::new();
        let result = converter.convert(
            Path::new("missing.png"),
            ConversionMode::None,
            "gif",
            &Params::new(),
            -1,
            -1,
        );
        assert!(matches!(result, Err(ConvertError::UnsupportedOutputType(t)) if t == "gif"));
        assert_eq!(converter.diagnostics().total(), 0);
    }

    #[test]
    fn missing_file_converts_to_none() {
        let mut converter = Converter::new();
        let result = converter
            .convert(
                Path::new("definitely/not/here.png"),
                ConversionMode::None,
                "png",
                &Params::new(),
                -1,
                -1,
            )
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn failed_decode_is_cached_as_empty() {
        let mut converter = Converter::new();
        let path = Path::new("definitely/not/here.png");
        for _ in 0..3 {
            let result = converter
                .convert(path, ConversionMode::None, "png", &Params::new(), -1, -1)
                .unwrap();
            assert!(result.is_none());
        }
        assert_eq!(
            converter.diagnostics().count(keys::SRC),
            1,
            "broken file must be decoded only once",
        );
    }
}
