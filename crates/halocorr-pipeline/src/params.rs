//! Conversion parameters as a canonical string map.
//!
//! Parameter values are stored as canonical decimal/boolean strings and
//! compared by exact textual equality. Comparing the canonical form
//! sidesteps floating-point equality pitfalls when deciding whether a
//! cached intermediate is still valid: two requests carry the same sigma
//! exactly when their canonical strings match.
//!
//! Only the typed setters can write values, so every stored string is
//! guaranteed to be in canonical form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cache::ConversionCache;
use crate::types::ConversionMode;

/// Keys of the conversion parameter map.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ParamKey {
    /// Blur sigma as a fraction of the shorter image dimension, in `[0, 1]`.
    Sigma,
    /// Whether the correction subtracts the low-pass background minimum.
    NoiseReduction,
    /// Whether the corrected brightness keeps the full `[0, 255]` range
    /// instead of being rescaled to the original brightness ceiling.
    MaxContrast,
    /// Binary threshold level, in `[0, 255]`.
    ThresholdValue,
}

/// Canonical string form of a float parameter value.
#[must_use]
pub fn canonical_f64(value: f64) -> String {
    value.to_string()
}

/// Canonical string form of a boolean parameter value.
#[must_use]
pub fn canonical_bool(value: bool) -> String {
    value.to_string()
}

/// A snapshot of conversion parameters.
///
/// Missing keys read as their defaults (`0.0` / `false`), mirroring how
/// requests omit parameters their mode does not consult.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params(BTreeMap<ParamKey, String>);

impl Params {
    /// An empty parameter map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw canonical value for a key, if present.
    #[must_use]
    pub fn get(&self, key: ParamKey) -> Option<&str> {
        self.0.get(&key).map(String::as_str)
    }

    /// Whether a key is present.
    #[must_use]
    pub fn contains(&self, key: ParamKey) -> bool {
        self.0.contains_key(&key)
    }

    /// Whether no keys are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn insert_canonical(&mut self, key: ParamKey, value: String) {
        self.0.insert(key, value);
    }

    pub(crate) fn clear(&mut self) {
        self.0.clear();
    }

    /// Set the blur sigma multiplier.
    pub fn set_sigma(&mut self, value: f64) {
        self.insert_canonical(ParamKey::Sigma, canonical_f64(value));
    }

    /// Enable or disable noise reduction.
    pub fn set_noise_reduction(&mut self, value: bool) {
        self.insert_canonical(ParamKey::NoiseReduction, canonical_bool(value));
    }

    /// Enable or disable the maximised-contrast output range.
    pub fn set_max_contrast(&mut self, value: bool) {
        self.insert_canonical(ParamKey::MaxContrast, canonical_bool(value));
    }

    /// Set the binary threshold level.
    pub fn set_threshold_value(&mut self, value: f64) {
        self.insert_canonical(ParamKey::ThresholdValue, canonical_f64(value));
    }

    /// Blur sigma multiplier; `0.0` when unset.
    #[must_use]
    pub fn sigma(&self) -> f64 {
        self.parse_f64(ParamKey::Sigma)
    }

    /// Noise reduction flag; `false` when unset.
    #[must_use]
    pub fn noise_reduction(&self) -> bool {
        self.parse_bool(ParamKey::NoiseReduction)
    }

    /// Maximised-contrast flag; `false` when unset.
    #[must_use]
    pub fn max_contrast(&self) -> bool {
        self.parse_bool(ParamKey::MaxContrast)
    }

    /// Binary threshold level; `0.0` when unset.
    #[must_use]
    pub fn threshold_value(&self) -> f64 {
        self.parse_f64(ParamKey::ThresholdValue)
    }

    /// The sub-map containing only `keys`, with values re-canonicalised
    /// through the typed getters so an absent key compares equal to its
    /// default.
    #[must_use]
    pub fn subset(&self, keys: &[ParamKey]) -> Self {
        let mut subset = Self::new();
        for key in keys {
            let value = match key {
                ParamKey::Sigma => canonical_f64(self.sigma()),
                ParamKey::NoiseReduction => canonical_bool(self.noise_reduction()),
                ParamKey::MaxContrast => canonical_bool(self.max_contrast()),
                ParamKey::ThresholdValue => canonical_f64(self.threshold_value()),
            };
            subset.insert_canonical(*key, value);
        }
        subset
    }

    fn parse_f64(&self, key: ParamKey) -> f64 {
        self.get(key)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0.0)
    }

    fn parse_bool(&self, key: ParamKey) -> bool {
        self.get(key)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(false)
    }
}

impl ConversionMode {
    /// The parameter keys this mode consults.
    ///
    /// The dispatcher compares and stores only these keys, so requests
    /// carrying extra parameters still hit the memoised results of modes
    /// that ignore them.
    #[must_use]
    pub fn parameter_keys(self) -> &'static [ParamKey] {
        match self {
            Self::None | Self::Greyscale => &[],
            Self::ClCorrection => &[
                ParamKey::Sigma,
                ParamKey::NoiseReduction,
                ParamKey::MaxContrast,
            ],
            Self::BlurredFilter => &[ParamKey::Sigma],
            Self::ThresholdTest => &[ParamKey::ThresholdValue],
            Self::ClCorrectionThresholdTest => &[
                ParamKey::Sigma,
                ParamKey::NoiseReduction,
                ParamKey::MaxContrast,
                ParamKey::ThresholdValue,
            ],
        }
    }
}

/// Which cathodo-luminescence correction parameters differ from the
/// cache's snapshot.
///
/// A parameter missing from the snapshot counts as changed: a fresh cache
/// recomputes everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrectionChanges {
    /// `SIGMA` differs.
    pub sigma: bool,
    /// `NOISE_REDUCTION` differs.
    pub noise_reduction: bool,
    /// `MAX_CONTRAST` differs.
    pub max_contrast: bool,
}

impl CorrectionChanges {
    /// Whether any correction parameter differs.
    #[must_use]
    pub fn any(self) -> bool {
        self.sigma || self.noise_reduction || self.max_contrast
    }
}

fn param_changed(cache: &ConversionCache, key: ParamKey, canonical: &str) -> bool {
    cache.get_param(key) != Some(canonical)
}

/// Compare the correction parameters in `params` against the cache snapshot.
#[must_use]
pub fn correction_changes(cache: &ConversionCache, params: &Params) -> CorrectionChanges {
    CorrectionChanges {
        sigma: param_changed(cache, ParamKey::Sigma, &canonical_f64(params.sigma())),
        noise_reduction: param_changed(
            cache,
            ParamKey::NoiseReduction,
            &canonical_bool(params.noise_reduction()),
        ),
        max_contrast: param_changed(
            cache,
            ParamKey::MaxContrast,
            &canonical_bool(params.max_contrast()),
        ),
    }
}

/// Whether the threshold level in `params` differs from the cache snapshot.
#[must_use]
pub fn threshold_changed(cache: &ConversionCache, params: &Params) -> bool {
    param_changed(
        cache,
        ParamKey::ThresholdValue,
        &canonical_f64(params.threshold_value()),
    )
}
