//! Per-mode memoisation of pixel buffers, channel stats, and encoded bytes.
//!
//! One [`ConversionCache`] exists per [`ConversionMode`]; it is keyed by
//! the source path and a snapshot of the parameters under which its
//! entries were computed. Stage functions insert intermediates under the
//! semantic keys in [`keys`], and the invalidation logic drops exactly the
//! entries downstream of a changed input.
//!
//! Ownership: the cache exclusively owns every stored buffer. Replacing an
//! entry or clearing the cache drops the previous backing storage exactly
//! once; lookups return borrows, which the borrow checker prevents from
//! outliving the next mutating call.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::params::{ParamKey, Params};
use crate::types::{ChannelStats, GrayF32Image, PixelBuffer, RgbImage};

/// Semantic keys of the cached intermediates.
pub mod keys {
    /// Decoded source image.
    pub const SRC: &str = "src";
    /// Source shrunk to the active working size.
    pub const RESIZED: &str = "resized";
    /// Deep copy returned by the pass-through mode.
    pub const DUPLICATE_RESULT: &str = "duplicate_result";
    /// Greyscale conversion result.
    pub const GREY_RESULT: &str = "grey_result";
    /// Brightness channel feeding the blurred-filter preview.
    pub const BF_V: &str = "bf_v";
    /// Blurred-filter preview result.
    pub const BF_RESULT: &str = "bf_result";
    /// Binary threshold result.
    pub const THR_RESULT: &str = "thr_result";
    /// Hue channel of the HSV split.
    pub const H: &str = "h";
    /// Saturation channel of the HSV split.
    pub const S: &str = "s";
    /// Brightness channel of the HSV split.
    pub const V: &str = "v";
    /// Min/max stats of the brightness channel.
    pub const V_MINMAX: &str = "v_minmax";
    /// Brightness divided by its blurred background, remapped to `[0, 255]`.
    pub const V_DIV_0_255: &str = "v_div_0_255";
    /// Noise-reduced brightness, remapped to `[0, 255]`.
    pub const V_NEW_0_255: &str = "v_new_0_255";
    /// Corrected brightness after the contrast policy is applied.
    pub const V_CORRECTED: &str = "v_corrected";
    /// Final corrected RGB image.
    pub const CL_RESULT: &str = "cl_result";
}

/// Keyed memo for a single conversion mode.
#[derive(Debug, Default)]
pub struct ConversionCache {
    source_path: PathBuf,
    params: Params,
    buffers: HashMap<&'static str, PixelBuffer>,
    stats: HashMap<&'static str, ChannelStats>,
    encoded: HashMap<String, Vec<u8>>,
}

impl ConversionCache {
    /// Whether `path` is the source this cache is keyed on.
    ///
    /// Two empty paths compare equal, so a freshly cleared cache matches
    /// only an empty request path.
    #[must_use]
    pub fn is_same_source(&self, path: &Path) -> bool {
        self.source_path == path
    }

    /// The source path this cache is keyed on (empty when unkeyed).
    #[must_use]
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Whether a buffer is cached under `key`.
    #[must_use]
    pub fn has_buffer(&self, key: &str) -> bool {
        self.buffers.contains_key(key)
    }

    /// Borrow the buffer cached under `key`.
    #[must_use]
    pub fn get_buffer(&self, key: &str) -> Option<&PixelBuffer> {
        self.buffers.get(key)
    }

    /// Borrow the buffer under `key` as an RGB 8-bit image.
    #[must_use]
    pub fn rgb8(&self, key: &str) -> Option<&RgbImage> {
        self.buffers.get(key).and_then(PixelBuffer::as_rgb8)
    }

    /// Borrow the buffer under `key` as a single-channel float image.
    #[must_use]
    pub fn gray_f32(&self, key: &str) -> Option<&GrayF32Image> {
        self.buffers.get(key).and_then(PixelBuffer::as_gray_f32)
    }

    /// Store a buffer under `key`, dropping any previous buffer at that
    /// key first.
    pub fn put_buffer(&mut self, key: &'static str, buffer: PixelBuffer) {
        self.buffers.remove(key);
        self.buffers.insert(key, buffer);
    }

    /// Drop the buffer cached under `key`, if any.
    pub fn drop_buffer(&mut self, key: &str) {
        if self.buffers.remove(key).is_some() {
            debug!(key, "dropped cached buffer");
        }
    }

    /// Whether stats are cached under `key`.
    #[must_use]
    pub fn has_stat(&self, key: &str) -> bool {
        self.stats.contains_key(key)
    }

    /// The stats cached under `key`.
    #[must_use]
    pub fn get_stat(&self, key: &str) -> Option<ChannelStats> {
        self.stats.get(key).copied()
    }

    /// Store stats under `key`.
    pub fn put_stat(&mut self, key: &'static str, stats: ChannelStats) {
        self.stats.insert(key, stats);
    }

    /// Remove the stats cached under `key`, if any.
    pub fn drop_stat(&mut self, key: &str) {
        self.stats.remove(key);
    }

    /// Whether encoded bytes are cached for `output_type`.
    #[must_use]
    pub fn has_encoded(&self, output_type: &str) -> bool {
        self.encoded.contains_key(output_type)
    }

    /// Borrow the encoded bytes cached for `output_type`.
    #[must_use]
    pub fn get_encoded(&self, output_type: &str) -> Option<&[u8]> {
        self.encoded.get(output_type).map(Vec::as_slice)
    }

    /// Store encoded bytes for `output_type`, dropping any previous bytes
    /// for that type first.
    pub fn put_encoded(&mut self, output_type: &str, bytes: Vec<u8>) {
        self.encoded.remove(output_type);
        self.encoded.insert(output_type.to_string(), bytes);
    }

    /// Drop every cached encoded image.
    ///
    /// Called whenever a parameter change invalidates pixel intermediates,
    /// since the encoded bytes depend on everything upstream.
    pub fn clear_encoded(&mut self) {
        self.encoded.clear();
    }

    /// Whether the snapshot contains `key`.
    #[must_use]
    pub fn has_param(&self, key: ParamKey) -> bool {
        self.params.contains(key)
    }

    /// The canonical value recorded for `key`, if any.
    #[must_use]
    pub fn get_param(&self, key: ParamKey) -> Option<&str> {
        self.params.get(key)
    }

    /// Record the canonical parameter value the cached entries were
    /// computed under.
    pub fn set_param(&mut self, key: ParamKey, canonical: String) {
        self.params.insert_canonical(key, canonical);
    }

    /// Exact equality between `params` and the cached snapshot.
    #[must_use]
    pub fn same_params(&self, params: &Params) -> bool {
        self.params == *params
    }

    /// Drop every cached buffer, stat, and encoded image.
    pub fn clear_all_buffers(&mut self) {
        self.buffers.clear();
        self.stats.clear();
        self.encoded.clear();
    }

    /// Forget the parameter snapshot.
    pub fn clear_params(&mut self) {
        self.params.clear();
    }

    /// Full reset, then key the cache on `path`.
    pub fn init(&mut self, path: &Path) {
        debug!(path = %path.display(), "cache reset");
        self.clear_params();
        self.clear_all_buffers();
        self.source_path = path.to_path_buf();
    }

    /// Full reset with an empty source path.
    pub fn clear(&mut self) {
        self.init(Path::new(""));
    }
}

/// Borrow an RGB intermediate that an earlier step is guaranteed to have
/// inserted. A miss here is a bug in the stage ordering, not a runtime
/// condition.
pub(crate) fn expect_rgb8<'c>(cache: &'c ConversionCache, key: &'static str) -> &'c RgbImage {
    match cache.rgb8(key) {
        Some(img) => img,
        None => unreachable!("intermediate `{key}` not ensured before use"),
    }
}

/// Borrow a float-channel intermediate that an earlier step is guaranteed
/// to have inserted.
pub(crate) fn expect_gray_f32<'c>(
    cache: &'c ConversionCache,
    key: &'static str,
) -> &'c GrayF32Image {
    match cache.gray_f32(key) {
        Some(img) => img,
        None => unreachable!("intermediate `{key}` not ensured before use"),
    }
}
