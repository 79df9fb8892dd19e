//! File-format gate: the closed allowlist of image types the pipeline
//! accepts and produces.
//!
//! The lists were established by testing the codec against each candidate
//! type: gif, jfif, pbm, and pgm were tried and rejected; anything absent
//! from the lists is untested and treated as unsupported.

use image::ImageFormat;

/// Image types accepted as conversion input.
pub const SUPPORTED_INPUT_TYPES: [&str; 8] =
    ["png", "bmp", "jpg", "jpeg", "tif", "ppm", "pnm", "webp"];

/// Image types the pipeline can encode.
pub const SUPPORTED_OUTPUT_TYPES: [&str; 8] =
    ["png", "bmp", "jpg", "jpeg", "tif", "ppm", "pnm", "webp"];

/// Output type used when a caller asks to save with an unsupported one.
pub const DEFAULT_OUTPUT_TYPE: &str = "png";

/// Whether `file_type` (a lowercase extension, no dot) can be decoded.
#[must_use]
pub fn is_supported_input_type(file_type: &str) -> bool {
    SUPPORTED_INPUT_TYPES.contains(&file_type)
}

/// Whether `file_type` (a lowercase extension, no dot) can be encoded.
#[must_use]
pub fn is_supported_output_type(file_type: &str) -> bool {
    SUPPORTED_OUTPUT_TYPES.contains(&file_type)
}

/// Glob filters (`*.png`, ...) for the supported input types.
#[must_use]
pub fn input_file_filters() -> Vec<String> {
    SUPPORTED_INPUT_TYPES
        .iter()
        .map(|t| format!("*.{t}"))
        .collect()
}

/// Glob filters (`*.png`, ...) for the supported output types.
#[must_use]
pub fn output_file_filters() -> Vec<String> {
    SUPPORTED_OUTPUT_TYPES
        .iter()
        .map(|t| format!("*.{t}"))
        .collect()
}

/// Map a supported output type to the codec's format identifier.
///
/// Returns `None` for types outside the allowlist.
#[must_use]
pub fn image_format(file_type: &str) -> Option<ImageFormat> {
    match file_type {
        "png" => Some(ImageFormat::Png),
        "bmp" => Some(ImageFormat::Bmp),
        "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
        "tif" => Some(ImageFormat::Tiff),
        "ppm" | "pnm" => Some(ImageFormat::Pnm),
        "webp" => Some(ImageFormat::WebP),
        _ => None,
    }
}
