//! Encode a pixel buffer into an image byte stream.
//!
//! Float results saturate to 8-bit before encoding. Formats whose
//! encoders only accept color samples (BMP, WebP) get single-channel
//! buffers promoted to RGB first.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use tracing::warn;

use crate::format;
use crate::ops;
use crate::types::PixelBuffer;

/// Encode `buffer` as `output_type` (a supported lowercase extension).
///
/// Returns `None` when the type does not map to a codec format or the
/// encoder rejects the image; the pipeline reports both as an absent
/// result rather than an error.
#[must_use]
pub(crate) fn encode(buffer: &PixelBuffer, output_type: &str) -> Option<Vec<u8>> {
    let Some(image_format) = format::image_format(output_type) else {
        warn!(output_type, "no codec format for output type");
        return None;
    };

    let image = match buffer {
        PixelBuffer::Rgb8(img) => DynamicImage::ImageRgb8(img.clone()),
        PixelBuffer::Gray8(img) => DynamicImage::ImageLuma8(img.clone()),
        PixelBuffer::GrayF32(img) => DynamicImage::ImageLuma8(ops::gray_f32_to_u8(img)),
    };

    // The BMP and WebP encoders only accept color samples.
    let image = match (image_format, &image) {
        (ImageFormat::Bmp | ImageFormat::WebP, DynamicImage::ImageLuma8(_)) => {
            DynamicImage::ImageRgb8(image.to_rgb8())
        }
        _ => image,
    };

    let mut bytes = Cursor::new(Vec::new());
    match image.write_to(&mut bytes, image_format) {
        Ok(()) => Some(bytes.into_inner()),
        Err(error) => {
            warn!(output_type, %error, "image encoding failed");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{GrayF32Image, GrayImage, RgbImage};

    fn rgb_buffer() -> PixelBuffer {
        PixelBuffer::Rgb8(RgbImage::from_fn(8, 6, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let v = (x * 20 + y * 10) as u8;
            image::Rgb([v, v.wrapping_add(40), v.wrapping_add(80)])
        }))
    }

    #[test]
    fn every_supported_type_encodes_rgb() {
        let buffer = rgb_buffer();
        for output_type in format::SUPPORTED_OUTPUT_TYPES {
            let bytes = encode(&buffer, output_type);
            assert!(
                bytes.as_ref().is_some_and(|b| !b.is_empty()),
                "{output_type} should encode",
            );
        }
    }

    #[test]
    fn unsupported_type_returns_none() {
        assert!(encode(&rgb_buffer(), "gif").is_none());
    }

    #[test]
    fn png_round_trips_pixel_exact() {
        let buffer = rgb_buffer();
        let bytes = encode(&buffer, "png").unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(decoded.as_raw(), buffer.as_rgb8().unwrap().as_raw());
    }

    #[test]
    fn gray8_encodes_to_single_channel_png() {
        let buffer = PixelBuffer::Gray8(GrayImage::from_pixel(4, 4, image::Luma([128])));
        let bytes = encode(&buffer, "png").unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert!(matches!(decoded, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn gray_buffers_encode_to_bmp_via_rgb_promotion() {
        let buffer = PixelBuffer::Gray8(GrayImage::from_pixel(4, 4, image::Luma([99])));
        let bytes = encode(&buffer, "bmp").unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(decoded.get_pixel(0, 0).0, [99, 99, 99]);
    }

    #[test]
    fn float_buffers_saturate_to_u8() {
        let mut channel = GrayF32Image::new(2, 1);
        channel.put_pixel(0, 0, image::Luma([300.0]));
        channel.put_pixel(1, 0, image::Luma([-5.0]));
        let bytes = encode(&PixelBuffer::GrayF32(channel), "png").unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_luma8();
        assert_eq!(decoded.get_pixel(0, 0).0[0], 255);
        assert_eq!(decoded.get_pixel(1, 0).0[0], 0);
    }
}
