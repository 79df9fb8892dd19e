//! halocorr-pipeline: cached image conversion pipeline for
//! cathodo-luminescence correction.
//!
//! Photomicrographs taken under cathodo-luminescence carry a bright halo:
//! the illumination falls off from the centre of the field towards the
//! corners. The correction divides the brightness channel by a heavily
//! blurred copy of itself (an estimate of the illumination field),
//! remaps the quotient back into range, and optionally denoises and
//! restores the original brightness ceiling.
//!
//! The interesting machinery is the memoisation around that algorithm:
//! every intermediate is cached under a semantic key, keyed on the source
//! file, the working size, and the parameters it depends on. Dragging a
//! parameter slider recomputes only the intermediates downstream of the
//! change, which turns interactive sweeps from seconds per frame into
//! milliseconds.
//!
//! # Entry point
//!
//! [`Converter::convert`] takes a source path, a [`ConversionMode`], an
//! output type, a [`Params`] snapshot, and a desired output size, and
//! returns encoded image bytes:
//!
//! ```no_run
//! # fn run() -> Result<(), halocorr_pipeline::ConvertError> {
//! use halocorr_pipeline::{ConversionMode, Converter, Params};
//!
//! let mut converter = Converter::new();
//! let mut params = Params::new();
//! params.set_sigma(0.2);
//! params.set_noise_reduction(true);
//!
//! let bytes = converter.convert(
//!     std::path::Path::new("slide.png"),
//!     ConversionMode::ClCorrection,
//!     "png",
//!     &params,
//!     800,
//!     600,
//! )?;
//! # let _ = bytes; Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! The converter is single-threaded and not reentrant; requests run to
//! completion and the caches are borrowed mutably throughout. Callers
//! that must stay responsive run the converter on a worker of their own.

pub mod blur;
pub mod cache;
pub mod converter;
pub mod diagnostics;
pub mod format;
pub mod greyscale;
pub mod hsv;
pub mod ops;
pub mod params;
pub mod resize;
pub mod types;

mod blurred;
mod correction;
mod encode;
mod threshold;

pub use cache::ConversionCache;
pub use converter::Converter;
pub use diagnostics::StageCounters;
pub use params::{ParamKey, Params};
pub use resize::SizeTolerance;
pub use types::{ChannelStats, ConversionMode, ConvertError, GrayF32Image, PixelBuffer};
