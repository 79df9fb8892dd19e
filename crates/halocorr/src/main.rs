//! halocorr: correct uneven cathodo-luminescence illumination in
//! photomicrographs.
//!
//! Converts a single image or every supported image in a directory,
//! writing results next to the sources (or to `--output`) with
//! collision-safe names.
//!
//! # Usage
//!
//! ```text
//! halocorr photo.png --sigma 0.2 --noise-reduction
//! halocorr slides/ --mode greyscale --out-type bmp
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use halocorr_io::{FileManager, resolve_collision};
use halocorr_pipeline::{ConversionMode, Params, format};

/// Correct uneven cathodo-luminescence illumination in photomicrographs.
#[derive(Parser)]
#[command(name = "halocorr", version)]
struct Cli {
    /// Input image, or a directory to convert in bulk.
    input: PathBuf,

    /// Conversion to apply.
    #[arg(long, value_enum, default_value_t = Mode::ClCorrection)]
    mode: Mode,

    /// Output image type (defaults to png).
    #[arg(long, default_value = format::DEFAULT_OUTPUT_TYPE)]
    out_type: String,

    /// Blur sigma as a fraction of the shorter image dimension (0 to 1).
    #[arg(long, default_value_t = 0.1)]
    sigma: f64,

    /// Subtract the low-pass background minimum after the correction.
    #[arg(long)]
    noise_reduction: bool,

    /// Keep the full output range instead of the original brightness ceiling.
    #[arg(long)]
    max_contrast: bool,

    /// Threshold level for the threshold modes (0 to 255).
    #[arg(long, default_value_t = 127.0)]
    threshold: f64,

    /// Destination file (single input only). Defaults to a
    /// collision-safe name next to the source.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG overrides).
    #[arg(long)]
    verbose: bool,
}

/// Conversion selection.
#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Pass the image through unchanged.
    None,
    /// Single-channel luminance conversion.
    Greyscale,
    /// Cathodo-luminescence halo correction.
    ClCorrection,
    /// Preview of the blurred background estimate.
    BlurredFilter,
    /// Binary threshold of the brightness channel.
    ThresholdTest,
    /// Halo correction followed by a binary threshold.
    ClThresholdTest,
}

impl From<Mode> for ConversionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::None => Self::None,
            Mode::Greyscale => Self::Greyscale,
            Mode::ClCorrection => Self::ClCorrection,
            Mode::BlurredFilter => Self::BlurredFilter,
            Mode::ThresholdTest => Self::ThresholdTest,
            Mode::ClThresholdTest => Self::ClCorrectionThresholdTest,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(count) => {
            println!("converted {count} file(s)");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(cli: &Cli) -> Result<usize, String> {
    let out_type = cli.out_type.to_lowercase();
    let out_type = if format::is_supported_output_type(&out_type) {
        out_type
    } else {
        eprintln!(
            "\"{out_type}\" is not a supported output type, saving as {}",
            format::DEFAULT_OUTPUT_TYPE,
        );
        format::DEFAULT_OUTPUT_TYPE.to_string()
    };

    let mode = ConversionMode::from(cli.mode);
    let params = build_params(cli);

    let mut manager = FileManager::new();
    manager
        .set_up_files(&cli.input)
        .map_err(|e| e.to_string())?;

    if manager.file_count() == 0 {
        return Err(format!(
            "no convertible files at {} (supported: {})",
            cli.input.display(),
            format::SUPPORTED_INPUT_TYPES.join(", "),
        ));
    }

    if cli.output.is_some() && manager.file_count() > 1 {
        return Err("--output is only valid for a single input file".to_string());
    }

    let mut written: Vec<PathBuf> = Vec::new();
    for index in 0..manager.file_count() {
        let Some(src) = manager.file_at(index).map(PathBuf::from) else {
            continue;
        };
        let dst = match &cli.output {
            Some(output) => output.clone(),
            None => resolve_collision(&destination_for(&src, &out_type), &written),
        };

        manager
            .convert_and_save(&src, &dst, mode, &params)
            .map_err(|e| format!("{}: {e}", src.display()))?;
        println!("{} -> {}", src.display(), dst.display());
        written.push(dst);
    }

    Ok(written.len())
}

fn build_params(cli: &Cli) -> Params {
    let mut params = Params::new();
    params.set_sigma(cli.sigma);
    params.set_noise_reduction(cli.noise_reduction);
    params.set_max_contrast(cli.max_contrast);
    params.set_threshold_value(cli.threshold);
    params
}

/// Default destination: the source name with a `-corrected` suffix and
/// the requested output extension, next to the source.
fn destination_for(src: &std::path::Path, out_type: &str) -> PathBuf {
    let stem = src
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "converted".to_string());
    src.with_file_name(format!("{stem}-corrected.{out_type}"))
}
