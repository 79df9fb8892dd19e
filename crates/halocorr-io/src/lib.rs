//! halocorr-io: file management around the conversion pipeline.
//!
//! Scans directories for convertible images, drives single and bulk
//! convert-and-save workflows, and resolves destination filename
//! collisions with `"<name> (N)<ext>"` appendixes.
//!
//! Saving deliberately bypasses the preview-sized caches: the mode's
//! cache is cleared before each save so the written file is always
//! computed from the full-resolution source.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use halocorr_pipeline::{ConversionMode, Converter, Params, format};

/// Errors from the file-management layer.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// The source file's type is not on the input allowlist.
    #[error("\"{0}\" does not have a supported input type")]
    UnsupportedInput(PathBuf),

    /// The conversion produced no data (decode or encode failure).
    #[error("conversion of \"{0}\" failed")]
    ConversionFailed(PathBuf),

    /// The destination file already exists.
    #[error("destination file already exists: {0}")]
    DestinationExists(PathBuf),

    /// The destination has no parent directory to save into.
    #[error("no destination directory for: {0}")]
    NoDestinationDirectory(PathBuf),

    /// An error raised by the conversion pipeline.
    #[error(transparent)]
    Convert(#[from] halocorr_pipeline::ConvertError),

    /// An underlying filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Lowercase extension of `path`, or an empty string for directories and
/// extension-less files.
#[must_use]
pub fn file_type(path: &Path) -> String {
    if path.is_dir() {
        return String::new();
    }
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Whether `path` has a supported input type.
#[must_use]
pub fn is_input_supported(path: &Path) -> bool {
    format::is_supported_input_type(&file_type(path))
}

/// Whether `path` has a supported output type.
#[must_use]
pub fn is_output_supported(path: &Path) -> bool {
    format::is_supported_output_type(&file_type(path))
}

/// Tracks a working directory and the convertible files inside it, and
/// owns the [`Converter`] that serves previews and saves for them.
#[derive(Debug, Default)]
pub struct FileManager {
    converter: Converter,
    working_directory: Option<PathBuf>,
    candidate_files: Vec<PathBuf>,
}

impl FileManager {
    /// A manager with no working directory selected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The converter backing this manager.
    pub fn converter(&mut self) -> &mut Converter {
        &mut self.converter
    }

    /// The active working directory, if any.
    #[must_use]
    pub fn working_directory(&self) -> Option<&Path> {
        self.working_directory.as_deref()
    }

    /// Number of candidate files.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.candidate_files.len()
    }

    /// Candidate file at `index`.
    #[must_use]
    pub fn file_at(&self, index: usize) -> Option<&Path> {
        self.candidate_files.get(index).map(PathBuf::as_path)
    }

    /// Point the manager at a file or directory.
    ///
    /// A directory becomes the working directory and its directly
    /// contained files with supported input types become the candidates,
    /// in a stable sorted order. A single file becomes the only
    /// candidate, with its parent as the working directory.
    ///
    /// # Errors
    ///
    /// Propagates filesystem errors from reading the directory.
    pub fn set_up_files(&mut self, path: &Path) -> Result<(), FileError> {
        self.working_directory = None;
        self.candidate_files.clear();

        if path.is_dir() {
            self.working_directory = Some(path.to_path_buf());
            for entry in WalkDir::new(path).min_depth(1).max_depth(1).sort_by_file_name() {
                let entry = entry.map_err(|e| std::io::Error::other(e.to_string()))?;
                let candidate = entry.path();
                if candidate.is_file() && is_input_supported(candidate) {
                    self.candidate_files.push(candidate.to_path_buf());
                }
            }
            debug!(
                directory = %path.display(),
                candidates = self.candidate_files.len(),
                "scanned working directory",
            );
        } else if path.is_file() {
            self.working_directory = path.parent().map(Path::to_path_buf);
            self.candidate_files.push(path.to_path_buf());
        }

        Ok(())
    }

    /// Convert the candidate at `index` in memory and return the encoded
    /// bytes, or `None` when the index is out of range or the conversion
    /// produced nothing.
    ///
    /// # Errors
    ///
    /// Propagates [`halocorr_pipeline::ConvertError`] from the pipeline.
    pub fn converted_stream(
        &mut self,
        index: usize,
        mode: ConversionMode,
        output_type: &str,
        params: &Params,
        desired_width: i32,
        desired_height: i32,
    ) -> Result<Option<Vec<u8>>, FileError> {
        let Some(path) = self.candidate_files.get(index).cloned() else {
            return Ok(None);
        };
        Ok(self.converter.convert(
            &path,
            mode,
            output_type,
            params,
            desired_width,
            desired_height,
        )?)
    }

    /// Convert `src` at full resolution and write the result to `dst`,
    /// whose extension selects the output type.
    ///
    /// The mode's cache is cleared first so preview-sized intermediates
    /// never leak into a saved file.
    ///
    /// # Errors
    ///
    /// - [`FileError::UnsupportedInput`] when `src` is not convertible.
    /// - [`FileError::NoDestinationDirectory`] when `dst` has no parent.
    /// - [`FileError::DestinationExists`] when `dst` is already present.
    /// - [`FileError::ConversionFailed`] when decode or encode fails.
    /// - [`FileError::Convert`] when the output type is unsupported.
    /// - [`FileError::Io`] on write failures.
    pub fn convert_and_save(
        &mut self,
        src: &Path,
        dst: &Path,
        mode: ConversionMode,
        params: &Params,
    ) -> Result<(), FileError> {
        if !is_input_supported(src) {
            return Err(FileError::UnsupportedInput(src.to_path_buf()));
        }
        if dst.parent().is_none_or(|parent| parent.as_os_str().is_empty()) {
            return Err(FileError::NoDestinationDirectory(dst.to_path_buf()));
        }

        // The saved file must come from the full-resolution source, not
        // from intermediates computed at preview size.
        self.converter.clear_cache(mode);

        let bytes = self
            .converter
            .convert(src, mode, &file_type(dst), params, -1, -1)?
            .filter(|bytes| !bytes.is_empty())
            .ok_or_else(|| FileError::ConversionFailed(src.to_path_buf()))?;

        if dst.exists() {
            return Err(FileError::DestinationExists(dst.to_path_buf()));
        }
        std::fs::write(dst, bytes)?;
        info!(src = %src.display(), dst = %dst.display(), %mode, "saved conversion");
        Ok(())
    }
}

/// Resolve a destination filename collision by appending `" (N)"` to the
/// stem.
///
/// If `path` does not exist and is not blacklisted it is returned as is.
/// Otherwise, a trailing `" (k)"` appendix (if any) is stripped and `N`
/// starts at `k + 1`, counting up until a name is found that neither
/// exists nor appears in `blacklist`. The blacklist lets bulk saves
/// reserve names they have not written yet.
#[must_use]
pub fn resolve_collision(path: &Path, blacklist: &[PathBuf]) -> PathBuf {
    let blacklisted = |candidate: &Path| blacklist.iter().any(|entry| entry == candidate);

    if !path.exists() && !blacklisted(path) {
        return path.to_path_buf();
    }

    let directory = path.parent().unwrap_or_else(|| Path::new(""));
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    // Split off the extension, keeping the dot.
    let (mut stem, extension) = match filename.rfind('.') {
        Some(index) if index > 0 => {
            let (stem, ext) = filename.split_at(index);
            (stem.to_string(), ext.to_string())
        }
        _ => (filename, String::new()),
    };

    // A trailing " (N)" appendix seeds the counter at N + 1.
    let mut number: u64 = 1;
    if let Some(space) = stem.rfind(' ') {
        let appendix = &stem[space + 1..];
        if let Some(digits) = appendix.strip_prefix('(').and_then(|a| a.strip_suffix(')')) {
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                if let Ok(parsed) = digits.parse::<u64>() {
                    number = parsed + 1;
                    stem.truncate(space);
                }
            }
        }
    }

    loop {
        let candidate = directory.join(format!("{stem} ({number}){extension}"));
        if !candidate.exists() && !blacklisted(&candidate) {
            return candidate;
        }
        number += 1;
    }
}
