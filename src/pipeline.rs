use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::format::ImageFormat;
use crate::metadata::Metadata;

/// What to do with each file of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Decode and report tags.
    Inspect,
    /// Write a cleaned copy next to the original.
    Clear,
}

/// Outcome of cleaning one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearOutcome {
    pub format: ImageFormat,
    /// Where the cleaned copy was (or, in dry-run mode, would be) written.
    pub output_path: PathBuf,
    pub original_size: usize,
    pub cleaned_size: usize,
    /// Metadata bytes removed, as counted by the format's redactor.
    pub removed: usize,
    /// False in dry-run mode.
    pub written: bool,
}

/// The result of processing a single file in a batch.
///
/// Exactly one of `metadata` / `cleared` is set on success, depending on the
/// [`Mode`]; `error` is set on failure.
#[derive(Debug)]
pub struct ProcessResult {
    pub path: PathBuf,
    pub metadata: Option<Metadata>,
    pub cleared: Option<ClearOutcome>,
    pub error: Option<String>,
}

/// Collect supported image files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// recursively (following symlinks). Only files with a jpg, jpeg, png, gif or
/// bmp extension are included; the content is checked later, by signature.
///
/// # Example
///
/// ```rust,no_run
/// use scorpion::pipeline::collect_images;
/// use std::path::PathBuf;
///
/// let images = collect_images(&[
///     PathBuf::from("photo.jpg"),       // single file
///     PathBuf::from("./downloads/"),    // entire directory
/// ]);
/// println!("Found {} images", images.len());
/// ```
pub fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported_image(path) {
                images.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if p.is_file() && is_supported_image(p) {
                    images.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

fn is_supported_image(path: &Path) -> bool {
    ImageFormat::from_extension(path).is_some()
}

/// Whether `path` is the cleaned copy of a file that sits next to it, as
/// named by [`clear_path`].
pub fn is_clear_output(path: &Path) -> bool {
    let Some(format) = ImageFormat::from_extension(path) else {
        return false;
    };
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    let Some(source_stem) = stem.strip_suffix(format.clear_suffix()) else {
        return false;
    };
    if source_stem.is_empty() {
        return false;
    }
    let mut name = source_stem.to_string();
    if let Some(ext) = path.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    path.with_file_name(name).is_file()
}

/// Drop cleaned copies left by an earlier run, so clearing a directory twice
/// does not produce `photo_clear_clear.jpg`.
pub fn skip_clear_outputs(images: Vec<PathBuf>) -> Vec<PathBuf> {
    images
        .into_iter()
        .filter(|path| {
            let skip = is_clear_output(path);
            if skip {
                log::debug!("Skipping cleaned copy: {}", path.display());
            }
            !skip
        })
        .collect()
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| Error::UnreadableInput {
        path: path.to_path_buf(),
        source,
    })
}

/// Read and decode one file.
///
/// The format is detected from the content; the extension is ignored.
pub fn inspect_file(path: &Path, config: &Config) -> Result<Metadata> {
    let data = read_file(path)?;
    let meta = crate::decode_with(&data, &config.decode)?;
    if meta.truncated {
        log::warn!("{}: structure truncated, showing partial metadata", path.display());
    }
    log::debug!("{}: {}", path.display(), meta.summary());
    Ok(meta)
}

/// Output path of the cleaned copy: `photo.jpg` → `photo_clear.jpg`,
/// `logo.png` → `logoclear.png`.
///
/// # Example
///
/// ```rust
/// use scorpion::format::ImageFormat;
/// use scorpion::pipeline::clear_path;
/// use std::path::{Path, PathBuf};
///
/// assert_eq!(clear_path(Path::new("a/photo.jpg"), ImageFormat::Jpeg), PathBuf::from("a/photo_clear.jpg"));
/// assert_eq!(clear_path(Path::new("anim.gif"), ImageFormat::Gif), PathBuf::from("animclear.gif"));
/// ```
pub fn clear_path(path: &Path, format: ImageFormat) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    let mut name = format!("{stem}{}", format.clear_suffix());
    if let Some(ext) = path.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    path.with_file_name(name)
}

/// Read one file, strip its metadata and write the cleaned copy.
///
/// The original is never modified. With `output.dry_run` nothing is written;
/// without `output.overwrite` an existing cleaned copy is an error.
pub fn clear_file(path: &Path, config: &Config) -> Result<ClearOutcome> {
    let data = read_file(path)?;
    let format = ImageFormat::detect(&data).ok_or(Error::UnrecognizedFormat)?;
    let redaction = crate::redact(&data)?;
    let output_path = clear_path(path, format);

    let mut outcome = ClearOutcome {
        format,
        output_path,
        original_size: data.len(),
        cleaned_size: redaction.data.len(),
        removed: redaction.removed,
        written: false,
    };

    if config.output.dry_run {
        log::info!(
            "[DRY RUN] Would write {} ({} bytes removed)",
            outcome.output_path.display(),
            outcome.removed
        );
        return Ok(outcome);
    }

    if !config.output.overwrite && outcome.output_path.exists() {
        return Err(Error::WriteOutput {
            path: outcome.output_path,
            source: std::io::Error::new(std::io::ErrorKind::AlreadyExists, "cleaned copy already exists"),
        });
    }

    std::fs::write(&outcome.output_path, &redaction.data).map_err(|source| Error::WriteOutput {
        path: outcome.output_path.clone(),
        source,
    })?;
    outcome.written = true;
    log::info!(
        "{} → {} ({} bytes removed)",
        path.display(),
        outcome.output_path.display(),
        outcome.removed
    );
    Ok(outcome)
}

/// Process files one after another. A failure is recorded in the file's
/// [`ProcessResult`] and does not stop the batch.
pub fn process_batch(paths: &[PathBuf], mode: Mode, config: &Config) -> Vec<ProcessResult> {
    paths
        .iter()
        .map(|path| {
            let mut result = ProcessResult {
                path: path.clone(),
                metadata: None,
                cleared: None,
                error: None,
            };
            let outcome = match mode {
                Mode::Inspect => inspect_file(path, config).map(|m| result.metadata = Some(m)),
                Mode::Clear => clear_file(path, config).map(|c| result.cleared = Some(c)),
            };
            if let Err(e) = outcome {
                log::warn!("{}: {e}", path.display());
                result.error = Some(e.to_string());
            }
            result
        })
        .collect()
}
