use std::path::PathBuf;

/// Errors surfaced to the caller of the decode and redaction APIs.
///
/// Structural truncation inside a file that was recognized is *not* an error
/// on the display path: decoders stop and return what they collected. It only
/// surfaces here when a fixed header the redactor needs is missing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    UnreadableInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cleaned file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The buffer does not start with a BMP, GIF, PNG or JPEG signature.
    #[error("not a recognized image format (expected BMP, GIF, PNG or JPEG signature)")]
    UnrecognizedFormat,

    /// A declared length or offset runs past the end of the buffer.
    #[error("truncated {what} at offset {offset}")]
    TruncatedStructure { what: &'static str, offset: usize },

    /// The structure is well-formed but uses a variant this crate cannot rewrite.
    #[error("unsupported variant: {0}")]
    UnsupportedVariant(String),
}

impl Error {
    pub(crate) fn truncated(what: &'static str, offset: usize) -> Self {
        Self::TruncatedStructure { what, offset }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
