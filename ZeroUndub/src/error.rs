//! Error types for `ZeroUndub`

use std::path::PathBuf;

use thiserror::Error;

/// The error type for `ZeroUndub` operations.
///
/// Every failure aborts the whole run: a half-written output container is
/// unusable, so there is no partial-success mode.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The source path is neither an `.ISO` image nor a directory.
    #[error("unsupported source: {0} (expected an .iso image or a directory)")]
    UnsupportedSource(PathBuf),

    // ==================== Container Errors ====================
    /// The container directory, offset table or payload is unusable.
    #[error("corrupt container: {message}")]
    CorruptContainer {
        /// Description of what is inconsistent.
        message: String,
    },

    /// A resource the run depends on is missing.
    #[error("missing resource: {0}")]
    MissingResource(String),

    /// The repacked payload does not fit the original capacity.
    #[error("repacked payload needs {required} bytes but only {capacity} are available")]
    CapacityExceeded {
        /// Bytes required by the smallest layout tried.
        required: u64,
        /// Bytes available in the original payload.
        capacity: u64,
    },

    // ==================== Sub-archive Errors ====================
    /// The sub-archive header disagrees with its contents.
    #[error("corrupt archive: {message}")]
    CorruptArchive {
        /// Description of what is inconsistent.
        message: String,
    },

    /// A sub-archive slot was given a buffer of a different size.
    #[error("slot {index} holds {expected} bytes, replacement has {actual}")]
    FixedSizeViolation {
        /// Slot index.
        index: usize,
        /// Slot size in bytes.
        expected: usize,
        /// Replacement size in bytes.
        actual: usize,
    },

    // ==================== Texture Errors ====================
    /// The texture is not a single-image indexed TIM2 picture.
    #[error("invalid texture: {message}")]
    InvalidTexture {
        /// Description of what is invalid.
        message: String,
    },

    /// A recolored pixel has no exact match in the final palette.
    #[error("palette overflow: color {color:02X?} missing from final palette")]
    PaletteOverflow {
        /// The RGBA color that could not be indexed.
        color: [u8; 4],
    },

    // ==================== Text Errors ====================
    /// A message token has no encoding in any glyph table.
    #[error("unencodable glyph: {glyph:?}")]
    UnencodableGlyph {
        /// The offending token.
        glyph: String,
    },

    /// The message tree could not be discovered or mixes tables and messages.
    #[error("corrupt message table at 0x{offset:X}: {message}")]
    CorruptMessageTable {
        /// Byte offset of the offending node.
        offset: usize,
        /// Description of what is inconsistent.
        message: String,
    },

    // ==================== Parsing / Export Errors ====================
    /// JSON parsing error (subtitle maps).
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// PNG export failed.
    #[error("image error: {0}")]
    ImageError(#[from] image::ImageError),
}

/// Coarse classification of an [`Error`], for callers that map failures
/// to user-facing explanations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    UnsupportedSource,
    CorruptContainer,
    MissingResource,
    CapacityExceeded,
    CorruptArchive,
    FixedSizeViolation,
    InvalidTexture,
    PaletteOverflow,
    UnencodableGlyph,
    CorruptMessageTable,
    Parse,
}

impl Error {
    /// Build a [`Error::CorruptContainer`] from any message.
    pub(crate) fn corrupt_container(message: impl Into<String>) -> Self {
        Self::CorruptContainer {
            message: message.into(),
        }
    }

    /// Build a [`Error::CorruptArchive`] from any message.
    pub(crate) fn corrupt_archive(message: impl Into<String>) -> Self {
        Self::CorruptArchive {
            message: message.into(),
        }
    }

    /// Build a [`Error::InvalidTexture`] from any message.
    pub(crate) fn invalid_texture(message: impl Into<String>) -> Self {
        Self::InvalidTexture {
            message: message.into(),
        }
    }

    /// The kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::UnsupportedSource(_) => ErrorKind::UnsupportedSource,
            Self::CorruptContainer { .. } => ErrorKind::CorruptContainer,
            Self::MissingResource(_) => ErrorKind::MissingResource,
            Self::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            Self::CorruptArchive { .. } => ErrorKind::CorruptArchive,
            Self::FixedSizeViolation { .. } => ErrorKind::FixedSizeViolation,
            Self::InvalidTexture { .. } => ErrorKind::InvalidTexture,
            Self::PaletteOverflow { .. } => ErrorKind::PaletteOverflow,
            Self::UnencodableGlyph { .. } => ErrorKind::UnencodableGlyph,
            Self::CorruptMessageTable { .. } => ErrorKind::CorruptMessageTable,
            Self::JsonError(_) | Self::ImageError(_) => ErrorKind::Parse,
        }
    }
}

/// A specialized Result type for `ZeroUndub` operations.
pub type Result<T> = std::result::Result<T, Error>;
