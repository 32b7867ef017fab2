//! Error types for the image-extraction engine.
//!
//! Provides a single [`XlImgError`] enum matching the three error kinds
//! the engine surfaces to callers: malformed requests, unrecoverable
//! container corruption, and unexpected internal failures. Per-record
//! parse hiccups are recovered from silently (see `biff`/`escher`) and
//! never reach this type.

/// All errors that can occur during image extraction.
#[derive(Debug, thiserror::Error)]
pub enum XlImgError {
    /// Bad input: missing file, unrecognized signature, unknown sheet name.
    #[error("{0}")]
    InvalidRequest(String),

    /// The container opened, but a structurally required part is absent
    /// or corrupt beyond the forward-progress recovery policy.
    #[error("{0}")]
    InvalidFormat(String),

    /// An unexpected failure outside the documented error kinds.
    #[error("{0}")]
    Internal(String),

    /// I/O error reading the input file.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// ZIP archive error (from the `zip` crate).
    #[error("{0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, XlImgError>;
