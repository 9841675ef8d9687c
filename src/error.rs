//! Error types for gitwire.

use thiserror::Error;

/// Codec-level error, mirroring the wire protocol's failure taxonomy.
///
/// Every `put_*`/`get_*` operation fails with one of these. A codec failure
/// is terminal for the frame: callers must close the connection rather than
/// retry, since consumed bytes stay consumed and earlier sibling fields may
/// already have been flushed.
#[derive(Debug, Error)]
pub enum WireError {
    /// The sink refused or truncated a write.
    #[error("write failed: {0}")]
    WriteFailed(#[source] std::io::Error),

    /// The source could not produce the requested bytes.
    #[error("read failed: {0}")]
    ReadFailed(#[source] std::io::Error),

    /// A sized string's encoded length exceeds the destination capacity.
    ///
    /// The length prefix has been consumed; none of the string body has.
    #[error("encoded length {encoded} exceeds capacity {capacity}")]
    BufferTooSmall { encoded: u64, capacity: u64 },

    /// String content failed UTF-8 validation.
    #[error("invalid UTF-8 in string payload")]
    InvalidUtf8,
}

/// Error raised by the hook-relay client before or during the exchange.
#[derive(Debug, Error)]
pub enum HookError {
    /// A required environment variable is missing.
    #[error("environment variable {0} undefined")]
    MissingEnv(&'static str),

    /// The shared cookie is not exactly 64 characters.
    #[error("cookie is {0} characters long, expected 64")]
    BadCookieLength(usize),

    /// A standard stream that must be a named pipe is not one.
    #[error("{0} must be a pipe")]
    NotAPipe(&'static str),

    /// The daemon closed the connection before sending a status byte.
    #[error("unexpected EOF before status byte")]
    UnexpectedEof,

    /// I/O error on the socket or a standard stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Main error type for server-side operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Codec failure on a session's request or response frame.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
