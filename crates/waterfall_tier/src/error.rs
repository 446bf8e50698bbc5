// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache operations.

/// An error from a cache operation.
///
/// This is an opaque error type that can wrap any underlying error from a cache
/// tier: an I/O fault, a serialization problem, a timeout reported by the backend.
/// Use [`std::error::Error::source()`] to access the underlying cause if needed.
///
/// A cache miss is never an `Error`; it is reported as `Ok(None)`.
///
/// # Example
///
/// ```
/// use waterfall_tier::Error;
///
/// let error = Error::from_message("disk tier unavailable");
/// assert!(error.to_string().contains("disk tier unavailable"));
/// ```
#[ohno::error]
pub struct Error {}

impl Error {
    /// Creates a new error from any type that can be converted to an error.
    ///
    /// This is the public API for creating cache errors from tier implementations
    /// living in other crates.
    ///
    /// # Examples
    ///
    /// ```
    /// use waterfall_tier::Error;
    ///
    /// let io = std::io::Error::other("connection reset");
    /// let error = Error::from_message(io);
    /// ```
    pub fn from_message(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(cause)
    }
}

/// A specialized [`Result`] type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;
