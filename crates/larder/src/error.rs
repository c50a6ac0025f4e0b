// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache operations.

/// An error from a cache load.
///
/// This is an opaque error type wrapping whatever the loader returned. Use
/// [`std::error::Error::source()`] to reach the underlying cause.
///
/// # Example
///
/// ```
/// use larder::Error;
///
/// let error = Error::from_message("backend unavailable");
/// assert!(error.to_string().contains("backend unavailable"));
/// ```
#[derive(Debug, thiserror::Error)]
#[error("cache load failed: {source}")]
pub struct Error {
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl Error {
    /// Creates an error wrapping the given cause.
    pub fn from_source(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self { source: source.into() }
    }

    /// Creates an error from a plain message.
    pub fn from_message(message: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::from_source(message)
    }
}

/// A specialized [`Result`] type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;
