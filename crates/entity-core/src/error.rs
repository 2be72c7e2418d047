//! Error types for entity resolution.
//!
//! This module defines [`EntityError`] which covers every failure a lookup
//! source, store or cache can report. The resolver itself never surfaces these
//! to callers; it logs them and degrades the failed step to "no result".

use thiserror::Error;

/// Errors that can occur while looking up entities.
#[derive(Error, Debug)]
pub enum EntityError {
    /// Network-related errors (connection failures, timeouts, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// A source answered with a non-success HTTP status.
    #[error("HTTP {status} from {url}")]
    Http {
        /// The HTTP status code returned.
        status: u16,
        /// The URL that was requested.
        url: String,
    },

    /// Error parsing a payload returned by a source.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error querying the relational store.
    #[error("Database error: {0}")]
    Database(String),

    /// Error interacting with the result cache.
    #[error("Cache error: {0}")]
    Cache(String),

    /// The identifier is empty or otherwise unusable.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
}

impl EntityError {
    /// Returns true when the error means an upstream source could not be
    /// consulted, as opposed to the entity genuinely not existing.
    #[must_use]
    pub const fn is_source_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Http { .. } | Self::Parse(_) | Self::Database(_)
        )
    }
}

/// Result type alias using [`EntityError`].
pub type Result<T> = std::result::Result<T, EntityError>;
