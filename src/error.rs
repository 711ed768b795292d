//! Error taxonomy for session creation.
//!
//! Per the engine's failure semantics, only `FreezeSession::init` can fail.
//! The steady-state `process` path is infallible: no allocation, no I/O.

use thiserror::Error;

/// Errors reported synchronously from [`crate::FreezeSession::init`].
#[derive(Debug, Error)]
pub enum SpectriceError {
    /// A configuration parameter was out of range, a window/hop combination
    /// was unsupported, or an unsupported combination of flags was requested
    /// (e.g. a snapshot together with phase freezing).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The single backing allocation for the session failed.
    #[error("out of memory while allocating session state")]
    OutOfMemory,
}

pub type Result<T> = std::result::Result<T, SpectriceError>;
