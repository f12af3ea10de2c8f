//! Error types for the Obsidian hardware-abstraction layer
//!
//! Every fallible operation of the device facade and of the backends returns
//! [`Result`]. Variants are grouped in four classes: configuration mistakes,
//! resource-state violations, lookup failures on stale IDs, and backend
//! failures (native call failed, out of memory, device lost).

use std::fmt;

/// Result type for Obsidian operations
pub type Result<T> = std::result::Result<T, Error>;

/// Obsidian errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid descriptor: bad attachment roles, unsupported format for a
    /// role, mismatched framebuffer attachments, invalid usage bits
    ConfigurationError(String),

    /// Operation not allowed in the resource's current state (updating a
    /// static buffer, out-of-bounds write, frame call out of order)
    ResourceStateError(String),

    /// The ID was never issued or has already been destroyed
    LookupFailure(String),

    /// Native backend call failed
    BackendError(String),

    /// Out of host or device memory
    OutOfMemory,

    /// The logical device was lost; the device instance is unusable
    DeviceLost,

    /// A bounded fence wait expired
    Timeout(String),

    /// Backend or device bring-up failed
    InitializationFailed(String),
}

impl Error {
    /// True for failures reported by the native backend.
    ///
    /// These are never retried by the HAL; the caller decides whether the
    /// device must be recreated.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            Error::BackendError(_) | Error::OutOfMemory | Error::DeviceLost
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            Error::ResourceStateError(msg) => write!(f, "Resource state error: {}", msg),
            Error::LookupFailure(msg) => write!(f, "Lookup failure: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::DeviceLost => write!(f, "Device lost"),
            Error::Timeout(msg) => write!(f, "Timeout: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
