//! Error types for the Lumen3D engine
//!
//! This module defines the error types used throughout the engine,
//! including device initialization, resource creation and layout transitions.

use std::fmt;
use crate::graphics_device::ImageLayout;

/// Result type for Lumen3D engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Lumen3D engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (Vulkan call failure, lost device, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (attachment usage, buffer range, shader binary, etc.)
    InvalidResource(String),

    /// Initialization failed (instance, device, swapchain, pass construction)
    InitializationFailed(String),

    /// The (old, new) layout pair has no entry in the transition table
    UnsupportedLayoutTransition(ImageLayout, ImageLayout),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::UnsupportedLayoutTransition(old, new) => {
                write!(f, "Unsupported image layout transition: {:?} -> {:?}", old, new)
            }
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
