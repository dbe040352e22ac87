//! Platform error types

use thiserror::Error;

/// Platform-related errors
#[derive(Error, Debug)]
pub enum PlatformError {
    /// A required native facility is missing (display server, compositor
    /// protocol, GPU adapter, context extension)
    #[error("Platform resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// Failed to create the native window
    #[error("Failed to create window: {0}")]
    WindowCreation(String),

    /// The backend supports a single live window and one already exists
    #[error("Multiple windows are not supported")]
    MultipleWindows,

    /// Failed to create or run the event loop
    #[error("Event loop error: {0}")]
    EventLoop(String),

    /// Failed to create a GPU context or bind a surface
    #[error("GPU context error: {0}")]
    Context(String),

    /// The GPU device or context was lost.
    ///
    /// The context that reported this is unusable: release it and create a
    /// new one through [`Driver::new_context`](crate::Driver::new_context).
    #[error("GPU device lost: {0}")]
    DeviceLost(String),

    /// Presenting a frame failed for an unclassified reason
    #[error("Present failed: {0}")]
    Present(String),

    /// The context was used after `release()`
    #[error("GPU context has been released")]
    ContextReleased,

    /// Invalid platform configuration
    #[error("Invalid platform configuration: {0}")]
    Config(String),

    /// Generic platform error
    #[error("Platform error: {0}")]
    Other(String),
}

impl PlatformError {
    /// Whether this error means the GPU context must be recreated
    pub fn is_device_lost(&self) -> bool {
        matches!(self, PlatformError::DeviceLost(_))
    }
}

/// Result type for platform operations
pub type Result<T> = std::result::Result<T, PlatformError>;
