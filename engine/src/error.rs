//! Error Types
//!
//! Host-facing failures. Kernels themselves have no error channel: capacity
//! overflow is a construction-time bound and lost atomic races are retried on
//! the next sweep. Everything that can fail does so before the first frame.

use thiserror::Error;

/// Errors raised while configuring or constructing a world, or while feeding
/// it per-frame input.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Reading a config file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A config file was not valid JSON for [`crate::config::WorldConfig`].
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration describes a world that cannot be built.
    #[error("invalid world config: {0}")]
    InvalidConfig(String),

    /// More paint requests than the painter has slots for this frame.
    #[error("{given} paint requests queued but only {slots} paint slots exist")]
    TooManyPaintRequests { given: usize, slots: u32 },

    /// A paint request referenced a material the world does not know.
    #[error("material {material} out of range (world has {count} materials)")]
    MaterialOutOfRange { material: u32, count: u32 },

    /// No compatible GPU adapter was found.
    #[error("no compatible GPU adapter: {0}")]
    AdapterUnavailable(String),

    /// The adapter refused to create a device.
    #[error("failed to create GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    /// A world buffer exceeds what the device can bind as storage.
    #[error("buffer '{label}' needs {size} bytes but the device limit is {limit}")]
    BufferTooLarge {
        label: &'static str,
        size: u64,
        limit: u64,
    },
}

/// Convenience alias used across the crate.
pub type WorldResult<T> = Result<T, WorldError>;
